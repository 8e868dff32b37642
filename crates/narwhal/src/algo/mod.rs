pub mod forceatlas2;

use crate::error::{Error, Result};
use crate::graph::Graph;
use serde::{Deserialize, Serialize};

/// Largest accepted `barnes_hut_theta`. A node lies within `size / 2` of the mass center of any
/// region containing it, so `distance * theta > size` cannot hold for such a region.
pub const MAX_BARNES_HUT_THETA: f64 = 2.0;

/// ForceAtlas2 tuning knobs.
///
/// Field names follow the classic Gephi property names (camelCase when (de)serialized), so a
/// settings object exported from other ForceAtlas2 front-ends can be loaded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Divide attraction by the source node's mass so hubs get pushed to the periphery.
    pub outbound_attraction_distribution: bool,
    /// Treat nodes as discs of radius `Node::size` and prevent overlaps.
    pub adjust_sizes: bool,
    /// Approximate repulsion with a Barnes-Hut quadtree (O(n log n) instead of O(n^2)).
    pub barnes_hut_optimize: bool,
    /// Logarithmic attraction (LinLog energy model).
    pub lin_log_mode: bool,
    /// Gravity that does not decay with distance.
    pub strong_gravity_mode: bool,
    /// 0 ignores weights, 1 uses them linearly, other values use `weight.powf(influence)`.
    pub edge_weight_influence: f64,
    pub jitter_tolerance: f64,
    pub scaling_ratio: f64,
    pub gravity: f64,
    pub barnes_hut_theta: f64,
    /// Seed for the initial random placement of non-fixed nodes.
    pub random_seed: u64,
    /// When false, the graph's own coordinates are used as the starting layout.
    pub randomize_positions: bool,
    /// Worker pool size. `None` picks `min(4, max(1, cores - 1))`.
    pub thread_count: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            outbound_attraction_distribution: false,
            adjust_sizes: false,
            barnes_hut_optimize: false,
            lin_log_mode: false,
            strong_gravity_mode: false,
            edge_weight_influence: 1.0,
            jitter_tolerance: 1.0,
            scaling_ratio: 2.0,
            gravity: 1.0,
            barnes_hut_theta: 1.0,
            random_seed: 0,
            randomize_positions: true,
            thread_count: None,
        }
    }
}

impl Settings {
    const LARGE_GRAPH_NODES: usize = 100;
    const HUGE_GRAPH_NODES: usize = 1000;

    /// Defaults tuned to the size of `graph`: small graphs get a larger scaling ratio, and
    /// Barnes-Hut is only switched on once brute force gets expensive.
    pub fn for_graph(graph: &Graph) -> Self {
        let n = graph.nodes.len();
        Self {
            scaling_ratio: if n >= Self::LARGE_GRAPH_NODES {
                2.0
            } else {
                10.0
            },
            barnes_hut_optimize: n >= Self::HUGE_GRAPH_NODES,
            barnes_hut_theta: 1.2,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("barnesHutTheta", self.barnes_hut_theta)?;
        if self.barnes_hut_theta > MAX_BARNES_HUT_THETA {
            return Err(Error::InvalidSetting {
                name: "barnesHutTheta",
                value: self.barnes_hut_theta,
                reason: "must not exceed 2",
            });
        }
        non_negative("scalingRatio", self.scaling_ratio)?;
        if self.scaling_ratio == 0.0 {
            return Err(Error::InvalidSetting {
                name: "scalingRatio",
                value: self.scaling_ratio,
                reason: "must be positive",
            });
        }
        non_negative("jitterTolerance", self.jitter_tolerance)?;
        non_negative("edgeWeightInfluence", self.edge_weight_influence)?;
        if !self.gravity.is_finite() {
            return Err(Error::InvalidSetting {
                name: "gravity",
                value: self.gravity,
                reason: "must be finite",
            });
        }
        if self.thread_count == Some(0) {
            return Err(Error::InvalidSetting {
                name: "threadCount",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    pub(crate) fn resolved_thread_count(&self) -> usize {
        self.thread_count
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1).clamp(1, 4))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidSetting {
            name,
            value,
            reason: "must be finite",
        });
    }
    if value < 0.0 {
        return Err(Error::InvalidSetting {
            name,
            value,
            reason: "must not be negative",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::error::Error;
    use crate::graph::{Graph, Node};

    #[test]
    fn profiled_defaults_follow_graph_size() {
        let small = Graph::new((0..10).map(Node::new).collect(), Vec::new());
        let s = Settings::for_graph(&small);
        assert_eq!(s.scaling_ratio, 10.0);
        assert!(!s.barnes_hut_optimize);
        assert_eq!(s.barnes_hut_theta, 1.2);

        let big = Graph::new((0..1500).map(Node::new).collect(), Vec::new());
        let s = Settings::for_graph(&big);
        assert_eq!(s.scaling_ratio, 2.0);
        assert!(s.barnes_hut_optimize);
    }

    #[test]
    fn negative_theta_and_scaling_are_rejected() {
        let s = Settings {
            barnes_hut_theta: -1.0,
            ..Settings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(Error::InvalidSetting {
                name: "barnesHutTheta",
                ..
            })
        ));

        let s = Settings {
            scaling_ratio: -0.1,
            ..Settings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(Error::InvalidSetting {
                name: "scalingRatio",
                ..
            })
        ));

        let s = Settings {
            thread_count: Some(0),
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn theta_is_capped_at_two() {
        let at_cap = Settings {
            barnes_hut_theta: 2.0,
            ..Settings::default()
        };
        assert!(at_cap.validate().is_ok());

        let above = Settings {
            barnes_hut_theta: 2.5,
            ..Settings::default()
        };
        match above.validate() {
            Err(Error::InvalidSetting { name, reason, .. }) => {
                assert_eq!(name, "barnesHutTheta");
                assert_eq!(reason, "must not exceed 2");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn auto_thread_count_is_between_one_and_four() {
        let n = Settings::default().resolved_thread_count();
        assert!((1..=4).contains(&n), "thread count: {n}");
        let pinned = Settings {
            thread_count: Some(7),
            ..Settings::default()
        };
        assert_eq!(pinned.resolved_thread_count(), 7);
    }
}
