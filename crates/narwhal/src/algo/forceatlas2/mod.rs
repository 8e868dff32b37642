//! ForceAtlas2 simulation.
//!
//! A [`Simulation`] owns the per-node physics state, the adaptive speed and a private worker
//! pool. Each [`Simulation::run_step`] runs, in order: repulsion + gravity (parallel, optionally
//! through a Barnes-Hut tree), attraction (serial), global speed adaptation, displacement.

pub mod force;
pub mod node;
pub mod region;
mod rng;
mod worker;

pub use force::{Attraction, AttractionLaw, Gravity, Repulsion};
pub use node::{SimLink, SimNode};
pub use region::{BarnesHutTree, Region};

use crate::algo::Settings;
use crate::error::Result;
use crate::graph::{Graph, LayoutResult, Point};
use rng::XorShift64Star;
use worker::{ParallelForceWorker, TASKS_PER_THREAD, WorkerForces};

const MIN_SPEED_EFFICIENCY: f64 = 0.05;
const MAX_JITTER_TOLERANCE: f64 = 10.0;
/// Speed may grow by at most 50% per step.
const MAX_RISE: f64 = 0.5;
/// Swinging/traction ratio above which the step is considered erratic.
const ERRATIC_SWINGING_RATIO: f64 = 2.0;
const MAX_SPEED_FOR_EFFICIENCY_GROWTH: f64 = 1000.0;
/// Per-step displacement cap with anti-collision on.
const MAX_ADJUSTED_DISPLACEMENT: f64 = 10.0;

/// Convergence metrics of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    pub speed: f64,
    pub speed_efficiency: f64,
    pub total_swinging: f64,
    pub total_effective_traction: f64,
    /// Sum of the distances moved by all nodes this step.
    pub displacement: f64,
}

pub struct Simulation {
    settings: Settings,
    nodes: Vec<SimNode>,
    links: Vec<SimLink>,
    degrees: Vec<usize>,
    repulsion: Repulsion,
    gravity: Gravity,

    speed: f64,
    speed_efficiency: f64,
    outbound_attraction_compensation: f64,
    iteration: usize,

    forces: Vec<(f64, f64)>,
    thread_count: usize,
    pool: rayon::ThreadPool,
}

impl Simulation {
    pub fn new(graph: &Graph, settings: Settings) -> Result<Self> {
        settings.validate()?;
        let id_to_idx = graph.checked_index()?;
        let degrees = graph.degrees_indexed(&id_to_idx);
        let links = graph
            .links
            .iter()
            .map(|l| SimLink {
                source: id_to_idx[&l.source],
                target: id_to_idx[&l.target],
                weight: l.weight,
            })
            .collect::<Vec<_>>();

        let mut rng = XorShift64Star::new(settings.random_seed);
        let nodes = graph
            .nodes
            .iter()
            .zip(&degrees)
            .map(|(n, &degree)| {
                let (x, y) = if n.fixed || !settings.randomize_positions {
                    (n.x, n.y)
                } else {
                    let x = rng.next_coordinate();
                    (x, rng.next_coordinate())
                };
                let mut sim = SimNode::new(n.id, x, y, 1.0 + degree as f64).with_size(n.size);
                sim.fixed = n.fixed;
                sim
            })
            .collect::<Vec<_>>();

        let thread_count = settings.resolved_thread_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("narwhal-fa2-{i}"))
            .build()?;

        let repulsion = Repulsion::new(settings.adjust_sizes, settings.scaling_ratio);
        let gravity = Gravity::new(settings.strong_gravity_mode, settings.scaling_ratio);

        tracing::debug!(
            nodes = nodes.len(),
            links = links.len(),
            thread_count,
            barnes_hut = settings.barnes_hut_optimize,
            ?repulsion,
            ?gravity,
            "forceatlas2 simulation created"
        );

        Ok(Self {
            forces: Vec::with_capacity(nodes.len()),
            settings,
            nodes,
            links,
            degrees,
            repulsion,
            gravity,
            speed: 1.0,
            speed_efficiency: 1.0,
            outbound_attraction_compensation: 1.0,
            iteration: 0,
            thread_count,
            pool,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[SimLink] {
        &self.links
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn speed_efficiency(&self) -> f64 {
        self.speed_efficiency
    }

    pub fn outbound_attraction_compensation(&self) -> f64 {
        self.outbound_attraction_compensation
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Advances the layout by one iteration.
    ///
    /// On error the node state is partially updated and the simulation should be discarded.
    pub fn run_step(&mut self) -> Result<StepReport> {
        self.iteration += 1;
        if self.nodes.is_empty() {
            return Ok(self.report(0.0, 0.0, 0.0));
        }

        for (node, &degree) in self.nodes.iter_mut().zip(&self.degrees) {
            node.start_step(1.0 + degree as f64);
        }

        let tree = if self.settings.barnes_hut_optimize {
            BarnesHutTree::build(&self.nodes)
        } else {
            None
        };

        if self.settings.outbound_attraction_distribution {
            let total_mass: f64 = self.nodes.iter().map(|n| n.mass).sum();
            self.outbound_attraction_compensation = total_mass / self.nodes.len() as f64;
        }

        self.apply_repulsion_and_gravity(tree.as_ref())
            .map_err(|e| e.in_phase("repulsion"))?;
        drop(tree);

        self.apply_attraction();

        let (total_swinging, total_effective_traction) = self.swinging_and_traction();
        self.adapt_speed(total_swinging, total_effective_traction);
        let displacement = self.displace();

        let report = self.report(total_swinging, total_effective_traction, displacement);
        tracing::trace!(
            iteration = report.iteration,
            speed = report.speed,
            speed_efficiency = report.speed_efficiency,
            swinging = report.total_swinging,
            traction = report.total_effective_traction,
            displacement = report.displacement,
            "forceatlas2 step"
        );
        Ok(report)
    }

    fn report(&self, swinging: f64, traction: f64, displacement: f64) -> StepReport {
        StepReport {
            iteration: self.iteration,
            speed: self.speed,
            speed_efficiency: self.speed_efficiency,
            total_swinging: swinging,
            total_effective_traction: traction,
            displacement,
        }
    }

    fn apply_repulsion_and_gravity(&mut self, tree: Option<&BarnesHutTree>) -> Result<()> {
        let n = self.nodes.len();
        self.forces.clear();
        self.forces.resize(n, (0.0, 0.0));

        let ranges = worker::task_ranges(n, TASKS_PER_THREAD * self.thread_count);
        let cfg = WorkerForces {
            tree,
            theta: self.settings.barnes_hut_theta,
            repulsion: self.repulsion,
            gravity: self.gravity,
            gravitation: self.settings.gravity / self.settings.scaling_ratio,
        };
        let workers = ParallelForceWorker::partition(&self.nodes, &mut self.forces, &ranges, cfg);
        worker::run_all(&self.pool, workers)?;

        for (node, &(fx, fy)) in self.nodes.iter_mut().zip(&self.forces) {
            node.dx += fx;
            node.dy += fy;
        }
        Ok(())
    }

    fn apply_attraction(&mut self) {
        let s = &self.settings;
        let coefficient = if s.outbound_attraction_distribution {
            self.outbound_attraction_compensation
        } else {
            1.0
        };
        let attraction = Attraction::new(
            s.lin_log_mode,
            s.outbound_attraction_distribution,
            s.adjust_sizes,
            coefficient,
        );
        let influence = s.edge_weight_influence;

        for link in &self.links {
            // Zero-length: no attraction under any law.
            if link.source == link.target {
                continue;
            }
            let weight = if influence == 0.0 {
                1.0
            } else if influence == 1.0 {
                link.weight
            } else {
                link.weight.powf(influence)
            };
            let (a, b) = pair_mut(&mut self.nodes, link.source, link.target);
            attraction.apply(a, b, weight);
        }
    }

    fn swinging_and_traction(&self) -> (f64, f64) {
        let mut total_swinging = 0.0;
        let mut total_effective_traction = 0.0;
        for n in self.nodes.iter().filter(|n| !n.fixed) {
            total_swinging += n.mass * n.swinging();
            total_effective_traction += n.mass * n.traction();
        }
        (total_swinging, total_effective_traction)
    }

    fn adapt_speed(&mut self, total_swinging: f64, total_effective_traction: f64) {
        let degenerate = total_effective_traction.is_nan()
            || total_effective_traction <= 0.0
            || total_swinging.is_nan();
        if degenerate {
            tracing::debug!(
                iteration = self.iteration,
                total_swinging,
                total_effective_traction,
                "no effective traction; speed adaptation skipped"
            );
            return;
        }

        let n = self.nodes.len() as f64;
        let tolerance = self.settings.jitter_tolerance;

        // Bigger graphs need more tolerance; the estimate is empirical.
        let estimated_optimal_jitter_tolerance = 0.05 * n.sqrt();
        let min_jt = estimated_optimal_jitter_tolerance.sqrt();
        let mut jt = tolerance
            * min_jt.max(MAX_JITTER_TOLERANCE.min(
                estimated_optimal_jitter_tolerance * total_effective_traction / (n * n),
            ));

        if total_swinging / total_effective_traction > ERRATIC_SWINGING_RATIO {
            if self.speed_efficiency > MIN_SPEED_EFFICIENCY {
                self.speed_efficiency *= 0.5;
            }
            jt = jt.max(tolerance);
        }

        let target_speed =
            jt * self.speed_efficiency * total_effective_traction / total_swinging;

        if total_swinging > jt * total_effective_traction {
            if self.speed_efficiency > MIN_SPEED_EFFICIENCY {
                self.speed_efficiency *= 0.7;
            }
        } else if self.speed < MAX_SPEED_FOR_EFFICIENCY_GROWTH {
            self.speed_efficiency *= 1.3;
        }

        // Zero swinging gives an infinite target; the rise cap still applies.
        self.speed += (target_speed - self.speed).min(MAX_RISE * self.speed);
    }

    fn displace(&mut self) -> f64 {
        let speed = self.speed;
        let adjust_sizes = self.settings.adjust_sizes;
        let mut displacement = 0.0;

        for node in self.nodes.iter_mut().filter(|n| !n.fixed) {
            // Nodes that swing get slowed down individually.
            let swinging = node.mass * node.swinging();
            let factor = if adjust_sizes {
                let df = node.force();
                if df <= 0.0 {
                    continue;
                }
                (0.1 * speed / (1.0 + (speed * swinging).sqrt()) * df)
                    .min(MAX_ADJUSTED_DISPLACEMENT)
                    / df
            } else {
                speed / (1.0 + (speed * swinging).sqrt())
            };

            let mx = node.dx * factor;
            let my = node.dy * factor;
            if !(mx.is_finite() && my.is_finite()) {
                continue;
            }
            node.x += mx;
            node.y += my;
            displacement += (mx * mx + my * my).sqrt();
        }
        displacement
    }

    /// Current positions keyed by graph node id.
    pub fn positions(&self) -> LayoutResult {
        let mut positions = std::collections::BTreeMap::new();
        for n in &self.nodes {
            positions.insert(n.id, Point { x: n.x, y: n.y });
        }
        LayoutResult { positions }
    }

    /// Final positions; shuts the worker pool down.
    pub fn into_result(self) -> LayoutResult {
        self.positions()
    }
}

fn pair_mut(nodes: &mut [SimNode], a: usize, b: usize) -> (&mut SimNode, &mut SimNode) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = nodes.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = nodes.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}
