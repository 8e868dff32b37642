//! ForceAtlas2 force laws.
//!
//! Every law is resolved once per step from the settings flags into a small `Copy` enum. Pair
//! forces come in two shapes: `between` returns the force exerted on the first node (the second
//! node receives its exact negation), and `apply` accumulates both sides into `dx/dy`.

use super::node::SimNode;
use super::region::Region;

/// Anti-collision repulsion multiplier for overlapping nodes.
const OVERLAP_REPULSION: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repulsion {
    /// `k * m1 * m2 / d^2` along the separating vector.
    Linear { coefficient: f64 },
    /// Same law on the distance between node borders; overlapping nodes get a flat strong push.
    AntiCollision { coefficient: f64 },
}

impl Repulsion {
    pub fn new(adjust_sizes: bool, coefficient: f64) -> Self {
        if adjust_sizes {
            Self::AntiCollision { coefficient }
        } else {
            Self::Linear { coefficient }
        }
    }

    /// Force exerted on `a` by `b`.
    pub fn between(self, a: &SimNode, b: &SimNode) -> (f64, f64) {
        let x_dist = a.x - b.x;
        let y_dist = a.y - b.y;
        let center_distance = (x_dist * x_dist + y_dist * y_dist).sqrt();

        let factor = match self {
            Self::Linear { coefficient } => {
                if center_distance > 0.0 {
                    coefficient * a.mass * b.mass / center_distance / center_distance
                } else {
                    0.0
                }
            }
            Self::AntiCollision { coefficient } => {
                let distance = center_distance - (a.size + b.size);
                if distance > 0.0 {
                    coefficient * a.mass * b.mass / distance / distance
                } else if distance < 0.0 {
                    OVERLAP_REPULSION * coefficient * a.mass * b.mass
                } else {
                    0.0
                }
            }
        };
        (x_dist * factor, y_dist * factor)
    }

    pub fn apply(self, a: &mut SimNode, b: &mut SimNode) {
        let (fx, fy) = self.between(a, b);
        a.dx += fx;
        a.dy += fy;
        b.dx -= fx;
        b.dy -= fy;
    }

    /// Barnes-Hut approximation: the whole region acts as one body at its mass center.
    ///
    /// Regions have no size of their own, so both variants use the plain inverse-square law.
    pub fn from_region(self, node: &SimNode, region: &Region) -> (f64, f64) {
        let coefficient = match self {
            Self::Linear { coefficient } | Self::AntiCollision { coefficient } => coefficient,
        };
        let x_dist = node.x - region.mass_center_x();
        let y_dist = node.y - region.mass_center_y();
        let distance = (x_dist * x_dist + y_dist * y_dist).sqrt();
        if distance > 0.0 {
            let factor = coefficient * node.mass * region.mass() / distance / distance;
            (x_dist * factor, y_dist * factor)
        } else {
            (0.0, 0.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gravity {
    /// `k * m * g / d`: scale invariant pull toward the origin.
    Weak { coefficient: f64 },
    /// `k * m * g`: grows with distance, keeps disconnected components tight.
    Strong { coefficient: f64 },
}

impl Gravity {
    pub fn new(strong: bool, coefficient: f64) -> Self {
        if strong {
            Self::Strong { coefficient }
        } else {
            Self::Weak { coefficient }
        }
    }

    pub fn on(self, node: &SimNode, gravitation: f64) -> (f64, f64) {
        let distance = (node.x * node.x + node.y * node.y).sqrt();
        if distance <= 0.0 {
            return (0.0, 0.0);
        }
        let factor = match self {
            Self::Weak { coefficient } => coefficient * node.mass * gravitation / distance,
            Self::Strong { coefficient } => coefficient * node.mass * gravitation,
        };
        (-node.x * factor, -node.y * factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttractionLaw {
    Linear,
    /// LinLog: `ln(1 + d) / d` scaling.
    Logarithmic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attraction {
    pub law: AttractionLaw,
    /// Divide by the source node's mass (outbound attraction distribution).
    pub distributed: bool,
    /// Measure distance between node borders and ignore overlapping pairs.
    pub anti_collision: bool,
    pub coefficient: f64,
}

impl Attraction {
    pub fn new(lin_log: bool, distributed: bool, adjust_sizes: bool, coefficient: f64) -> Self {
        Self {
            law: if lin_log {
                AttractionLaw::Logarithmic
            } else {
                AttractionLaw::Linear
            },
            distributed,
            anti_collision: adjust_sizes,
            coefficient,
        }
    }

    /// Force exerted on `a` by a link to `b`, or `None` when the pair does not interact.
    pub fn between(self, a: &SimNode, b: &SimNode, edge_weight: f64) -> Option<(f64, f64)> {
        let x_dist = a.x - b.x;
        let y_dist = a.y - b.y;

        let mut distance = (x_dist * x_dist + y_dist * y_dist).sqrt();
        if self.anti_collision {
            distance -= a.size + b.size;
            if distance <= 0.0 {
                return None;
            }
        }

        let mut factor = -self.coefficient * edge_weight;
        if self.law == AttractionLaw::Logarithmic {
            if distance <= 0.0 {
                return None;
            }
            factor *= (1.0 + distance).ln() / distance;
        }
        if self.distributed {
            factor /= a.mass;
        }
        Some((x_dist * factor, y_dist * factor))
    }

    pub fn apply(self, a: &mut SimNode, b: &mut SimNode, edge_weight: f64) {
        if let Some((fx, fy)) = self.between(a, b, edge_weight) {
            a.dx += fx;
            a.dy += fy;
            b.dx -= fx;
            b.dy -= fy;
        }
    }
}
