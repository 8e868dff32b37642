/// Per-node physics state for one simulation run.
#[derive(Debug, Clone)]
pub struct SimNode {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    /// Force accumulated during the current step.
    pub dx: f64,
    pub dy: f64,
    /// Force of the previous step; drives the swinging/traction estimates.
    pub old_dx: f64,
    pub old_dy: f64,
    /// `1 + degree`.
    pub mass: f64,
    pub size: f64,
    pub fixed: bool,
}

impl SimNode {
    pub fn new(id: u64, x: f64, y: f64, mass: f64) -> Self {
        Self {
            id,
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            old_dx: 0.0,
            old_dy: 0.0,
            mass,
            size: 1.0,
            fixed: false,
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub(crate) fn start_step(&mut self, mass: f64) {
        self.old_dx = self.dx;
        self.old_dy = self.dy;
        self.dx = 0.0;
        self.dy = 0.0;
        self.mass = mass;
    }

    pub fn force(&self) -> f64 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }

    /// How much the force changed direction/magnitude since the last step.
    pub fn swinging(&self) -> f64 {
        let sx = self.old_dx - self.dx;
        let sy = self.old_dy - self.dy;
        (sx * sx + sy * sy).sqrt()
    }

    /// Half the magnitude of the force summed over the last two steps.
    pub fn traction(&self) -> f64 {
        let tx = self.old_dx + self.dx;
        let ty = self.old_dy + self.dy;
        0.5 * (tx * tx + ty * ty).sqrt()
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Undirected link between two node indices.
#[derive(Debug, Clone, Copy)]
pub struct SimLink {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}
