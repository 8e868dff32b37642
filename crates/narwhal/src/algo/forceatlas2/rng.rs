/// xorshift64* generator used for the initial placement.
///
/// Small and reproducible across platforms; the layout only needs a well-spread seed layout,
/// not statistical quality.
#[derive(Debug, Clone)]
pub(crate) struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub(crate) fn new(seed: u64) -> Self {
        // A zero state would stay zero forever.
        let mut rng = Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        };
        if rng.state == 0 {
            rng.state = 1;
        }
        rng
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    pub(crate) fn next_f64_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    /// One seed coordinate in `[-490, 510)`.
    pub(crate) fn next_coordinate(&mut self) -> f64 {
        ((0.01 + self.next_f64_unit()) * 1000.0) - 500.0
    }
}
