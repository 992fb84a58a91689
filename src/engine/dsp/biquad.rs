use std::f32::consts::PI;

/// Second-order low-pass section (RBJ cookbook coefficients),
/// transposed direct form II.
pub struct BiquadFilter {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl BiquadFilter {
    pub fn low_pass(sample_rate: f32, frequency: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 - cos) / 2.0 / a0,
            b1: (1.0 - cos) / a0,
            b2: (1.0 - cos) / 2.0 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn passes_dc() {
        let mut f = BiquadFilter::low_pass(44_100.0, 16_000.0, 0.707);
        let mut y = 0.0;
        for _ in 0..2000 {
            y = f.process(0.5);
        }
        assert_abs_diff_eq!(y, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn attenuates_nyquist() {
        let mut f = BiquadFilter::low_pass(44_100.0, 4_000.0, 0.707);
        let mut peak: f32 = 0.0;
        for i in 0..4000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = f.process(x);
            if i > 1000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.05, "peak {}", peak);
    }

    #[test]
    fn reset_clears_state() {
        let mut f = BiquadFilter::low_pass(44_100.0, 1_000.0, 0.707);
        for _ in 0..100 {
            f.process(1.0);
        }
        f.reset();
        let fresh = BiquadFilter::low_pass(44_100.0, 1_000.0, 0.707).process(0.25);
        assert_eq!(f.process(0.25), fresh);
    }
}
