/// Exponentially-weighted running statistics over the motion magnitude
/// stream: a level (EWMA of the gravity-normalized magnitude) and a jitter
/// (EWMA of |Δmagnitude| between consecutive samples). Jitter is the proxy
/// for how unsteadily the device is being handled.
pub struct MotionSmoother {
    level: f64,
    jitter: f64,
    previous_g: f64,
    alpha: f64,
}

impl MotionSmoother {
    /// `alpha` must lie in (0,1); at the default 0.10 the jitter responds
    /// within roughly ten samples.
    pub fn new(alpha: f64) -> Self {
        debug_assert!(alpha > 0.0 && alpha < 1.0);
        MotionSmoother {
            level: 0.0,
            jitter: 0.0,
            previous_g: 1.0,
            alpha,
        }
    }

    /// Feed one gravity-normalized magnitude (~1.0 at rest).
    pub fn update(&mut self, magnitude_g: f64) {
        if !magnitude_g.is_finite() {
            return;
        }
        let a = self.alpha;
        self.level = (1.0 - a) * self.level + a * magnitude_g;
        self.jitter = (1.0 - a) * self.jitter + a * (magnitude_g - self.previous_g).abs();
        self.previous_g = magnitude_g;
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Raw jitter is unbounded; callers clamp to [0,1] before using it as a
    /// quality signal.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initial_state() {
        let s = MotionSmoother::new(0.10);
        assert_eq!(s.level(), 0.0);
        assert_eq!(s.jitter(), 0.0);
    }

    #[test]
    fn test_first_sample_blends_from_reset_values() {
        let mut s = MotionSmoother::new(0.10);
        s.update(1.0);
        // level: 0.9*0 + 0.1*1.0; jitter: previous_g starts at 1.0 so |Δ|=0
        assert_relative_eq!(s.level(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(s.jitter(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_steady_stream_converges_to_level() {
        let mut s = MotionSmoother::new(0.10);
        for _ in 0..200 {
            s.update(1.0);
        }
        assert_relative_eq!(s.level(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(s.jitter(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_alternating_stream_raises_jitter() {
        let mut s = MotionSmoother::new(0.10);
        for i in 0..200 {
            s.update(if i % 2 == 0 { 0.6 } else { 1.4 });
        }
        // |Δ| is 0.8 every sample, so jitter converges toward 0.8.
        assert_relative_eq!(s.jitter(), 0.8, epsilon = 1e-3);
        assert!(s.jitter() >= 0.0);
    }

    #[test]
    fn test_stats_stay_finite_under_extreme_inputs() {
        let mut s = MotionSmoother::new(0.10);
        for m in [0.0, 1e6, 0.0, 1e-9, 42.0, 1e6] {
            s.update(m);
            assert!(s.level().is_finite());
            assert!(s.jitter().is_finite());
            assert!(s.jitter() >= 0.0);
        }
    }

    #[test]
    fn test_non_finite_sample_ignored() {
        let mut s = MotionSmoother::new(0.10);
        s.update(1.0);
        let (level, jitter) = (s.level(), s.jitter());
        s.update(f64::NAN);
        s.update(f64::INFINITY);
        assert_eq!(s.level(), level);
        assert_eq!(s.jitter(), jitter);
    }
}
