use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub const GRAVITY_MS2: f64 = 9.81;

/// GPS fix. Speed and heading are reported only when the platform has a
/// usable estimate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationFix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
}

/// Gravity-inclusive accelerometer sample (m/s² per axis).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MotionSample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionSample {
    pub fn accel(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Magnitude normalized to Earth gravity units (~1.0 at rest).
    pub fn magnitude_g(&self) -> f64 {
        self.accel().norm() / GRAVITY_MS2
    }

    /// Vertical deviation from rest (m/s²), used for roughness and shocks.
    pub fn vertical_ms2(&self) -> f64 {
        self.z - GRAVITY_MS2
    }
}

/// Device tilt angles (degrees), DeviceOrientation-style alpha/beta/gamma.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrientationSample {
    pub timestamp: f64,
    pub alpha_deg: f64,
    pub beta_deg: f64,
    pub gamma_deg: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_magnitude_at_rest_is_one_g() {
        let s = MotionSample { timestamp: 0.0, x: 0.0, y: 0.0, z: GRAVITY_MS2 };
        assert_relative_eq!(s.magnitude_g(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.vertical_ms2(), 0.0, epsilon = 1e-12);
    }
}
