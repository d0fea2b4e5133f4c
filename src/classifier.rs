// classifier.rs — pure mount/posture/movement classification.
//
// No state of its own: everything derives from the latest signals and the
// smoothed jitter. Tie-breaks are resolved by fixed priority order, first
// match wins.

use serde::Serialize;

use crate::config::EstimatorConfig;
use crate::signal_store::SignalStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Flat,
    Portrait,
    Landscape,
    Unknown,
}

impl Posture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Posture::Flat => "flat",
            Posture::Portrait => "portrait",
            Posture::Landscape => "landscape",
            Posture::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MountState {
    Mounted,
    Desk,
    Flat,
    Parked,
    Hand,
    Unknown,
}

impl MountState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MountState::Mounted => "mounted",
            MountState::Desk => "desk",
            MountState::Flat => "flat",
            MountState::Parked => "parked",
            MountState::Hand => "hand",
            MountState::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClassificationResult {
    pub posture: Posture,
    pub mount_state: MountState,
    pub moving: bool,
}

/// Posture from tilt angles. Beta is the forward tilt, gamma the side tilt.
/// Non-finite angles fall through to Unknown.
pub fn classify_posture(beta_deg: f64, gamma_deg: f64, cfg: &EstimatorConfig) -> Posture {
    if !beta_deg.is_finite() || !gamma_deg.is_finite() {
        return Posture::Unknown;
    }
    let beta = beta_deg.abs();
    let gamma = gamma_deg.abs();
    if beta < cfg.flat_tilt_max_deg && gamma < cfg.flat_tilt_max_deg {
        Posture::Flat
    } else if beta >= cfg.portrait_beta_min_deg && beta <= cfg.portrait_beta_max_deg {
        Posture::Portrait
    } else if gamma > cfg.landscape_gamma_min_deg {
        Posture::Landscape
    } else {
        Posture::Unknown
    }
}

/// Moving when GPS speed clears the slow-walk threshold, or when sustained
/// jitter substitutes for speed while the motion channel is fresh (tunnel,
/// poor fix).
pub fn is_moving(
    speed_mps: Option<f64>,
    jitter: f64,
    motion_age: Option<f64>,
    cfg: &EstimatorConfig,
) -> bool {
    let speed_says = speed_mps
        .filter(|s| s.is_finite())
        .map(|s| s > cfg.moving_speed_mps)
        .unwrap_or(false);
    let jitter_says = jitter > cfg.moving_jitter_threshold
        && motion_age.map(|a| a <= cfg.motion_recency_secs).unwrap_or(false);
    speed_says || jitter_says
}

/// Mount state, fixed priority order. Stillness plus flat posture implies
/// resting on a surface; motion plus high jitter implies being carried; only
/// an upright, non-jittery, moving device is trusted as dash mounted.
pub fn classify_mount(
    posture: Posture,
    moving: bool,
    jitter: f64,
    cfg: &EstimatorConfig,
) -> MountState {
    if posture == Posture::Flat && !moving && jitter < cfg.desk_jitter_max {
        MountState::Desk
    } else if posture == Posture::Flat {
        MountState::Flat
    } else if !moving {
        MountState::Parked
    } else if jitter > cfg.hand_jitter_min {
        MountState::Hand
    } else if posture == Posture::Portrait || posture == Posture::Landscape {
        MountState::Mounted
    } else {
        MountState::Unknown
    }
}

/// Full classification from the current store and smoothed jitter.
pub fn classify(
    store: &SignalStore,
    jitter: f64,
    cfg: &EstimatorConfig,
    now: f64,
) -> ClassificationResult {
    let posture = store
        .latest_orientation()
        .map(|o| classify_posture(o.beta_deg, o.gamma_deg, cfg))
        .unwrap_or(Posture::Unknown);

    let speed = store.latest_location().and_then(|l| l.speed_mps);
    let motion_age = store
        .latest_motion()
        .map(|m| (now - m.timestamp).max(0.0));
    let moving = is_moving(speed, jitter, motion_age, cfg);
    let mount_state = classify_mount(posture, moving, jitter, cfg);

    ClassificationResult { posture, mount_state, moving }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EstimatorConfig {
        EstimatorConfig::default()
    }

    #[test]
    fn test_posture_bands() {
        let c = cfg();
        assert_eq!(classify_posture(5.0, -10.0, &c), Posture::Flat);
        assert_eq!(classify_posture(90.0, 0.0, &c), Posture::Portrait);
        assert_eq!(classify_posture(-60.0, 10.0, &c), Posture::Portrait);
        assert_eq!(classify_posture(30.0, 80.0, &c), Posture::Landscape);
        assert_eq!(classify_posture(40.0, 10.0, &c), Posture::Unknown);
    }

    #[test]
    fn test_posture_rejects_non_finite_tilt() {
        let c = cfg();
        assert_eq!(classify_posture(f64::NAN, 0.0, &c), Posture::Unknown);
        assert_eq!(classify_posture(0.0, f64::INFINITY, &c), Posture::Unknown);
    }

    #[test]
    fn test_jitter_substitutes_for_stale_gps_speed() {
        let c = cfg();
        // Zero GPS speed, high jitter, fresh motion sample: still moving.
        assert!(is_moving(Some(0.0), 0.70, Some(0.5), &c));
        // Same jitter but the motion channel has gone quiet.
        assert!(!is_moving(Some(0.0), 0.70, Some(3.0), &c));
        assert!(!is_moving(Some(0.0), 0.70, None, &c));
    }

    #[test]
    fn test_speed_alone_means_moving() {
        let c = cfg();
        assert!(is_moving(Some(8.0), 0.0, None, &c));
        assert!(!is_moving(Some(0.5), 0.0, None, &c));
        assert!(!is_moving(Some(f64::NAN), 0.0, Some(0.1), &c));
    }

    #[test]
    fn test_desk_requires_flat_and_still() {
        let c = cfg();
        assert_eq!(classify_mount(Posture::Flat, false, 0.05, &c), MountState::Desk);
        // Flat but moving never reads as desk.
        assert_eq!(classify_mount(Posture::Flat, true, 0.05, &c), MountState::Flat);
        // Flat and still but too jittery for a surface.
        assert_eq!(classify_mount(Posture::Flat, false, 0.20, &c), MountState::Flat);
    }

    #[test]
    fn test_mount_priority_order() {
        let c = cfg();
        assert_eq!(classify_mount(Posture::Portrait, false, 0.05, &c), MountState::Parked);
        assert_eq!(classify_mount(Posture::Portrait, true, 0.80, &c), MountState::Hand);
        assert_eq!(classify_mount(Posture::Portrait, true, 0.20, &c), MountState::Mounted);
        assert_eq!(classify_mount(Posture::Landscape, true, 0.20, &c), MountState::Mounted);
        assert_eq!(classify_mount(Posture::Unknown, true, 0.20, &c), MountState::Unknown);
    }

    #[test]
    fn test_absent_orientation_is_unknown_posture() {
        let c = cfg();
        let store = SignalStore::new();
        let result = classify(&store, 0.0, &c, 100.0);
        assert_eq!(result.posture, Posture::Unknown);
        assert_eq!(result.mount_state, MountState::Parked);
        assert!(!result.moving);
    }
}
