// config.rs — every tunable threshold in one place.
//
// Classifier and scoring logic never carry literal thresholds; they read
// named fields from this struct so a deployment can be retuned without
// touching the decision code.

#[derive(Clone, Debug)]
pub struct EstimatorConfig {
    // ── Smoothing ──
    /// EWMA factor for motion level and jitter. Must lie in (0,1).
    pub ewma_alpha: f64,

    // ── Posture (degrees) ──
    pub flat_tilt_max_deg: f64,
    pub portrait_beta_min_deg: f64,
    pub portrait_beta_max_deg: f64,
    pub landscape_gamma_min_deg: f64,

    // ── Movement ──
    /// GPS speed above this counts as moving (m/s, slow-walk pace).
    pub moving_speed_mps: f64,
    /// Jitter above this counts as moving when the motion channel is fresh.
    pub moving_jitter_threshold: f64,
    /// Motion sample must be at most this old for the jitter clause (seconds).
    pub motion_recency_secs: f64,

    // ── Mount state ──
    /// Jitter below this, flat and still, reads as resting on a surface.
    pub desk_jitter_max: f64,
    /// Jitter above this reads as carried in hand.
    pub hand_jitter_min: f64,

    // ── Freshness decay windows (seconds) ──
    pub location_decay_secs: f64,
    pub motion_decay_secs: f64,
    pub orientation_decay_secs: f64,

    // ── Freshness channel weights ──
    pub location_weight: f64,
    pub motion_weight: f64,
    pub orientation_weight: f64,

    // ── Quality / confidence ──
    /// Jitter at or above this yields motion quality zero.
    pub jitter_quality_ceiling: f64,
    pub mount_weight_mounted: f64,
    pub mount_weight_desk: f64,
    pub mount_weight_parked: f64,
    pub mount_weight_flat: f64,
    pub mount_weight_unknown: f64,
    pub mount_weight_hand: f64,
    pub confidence_mount_share: f64,
    pub confidence_freshness_share: f64,
    pub confidence_quality_share: f64,
    pub analyzable_min_confidence: f64,
    pub points_min_confidence: f64,

    // ── Bucketing ──
    /// Window width for windowed aggregation (seconds).
    pub bucket_window_secs: u32,
    /// Bucket width stamped on live-tick records (seconds).
    pub bucket_live_secs: u32,
    /// |vertical acceleration| above this counts as a shock event (m/s²).
    pub shock_threshold_ms2: f64,
    /// Forced flush on stop requires more than this many samples.
    pub flush_min_samples: u32,
    /// Spatial grid cell size (meters).
    pub grid_cell_meters: f64,

    // ── Upload cadence (seconds) ──
    pub send_interval_moving_secs: f64,
    pub send_interval_idle_secs: f64,

    // ── Notifications ──
    pub notify_cooldown_secs: f64,

    // ── Tick cadences (milliseconds) ──
    pub fast_tick_ms: u64,
    pub debug_tick_ms: u64,
    pub send_tick_ms: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            ewma_alpha: 0.10,
            flat_tilt_max_deg: 25.0,
            portrait_beta_min_deg: 55.0,
            portrait_beta_max_deg: 125.0,
            landscape_gamma_min_deg: 45.0,
            moving_speed_mps: 1.2,
            moving_jitter_threshold: 0.18,
            motion_recency_secs: 1.5,
            desk_jitter_max: 0.10,
            hand_jitter_min: 0.55,
            location_decay_secs: 8.0,
            motion_decay_secs: 1.5,
            orientation_decay_secs: 2.5,
            location_weight: 0.45,
            motion_weight: 0.35,
            orientation_weight: 0.20,
            jitter_quality_ceiling: 0.70,
            mount_weight_mounted: 1.00,
            mount_weight_desk: 0.95,
            mount_weight_parked: 0.60,
            mount_weight_flat: 0.55,
            mount_weight_unknown: 0.40,
            mount_weight_hand: 0.15,
            confidence_mount_share: 0.50,
            confidence_freshness_share: 0.25,
            confidence_quality_share: 0.25,
            analyzable_min_confidence: 0.70,
            points_min_confidence: 0.80,
            bucket_window_secs: 60,
            bucket_live_secs: 5,
            shock_threshold_ms2: 2.2,
            flush_min_samples: 5,
            grid_cell_meters: 250.0,
            send_interval_moving_secs: 5.0,
            send_interval_idle_secs: 30.0,
            notify_cooldown_secs: 120.0,
            fast_tick_ms: 500,
            debug_tick_ms: 2000,
            send_tick_ms: 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_alpha_in_open_unit_interval() {
        let cfg = EstimatorConfig::default();
        assert!(cfg.ewma_alpha > 0.0 && cfg.ewma_alpha < 1.0);
    }

    #[test]
    fn test_points_bar_strictly_above_analyzable() {
        let cfg = EstimatorConfig::default();
        assert!(cfg.points_min_confidence > cfg.analyzable_min_confidence);
    }

    #[test]
    fn test_freshness_weights_sum_to_one() {
        let cfg = EstimatorConfig::default();
        let sum = cfg.location_weight + cfg.motion_weight + cfg.orientation_weight;
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
