// scoring.rs — freshness, motion quality, confidence, and the two gates.
//
// Everything here is a pure function of the classifier output plus channel
// ages. Confidence math clamps after every composition step so a NaN or
// infinity arriving from a sensor can never reach a persisted record.

use serde::Serialize;

use crate::classifier::{self, ClassificationResult, MountState};
use crate::config::EstimatorConfig;
use crate::signal_store::SignalStore;
use crate::smoothing::MotionSmoother;

/// Single-cause explanation for why a bucket is or is not usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityNote {
    NotMoving,
    InHand,
    FlatNotMounted,
    NotMounted,
    LowConfidence,
    Ok,
}

impl QualityNote {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityNote::NotMoving => "not_moving",
            QualityNote::InHand => "in_hand",
            QualityNote::FlatNotMounted => "flat_not_mounted",
            QualityNote::NotMounted => "not_mounted",
            QualityNote::LowConfidence => "low_confidence",
            QualityNote::Ok => "ok",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ScoringResult {
    pub freshness: f64,
    pub motion_quality: f64,
    pub confidence: f64,
    pub analyzable: bool,
    pub points_eligible: bool,
    pub quality_note: QualityNote,
}

/// One full pipeline evaluation: classification, scores, and the raw context
/// the bucketizer stamps onto records.
#[derive(Clone, Copy, Debug)]
pub struct Evaluation {
    pub classification: ClassificationResult,
    pub scoring: ScoringResult,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub motion_level: f64,
    pub motion_jitter: f64,
}

pub fn clamp01(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Freshness of one channel: 1.0 at arrival, linear decay to 0 over the
/// channel's decay window. A channel that never reported scores 0.
pub fn channel_freshness(age: Option<f64>, decay_secs: f64) -> f64 {
    match age {
        Some(a) => clamp01(1.0 - a / decay_secs),
        None => 0.0,
    }
}

/// Weighted composite across the three channels. Location dominates because
/// it is the slowest, least reliable channel and its staleness is the most
/// consequential failure mode.
pub fn composite_freshness(store: &SignalStore, cfg: &EstimatorConfig, now: f64) -> f64 {
    let location = channel_freshness(store.location_age(now), cfg.location_decay_secs);
    let motion = channel_freshness(store.motion_age(now), cfg.motion_decay_secs);
    let orientation = channel_freshness(store.orientation_age(now), cfg.orientation_decay_secs);
    clamp01(
        cfg.location_weight * location
            + cfg.motion_weight * motion
            + cfg.orientation_weight * orientation,
    )
}

/// High jitter directly penalizes trustworthiness, independent of mount
/// state. Raw jitter is unbounded, so clamp before dividing; a non-finite
/// jitter reads as worst case, not best.
pub fn motion_quality(jitter: f64, cfg: &EstimatorConfig) -> f64 {
    if !jitter.is_finite() {
        return 0.0;
    }
    clamp01(1.0 - clamp01(jitter) / cfg.jitter_quality_ceiling)
}

/// In-hand data is nearly worthless; dash-mounted is the gold standard.
pub fn mount_weight(mount: MountState, cfg: &EstimatorConfig) -> f64 {
    match mount {
        MountState::Mounted => cfg.mount_weight_mounted,
        MountState::Desk => cfg.mount_weight_desk,
        MountState::Parked => cfg.mount_weight_parked,
        MountState::Flat => cfg.mount_weight_flat,
        MountState::Unknown => cfg.mount_weight_unknown,
        MountState::Hand => cfg.mount_weight_hand,
    }
}

/// Mount state dominates the blend; freshness and quality are tie-breakers.
pub fn confidence(mount_w: f64, freshness: f64, quality: f64, cfg: &EstimatorConfig) -> f64 {
    clamp01(
        cfg.confidence_mount_share * clamp01(mount_w)
            + cfg.confidence_freshness_share * clamp01(freshness)
            + cfg.confidence_quality_share * clamp01(quality),
    )
}

fn quality_note(
    classification: &ClassificationResult,
    conf: f64,
    cfg: &EstimatorConfig,
) -> QualityNote {
    if !classification.moving {
        QualityNote::NotMoving
    } else if classification.mount_state == MountState::Hand {
        QualityNote::InHand
    } else if classification.mount_state == MountState::Flat {
        QualityNote::FlatNotMounted
    } else if classification.mount_state != MountState::Mounted {
        QualityNote::NotMounted
    } else if conf < cfg.analyzable_min_confidence {
        QualityNote::LowConfidence
    } else {
        QualityNote::Ok
    }
}

pub fn score(
    classification: &ClassificationResult,
    store: &SignalStore,
    jitter: f64,
    cfg: &EstimatorConfig,
    now: f64,
) -> ScoringResult {
    let freshness = composite_freshness(store, cfg, now);
    let quality = motion_quality(jitter, cfg);
    let conf = confidence(mount_weight(classification.mount_state, cfg), freshness, quality, cfg);

    let analyzable = classification.moving
        && classification.mount_state == MountState::Mounted
        && conf >= cfg.analyzable_min_confidence;
    let points_eligible = analyzable && conf >= cfg.points_min_confidence;

    ScoringResult {
        freshness,
        motion_quality: quality,
        confidence: conf,
        analyzable,
        points_eligible,
        quality_note: quality_note(classification, conf, cfg),
    }
}

/// Run the whole pull-based pipeline against current state. Idempotent;
/// called from every tick.
pub fn evaluate(
    store: &SignalStore,
    smoother: &MotionSmoother,
    cfg: &EstimatorConfig,
    now: f64,
) -> Evaluation {
    let jitter = smoother.jitter();
    let classification = classifier::classify(store, jitter, cfg, now);
    let scoring = score(&classification, store, jitter, cfg, now);

    let location = store.latest_location();
    Evaluation {
        classification,
        scoring,
        latitude: location.map(|l| l.latitude),
        longitude: location.map(|l| l.longitude),
        speed_mps: location.and_then(|l| l.speed_mps),
        heading_deg: location.and_then(|l| l.heading_deg),
        motion_level: smoother.level(),
        motion_jitter: jitter,
    }
}
