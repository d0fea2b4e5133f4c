use serde::Serialize;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::scoring::Evaluation;
use crate::uploader::UploadStatus;

/// Debug snapshot written by the slow refresh tick and pushed to the
/// dashboard. Everything a field test needs to see at a glance.
#[derive(Clone, Debug, Serialize)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub uptime_seconds: u64,
    // Signal intake
    pub location_fixes: u64,
    pub motion_samples: u64,
    pub orientation_samples: u64,
    // Classification
    pub posture: String,
    pub mount_state: String,
    pub moving: bool,
    // Scoring
    pub freshness: f64,
    pub motion_quality: f64,
    pub confidence: f64,
    pub analyzable: bool,
    pub points_eligible: bool,
    pub quality_note: String,
    // Smoothing
    pub motion_level_g: f64,
    pub motion_jitter: f64,
    // Upload
    pub upload_attempts: u64,
    pub upload_successes: u64,
    pub upload_failures: u64,
    pub last_upload_error: Option<String>,
}

impl LiveStatus {
    pub fn from_parts(
        eval: &Evaluation,
        upload: &UploadStatus,
        counters: SampleCounters,
        uptime_seconds: u64,
    ) -> Self {
        LiveStatus {
            timestamp: current_timestamp(),
            uptime_seconds,
            location_fixes: counters.location_fixes,
            motion_samples: counters.motion_samples,
            orientation_samples: counters.orientation_samples,
            posture: eval.classification.posture.as_str().to_string(),
            mount_state: eval.classification.mount_state.as_str().to_string(),
            moving: eval.classification.moving,
            freshness: eval.scoring.freshness,
            motion_quality: eval.scoring.motion_quality,
            confidence: eval.scoring.confidence,
            analyzable: eval.scoring.analyzable,
            points_eligible: eval.scoring.points_eligible,
            quality_note: eval.scoring.quality_note.as_str().to_string(),
            motion_level_g: eval.motion_level,
            motion_jitter: eval.motion_jitter,
            upload_attempts: upload.attempts,
            upload_successes: upload.successes,
            upload_failures: upload.failures,
            last_upload_error: upload.last_error.clone(),
        }
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Per-channel intake counters, kept by the ingest task.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleCounters {
    pub location_fixes: u64,
    pub motion_samples: u64,
    pub orientation_samples: u64,
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
