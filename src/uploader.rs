// uploader.rs — send-rate policy plus the fire-and-forget transport.
//
// The scheduler bounds how often aggregates leave the device: a fast cadence
// while moving and a slow heartbeat while idle, tracked independently. A send
// either succeeds and clears the pending slot or records its error locally;
// there is no retry loop, the next tick simply re-attempts once a cooldown
// permits.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;

use crate::bucketizer::AggregateRecord;
use crate::config::EstimatorConfig;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("http status {0}")]
    Http(u16),
    #[error("transport: {0}")]
    Transport(String),
}

/// Request body: device identifier plus an ordered list of aggregates. The
/// receiving collaborator tolerates unknown fields and alternate list keys.
#[derive(Clone, Debug, Serialize)]
pub struct UploadBatch {
    pub node_id: String,
    pub rows: Vec<AggregateRecord>,
}

// ─── Cadence policy ──────────────────────────────────────────────────────────

/// Independent cooldowns for the moving cadence and the idle heartbeat.
/// Session-scoped; discarded when the session stops.
pub struct UploadScheduler {
    moving_interval_secs: f64,
    idle_interval_secs: f64,
    last_moving_attempt: Option<f64>,
    last_idle_attempt: Option<f64>,
}

impl UploadScheduler {
    pub fn new(cfg: &EstimatorConfig) -> Self {
        UploadScheduler {
            moving_interval_secs: cfg.send_interval_moving_secs,
            idle_interval_secs: cfg.send_interval_idle_secs,
            last_moving_attempt: None,
            last_idle_attempt: None,
        }
    }

    /// Whether a send is permitted right now; records the attempt time when
    /// it is. The moving and idle tracks never starve each other.
    pub fn should_send(&mut self, moving: bool, now: f64) -> bool {
        let (last, interval) = if moving {
            (&mut self.last_moving_attempt, self.moving_interval_secs)
        } else {
            (&mut self.last_idle_attempt, self.idle_interval_secs)
        };
        let due = last.map(|t| now - t >= interval).unwrap_or(true);
        if due {
            *last = Some(now);
        }
        due
    }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Local observability for the fire-and-forget sends.
#[derive(Clone, Debug, Default)]
pub struct UploadStatus {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_success_at: Option<f64>,
}

pub struct Uploader {
    client: reqwest::Client,
    ingest_url: String,
    api_key: Option<String>,
    status: Arc<Mutex<UploadStatus>>,
}

impl Uploader {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Uploader {
            client: reqwest::Client::new(),
            ingest_url: format!("{}/v1/ingest/aggregates", base_url.trim_end_matches('/')),
            api_key,
            status: Arc::new(Mutex::new(UploadStatus::default())),
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Fire-and-forget: spawn the POST and return immediately. The outcome
    /// lands in the shared status; a session that already stopped simply
    /// ignores the late completion.
    pub fn dispatch(&self, batch: UploadBatch, now: f64) {
        let client = self.client.clone();
        let url = self.ingest_url.clone();
        let api_key = self.api_key.clone();
        let status = Arc::clone(&self.status);

        if let Ok(mut s) = status.lock() {
            s.attempts += 1;
        }

        tokio::spawn(async move {
            match post_batch(&client, &url, api_key.as_deref(), &batch).await {
                Ok(()) => {
                    if let Ok(mut s) = status.lock() {
                        s.successes += 1;
                        s.last_error = None;
                        s.last_success_at = Some(now);
                    }
                }
                Err(e) => {
                    log::warn!("upload failed: {}", e);
                    if let Ok(mut s) = status.lock() {
                        s.failures += 1;
                        s.last_error = Some(e.to_string());
                    }
                }
            }
        });
    }
}

async fn post_batch(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    batch: &UploadBatch,
) -> Result<(), UploadError> {
    let mut req = client.post(url).json(batch);
    if let Some(key) = api_key {
        req = req.header("x-api-key", key);
    }
    let resp = req
        .send()
        .await
        .map_err(|e| UploadError::Transport(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(UploadError::Http(status.as_u16()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> UploadScheduler {
        UploadScheduler::new(&EstimatorConfig::default())
    }

    #[test]
    fn test_first_send_is_always_due() {
        let mut s = scheduler();
        assert!(s.should_send(true, 100.0));
        let mut s = scheduler();
        assert!(s.should_send(false, 100.0));
    }

    #[test]
    fn test_moving_cadence() {
        let mut s = scheduler();
        assert!(s.should_send(true, 100.0));
        assert!(!s.should_send(true, 103.0));
        assert!(!s.should_send(true, 104.9));
        assert!(s.should_send(true, 105.0));
    }

    #[test]
    fn test_idle_heartbeat_is_slower() {
        let mut s = scheduler();
        assert!(s.should_send(false, 100.0));
        assert!(!s.should_send(false, 115.0));
        assert!(s.should_send(false, 130.0));
    }

    #[test]
    fn test_tracks_are_independent() {
        let mut s = scheduler();
        assert!(s.should_send(false, 100.0));
        // Starting to move opens the fast track immediately.
        assert!(s.should_send(true, 101.0));
        // Stopping again: the idle track still remembers its own clock.
        assert!(!s.should_send(false, 110.0));
        assert!(s.should_send(false, 131.0));
    }

    #[test]
    fn test_batch_envelope_shape() {
        let batch = UploadBatch { node_id: "node-1".into(), rows: vec![] };
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["node_id"], "node-1");
        assert!(json["rows"].as_array().unwrap().is_empty());
    }
}
