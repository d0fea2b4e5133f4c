// platform.rs — boundary adapters: the code that owns actual subscription
// mechanics, device identity, and the notification surface. The estimator
// core only ever sees the channels and traits defined here.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::Sender;
use tokio::time::{interval, Duration};

use crate::notifier::{NotificationSink, PermissionState};
use crate::status::current_timestamp;
use crate::types::{LocationFix, MotionSample, OrientationSample};

// ─── Device identity ─────────────────────────────────────────────────────────

/// Stable per-installation identifier, lazily generated once and persisted.
/// The estimator consumes it as an opaque string.
pub fn load_or_create_node_id(path: &Path) -> io::Result<String> {
    if let Ok(existing) = fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    let id = format!("node-{:x}", (current_timestamp() * 1000.0) as u64);
    fs::write(path, &id)?;
    Ok(id)
}

// ─── Notification surface ────────────────────────────────────────────────────

/// Development sink: prints to stderr and always reports permission granted.
pub struct StderrNotificationSink;

impl NotificationSink for StderrNotificationSink {
    fn permission_state(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        eprintln!("[NOTIFY] {}: {}", title, body);
    }
}

// ─── Simulated sensor feeds ──────────────────────────────────────────────────
//
// Stand-ins for the real platform subscriptions, shaped like an actual drive:
// a device mounted in portrait, cruising with mild road vibration. Each loop
// runs at its own cadence and drops samples when its channel backs up.

pub async fn sim_location_loop(tx: Sender<LocationFix>) {
    let mut ticker = interval(Duration::from_secs(1));
    let mut fix_count = 0u64;

    loop {
        ticker.tick().await;
        let fix = sim_location_fix();

        match tx.try_send(fix) {
            Ok(_) => {
                fix_count += 1;
                if fix_count % 30 == 0 {
                    eprintln!("[location] {} fixes", fix_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("[location] channel closed after {} fixes", fix_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this fix
            }
        }
    }
}

pub async fn sim_motion_loop(tx: Sender<MotionSample>) {
    let mut ticker = interval(Duration::from_millis(100)); // 10 Hz
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;
        let sample = sim_motion_sample();

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 300 == 0 {
                    eprintln!("[motion] {} samples", sample_count);
                }
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("[motion] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this sample
            }
        }
    }
}

pub async fn sim_orientation_loop(tx: Sender<OrientationSample>) {
    let mut ticker = interval(Duration::from_millis(250)); // 4 Hz
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;
        let sample = sim_orientation_sample();

        match tx.try_send(sample) {
            Ok(_) => {
                sample_count += 1;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
                eprintln!("[orientation] channel closed after {} samples", sample_count);
                break;
            }
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                // Channel full, drop this sample
            }
        }
    }
}

fn sim_location_fix() -> LocationFix {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed) as f64;

    LocationFix {
        timestamp: current_timestamp(),
        latitude: 39.7392 + seq * 0.0002,
        longitude: -104.9903 + seq * 0.0001,
        speed_mps: Some(15.0 + (seq * 0.1).sin() * 5.0),
        heading_deg: Some((20.0 + seq * 0.5) % 360.0),
    }
}

fn sim_motion_sample() -> MotionSample {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f64 * 0.1;

    MotionSample {
        timestamp: current_timestamp(),
        x: (t * 3.0).sin() * 0.4,
        y: (t * 2.2).cos() * 0.3,
        z: 9.81 + (t * 7.0).sin() * 0.8,
    }
}

fn sim_orientation_sample() -> OrientationSample {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let t = COUNTER.fetch_add(1, Ordering::Relaxed) as f64 * 0.25;

    OrientationSample {
        timestamp: current_timestamp(),
        alpha_deg: (t * 0.3).sin() * 10.0,
        beta_deg: 85.0 + (t * 0.7).sin() * 5.0,
        gamma_deg: (t * 0.5).cos() * 8.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_is_created_once_then_reused() {
        let dir = std::env::temp_dir().join("roadsense_node_id_test");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("node_id");
        let _ = fs::remove_file(&path);

        let first = load_or_create_node_id(&path).unwrap();
        let second = load_or_create_node_id(&path).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("node-"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_sim_samples_are_plausible() {
        let fix = sim_location_fix();
        assert!(fix.latitude.abs() <= 90.0);
        assert!(fix.speed_mps.unwrap() > 0.0);

        let m = sim_motion_sample();
        assert!(m.magnitude_g() > 0.5 && m.magnitude_g() < 1.5);

        let o = sim_orientation_sample();
        assert!(o.beta_deg > 55.0 && o.beta_deg < 125.0);
    }
}
