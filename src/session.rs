// session.rs — collection-session lifecycle and tick wiring.
//
// The session owns no classification logic. It subscribes the ingest task to
// the three sensor channels, runs three independently-paced timers (fast
// snapshot refresh, slower debug refresh, send loop), and tears everything
// down deterministically on stop. Smoothing, scheduler, and throttle state
// live inside the spawned tasks or the core, so stopping a session discards
// them; a restart always begins from a clean estimator.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::bucketizer::{BucketMode, Bucketizer};
use crate::config::EstimatorConfig;
use crate::notifier::{NotificationSink, NotificationThrottler};
use crate::scoring::{self, Evaluation, QualityNote};
use crate::signal_store::SignalStore;
use crate::smoothing::MotionSmoother;
use crate::status::{current_timestamp, LiveStatus, SampleCounters};
use crate::types::{LocationFix, MotionSample, OrientationSample};
use crate::uploader::{UploadBatch, UploadScheduler, Uploader};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
}

/// Inbound sensor channels, produced by a platform adapter.
pub struct SensorFeeds {
    pub location_rx: Receiver<LocationFix>,
    pub motion_rx: Receiver<MotionSample>,
    pub orientation_rx: Receiver<OrientationSample>,
}

/// All mutable per-session estimator state, serialized behind one mutex.
/// Sensor callbacks only do constant-time overwrites here; every tick
/// recomputes the pure pipeline from whatever is current.
struct SessionCore {
    store: SignalStore,
    smoother: MotionSmoother,
    bucketizer: Bucketizer,
    counters: SampleCounters,
}

pub type SharedStatus = Arc<Mutex<Option<LiveStatus>>>;

pub struct Session {
    state: SessionState,
    node_id: String,
    core: Arc<Mutex<SessionCore>>,
    uploader: Arc<Uploader>,
    shared_status: SharedStatus,
    tasks: Vec<JoinHandle<()>>,
    cfg: EstimatorConfig,
}

impl Session {
    /// Start a session: subscribe to the three feeds and start the timers.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        cfg: EstimatorConfig,
        node_id: String,
        feeds: SensorFeeds,
        uploader: Uploader,
        sink: Arc<dyn NotificationSink>,
        bucket_mode: BucketMode,
        status_path: Option<String>,
    ) -> Self {
        let mut session = Session {
            state: SessionState::Starting,
            node_id: node_id.clone(),
            core: Arc::new(Mutex::new(SessionCore {
                store: SignalStore::new(),
                smoother: MotionSmoother::new(cfg.ewma_alpha),
                bucketizer: Bucketizer::new(bucket_mode, &cfg),
                counters: SampleCounters::default(),
            })),
            uploader: Arc::new(uploader),
            shared_status: Arc::new(Mutex::new(None)),
            tasks: Vec::new(),
            cfg,
        };

        session.tasks.push(tokio::spawn(ingest_loop(Arc::clone(&session.core), feeds)));
        session.tasks.push(tokio::spawn(fast_tick_loop(
            Arc::clone(&session.core),
            Arc::clone(&session.uploader),
            Arc::clone(&session.shared_status),
            session.cfg.clone(),
        )));
        session.tasks.push(tokio::spawn(debug_tick_loop(
            Arc::clone(&session.core),
            Arc::clone(&session.uploader),
            session.cfg.clone(),
            status_path,
        )));
        session.tasks.push(tokio::spawn(send_loop(
            Arc::clone(&session.core),
            Arc::clone(&session.uploader),
            sink,
            session.cfg.clone(),
            node_id,
        )));

        session.state = SessionState::Running;
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Shared slot the dashboard reads from.
    pub fn shared_status(&self) -> SharedStatus {
        Arc::clone(&self.shared_status)
    }

    /// Run the pure pipeline against current state, outside any tick.
    pub fn evaluate_now(&self) -> Option<Evaluation> {
        let core = self.core.lock().ok()?;
        let now = current_timestamp();
        Some(scoring::evaluate(&core.store, &core.smoother, &self.cfg, now))
    }

    /// Stop the session: cancel every timer and subscription, flush a
    /// nearly-complete window if one exists, and discard session state.
    /// Idempotent; safe to call while ticks are in flight.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.state = SessionState::Idle;

        for task in self.tasks.drain(..) {
            task.abort();
        }

        if let Ok(mut core) = self.core.lock() {
            let now = current_timestamp();
            let eval = scoring::evaluate(&core.store, &core.smoother, &self.cfg, now);
            if let Some(record) = core.bucketizer.force_flush(&eval, &self.node_id) {
                self.uploader.dispatch(
                    UploadBatch { node_id: self.node_id.clone(), rows: vec![record] },
                    now,
                );
            }
        }
    }
}

// ─── Tasks ───────────────────────────────────────────────────────────────────

/// Consumes all three channels; each arrival is a constant-time overwrite
/// plus an O(1) smoother/accumulator update, so it can never block a tick
/// for long. A channel that closes (platform revoked, permission denied)
/// stops feeding without taking the others down; scoring degrades through
/// staleness on its own.
async fn ingest_loop(core: Arc<Mutex<SessionCore>>, mut feeds: SensorFeeds) {
    let mut location_open = true;
    let mut motion_open = true;
    let mut orientation_open = true;

    while location_open || motion_open || orientation_open {
        tokio::select! {
            fix = feeds.location_rx.recv(), if location_open => match fix {
                Some(fix) => {
                    if let Ok(mut c) = core.lock() {
                        c.store.record_location(fix, current_timestamp());
                        c.counters.location_fixes += 1;
                    }
                }
                None => location_open = false,
            },
            sample = feeds.motion_rx.recv(), if motion_open => match sample {
                Some(sample) => {
                    if let Ok(mut c) = core.lock() {
                        let now = current_timestamp();
                        c.store.record_motion(&sample, now);
                        c.smoother.update(sample.magnitude_g());
                        c.bucketizer.push_motion(sample.vertical_ms2(), now);
                        c.counters.motion_samples += 1;
                    }
                }
                None => motion_open = false,
            },
            orientation = feeds.orientation_rx.recv(), if orientation_open => match orientation {
                Some(o) => {
                    if let Ok(mut c) = core.lock() {
                        c.store.record_orientation(o, current_timestamp());
                        c.counters.orientation_samples += 1;
                    }
                }
                None => orientation_open = false,
            },
        }
    }
}

fn snapshot(
    core: &SessionCore,
    uploader: &Uploader,
    cfg: &EstimatorConfig,
    started: f64,
    now: f64,
) -> LiveStatus {
    let eval = scoring::evaluate(&core.store, &core.smoother, cfg, now);
    LiveStatus::from_parts(
        &eval,
        &uploader.status(),
        core.counters,
        (now - started).max(0.0) as u64,
    )
}

/// Fast refresh: recomputes the pipeline and publishes the snapshot any UI
/// consumer reads. Nothing is persisted here.
async fn fast_tick_loop(
    core: Arc<Mutex<SessionCore>>,
    uploader: Arc<Uploader>,
    shared: SharedStatus,
    cfg: EstimatorConfig,
) {
    let started = current_timestamp();
    let mut ticker = interval(Duration::from_millis(cfg.fast_tick_ms));
    loop {
        ticker.tick().await;
        let status = {
            let Ok(c) = core.lock() else { continue };
            snapshot(&c, &uploader, &cfg, started, current_timestamp())
        };
        if let Ok(mut slot) = shared.lock() {
            *slot = Some(status);
        }
    }
}

/// Slow refresh: writes the debug snapshot to disk for field inspection and
/// leaves a trace in the debug log.
async fn debug_tick_loop(
    core: Arc<Mutex<SessionCore>>,
    uploader: Arc<Uploader>,
    cfg: EstimatorConfig,
    status_path: Option<String>,
) {
    let started = current_timestamp();
    let mut ticker = interval(Duration::from_millis(cfg.debug_tick_ms));
    loop {
        ticker.tick().await;
        let status = {
            let Ok(c) = core.lock() else { continue };
            snapshot(&c, &uploader, &cfg, started, current_timestamp())
        };
        log::debug!(
            "mount={} moving={} confidence={:.3} note={}",
            status.mount_state,
            status.moving,
            status.confidence,
            status.quality_note
        );
        if let Some(ref path) = status_path {
            if let Err(e) = status.save(path) {
                log::warn!("failed to write status file {}: {}", path, e);
            }
        }
    }
}

/// The send loop: one evaluation per tick, one record offered to the pending
/// slot, sends gated by the dual-cadence scheduler, warnings gated by the
/// throttler.
async fn send_loop(
    core: Arc<Mutex<SessionCore>>,
    uploader: Arc<Uploader>,
    sink: Arc<dyn NotificationSink>,
    cfg: EstimatorConfig,
    node_id: String,
) {
    let mut ticker = interval(Duration::from_millis(cfg.send_tick_ms));
    let mut scheduler = UploadScheduler::new(&cfg);
    let mut throttler = NotificationThrottler::new(cfg.notify_cooldown_secs);
    // Pending aggregates are capped at the most recent unacknowledged record.
    let mut pending: Option<crate::bucketizer::AggregateRecord> = None;

    loop {
        ticker.tick().await;
        let now = current_timestamp();
        let (eval, record) = {
            let Ok(mut c) = core.lock() else { continue };
            let eval = scoring::evaluate(&c.store, &c.smoother, &cfg, now);
            let record = c.bucketizer.on_tick(&eval, &node_id, now);
            (eval, record)
        };

        if let Some(record) = record {
            pending = Some(record);
        }

        if pending.is_some() && scheduler.should_send(eval.classification.moving, now) {
            if let Some(record) = pending.take() {
                uploader.dispatch(UploadBatch { node_id: node_id.clone(), rows: vec![record] }, now);
            }
        }

        if eval.classification.moving && eval.scoring.quality_note != QualityNote::Ok {
            let (title, body) = alert_text(eval.scoring.quality_note);
            throttler.maybe_notify(&*sink, eval.scoring.quality_note.as_str(), title, body, now);
        }
    }
}

fn alert_text(note: QualityNote) -> (&'static str, &'static str) {
    match note {
        QualityNote::InHand => (
            "Data may be unanalyzable",
            "Your device appears to be in hand. Mount it to collect usable data.",
        ),
        QualityNote::FlatNotMounted => (
            "Data may be unanalyzable",
            "Your device is lying flat. Mount it upright to collect usable data.",
        ),
        QualityNote::NotMounted => (
            "Data may be unanalyzable",
            "Your device does not appear to be mounted.",
        ),
        QualityNote::LowConfidence => (
            "Data may be unanalyzable",
            "Signal quality is too low for analysis right now.",
        ),
        QualityNote::NotMoving | QualityNote::Ok => ("", ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::PermissionState;
    use tokio::sync::mpsc;

    struct SilentSink;

    impl NotificationSink for SilentSink {
        fn permission_state(&self) -> PermissionState {
            PermissionState::Undetermined
        }

        fn notify(&self, _title: &str, _body: &str) {}
    }

    struct TestHarness {
        motion_tx: mpsc::Sender<MotionSample>,
        _location_tx: mpsc::Sender<LocationFix>,
        _orientation_tx: mpsc::Sender<OrientationSample>,
        session: Session,
    }

    fn start_session() -> TestHarness {
        let (location_tx, location_rx) = mpsc::channel(16);
        let (motion_tx, motion_rx) = mpsc::channel(128);
        let (orientation_tx, orientation_rx) = mpsc::channel(16);
        let session = Session::start(
            EstimatorConfig::default(),
            "node-test".to_string(),
            SensorFeeds { location_rx, motion_rx, orientation_rx },
            Uploader::new("http://127.0.0.1:9", None),
            Arc::new(SilentSink),
            BucketMode::LiveTick,
            None,
        );
        TestHarness {
            motion_tx,
            _location_tx: location_tx,
            _orientation_tx: orientation_tx,
            session,
        }
    }

    #[tokio::test]
    async fn test_session_ingests_and_stops_idempotently() {
        let mut h = start_session();
        assert_eq!(h.session.state(), SessionState::Running);

        for i in 0..20 {
            let shake = if i % 2 == 0 { 6.0 } else { 0.0 };
            h.motion_tx
                .send(MotionSample { timestamp: i as f64, x: 0.0, y: shake, z: 9.81 })
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let eval = h.session.evaluate_now().unwrap();
        assert!(eval.motion_jitter > 0.0);

        h.session.stop();
        assert_eq!(h.session.state(), SessionState::Idle);
        h.session.stop();
        assert_eq!(h.session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_restart_begins_with_clean_smoothing_state() {
        let mut first = start_session();
        for i in 0..20 {
            let shake = if i % 2 == 0 { 6.0 } else { 0.0 };
            first
                .motion_tx
                .send(MotionSample { timestamp: i as f64, x: shake, y: 0.0, z: 9.81 })
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(first.session.evaluate_now().unwrap().motion_jitter > 0.0);
        first.session.stop();

        let second = start_session();
        let eval = second.session.evaluate_now().unwrap();
        assert_eq!(eval.motion_jitter, 0.0);
        assert_eq!(eval.motion_level, 0.0);
    }
}
