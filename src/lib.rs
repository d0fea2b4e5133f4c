//! roadsense_rs — device-side road data quality estimator.
//!
//! Continuously classifies the physical state of a mobile sensing device
//! (mounted, in-hand, flat, moving) from noisy, asynchronously-arriving
//! motion, orientation, and location signals; derives a running confidence
//! score for whether the current stream is scientifically usable; and
//! governs when aggregated telemetry is uploaded and when the user is warned
//! that their collection setup is unreliable.
//!
//! # Design
//!
//! Deliberately not an inertial-navigation stack: no orientation filters, no
//! Kalman filtering. The classifier is built from simple thresholds and
//! exponential smoothing so its behavior stays auditable and tunable; every
//! threshold lives in [`config::EstimatorConfig`].
//!
//! Control flow: raw events → signal store → {smoothing, stored fields} →
//! classifier → scoring → bucketizer → {upload scheduler, notifier}. All
//! stages downstream of the store are pull-based: every tick recomputes the
//! pure pipeline from the latest known state.

pub mod bucketizer;
pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod notifier;
pub mod platform;
pub mod scoring;
pub mod session;
pub mod signal_store;
pub mod smoothing;
pub mod status;
pub mod types;
pub mod uploader;

pub use bucketizer::{AggregateRecord, BucketMode, Bucketizer};
pub use classifier::{ClassificationResult, MountState, Posture};
pub use config::EstimatorConfig;
pub use notifier::{NotificationSink, NotificationThrottler, PermissionState};
pub use scoring::{Evaluation, QualityNote, ScoringResult};
pub use session::{SensorFeeds, Session, SessionState};
pub use signal_store::SignalStore;
pub use smoothing::MotionSmoother;
pub use uploader::{UploadBatch, UploadScheduler, Uploader};
