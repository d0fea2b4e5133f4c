// signal_store.rs — latest value per sensor channel, last write wins.
//
// Callbacks from the platform layer only ever overwrite here; no history is
// kept. Staleness and confidence scoring downstream are the safety net, so no
// validation happens on the way in (NaN speed passes through untouched).

use crate::types::{LocationFix, MotionSample, OrientationSample};

#[derive(Clone, Debug, Default)]
pub struct SignalStore {
    location: Option<LocationFix>,
    location_seen_at: Option<f64>,
    motion: Option<StoredMotion>,
    motion_seen_at: Option<f64>,
    orientation: Option<OrientationSample>,
    orientation_seen_at: Option<f64>,
}

/// What the store retains from a motion sample: the normalized magnitude and
/// its capture time. The raw vector is consumed on arrival.
#[derive(Clone, Copy, Debug)]
pub struct StoredMotion {
    pub magnitude_g: f64,
    pub timestamp: f64,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_location(&mut self, fix: LocationFix, arrived_at: f64) {
        self.location = Some(fix);
        self.location_seen_at = Some(arrived_at);
    }

    pub fn record_motion(&mut self, sample: &MotionSample, arrived_at: f64) {
        self.motion = Some(StoredMotion {
            magnitude_g: sample.magnitude_g(),
            timestamp: sample.timestamp,
        });
        self.motion_seen_at = Some(arrived_at);
    }

    pub fn record_orientation(&mut self, sample: OrientationSample, arrived_at: f64) {
        self.orientation = Some(sample);
        self.orientation_seen_at = Some(arrived_at);
    }

    pub fn latest_location(&self) -> Option<&LocationFix> {
        self.location.as_ref()
    }

    pub fn latest_motion(&self) -> Option<StoredMotion> {
        self.motion
    }

    pub fn latest_orientation(&self) -> Option<&OrientationSample> {
        self.orientation.as_ref()
    }

    /// Age of each channel in seconds, `None` if it never reported.
    pub fn location_age(&self, now: f64) -> Option<f64> {
        self.location_seen_at.map(|t| (now - t).max(0.0))
    }

    pub fn motion_age(&self, now: f64) -> Option<f64> {
        self.motion_seen_at.map(|t| (now - t).max(0.0))
    }

    pub fn orientation_age(&self, now: f64) -> Option<f64> {
        self.orientation_seen_at.map(|t| (now - t).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_reports_nothing() {
        let store = SignalStore::new();
        assert!(store.latest_location().is_none());
        assert!(store.latest_motion().is_none());
        assert!(store.location_age(100.0).is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut store = SignalStore::new();
        let a = LocationFix {
            timestamp: 1.0,
            latitude: 40.0,
            longitude: -105.0,
            speed_mps: Some(3.0),
            heading_deg: None,
        };
        let b = LocationFix { timestamp: 2.0, latitude: 41.0, ..a.clone() };
        store.record_location(a, 1.0);
        store.record_location(b, 2.0);
        assert_eq!(store.latest_location().unwrap().latitude, 41.0);
        assert_eq!(store.location_age(5.0), Some(3.0));
    }

    #[test]
    fn test_nan_passes_through_unrejected() {
        let mut store = SignalStore::new();
        let fix = LocationFix {
            timestamp: 1.0,
            latitude: 40.0,
            longitude: -105.0,
            speed_mps: Some(f64::NAN),
            heading_deg: Some(f64::INFINITY),
        };
        store.record_location(fix, 1.0);
        assert!(store.latest_location().unwrap().speed_mps.unwrap().is_nan());
    }
}
