// bucketizer.rs — groups pipeline output into fixed-width time windows and
// builds the upload-ready records.
//
// Bucket boundaries are floored to exact multiples of the width in ms since
// epoch so independent observers recompute identical buckets. Two modes:
// windowed (accumulate, flush at the boundary) and live-tick (every
// evaluation is its own short bucket).

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::config::EstimatorConfig;
use crate::scoring::Evaluation;

const METERS_PER_DEGREE: f64 = 111_320.0;
const MPH_PER_MPS: f64 = 2.236_936;

// ─── Banding ─────────────────────────────────────────────────────────────────

/// Speed band over mph. Unmeasurable speed maps to an explicit "unknown",
/// never silently to the first band.
pub fn speed_band(speed_mps: Option<f64>) -> &'static str {
    let mph = match speed_mps {
        Some(s) if s.is_finite() && s >= 0.0 => s * MPH_PER_MPS,
        _ => return "unknown",
    };
    match mph {
        m if m < 15.0 => "0-15",
        m if m < 30.0 => "15-30",
        m if m < 45.0 => "30-45",
        m if m < 60.0 => "45-60",
        m if m < 75.0 => "60-75",
        _ => "75+",
    }
}

/// Compass octant from heading degrees; "unk" when no usable heading exists.
pub fn direction_bin(heading_deg: Option<f64>) -> &'static str {
    const OCTANTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    match heading_deg {
        Some(h) if h.is_finite() && (0.0..360.0).contains(&h) => {
            OCTANTS[(((h + 22.5) / 45.0).floor() as usize) % 8]
        }
        _ => "unk",
    }
}

/// Coarse spatial cell from a meters-per-degree projection. The key stands in
/// for exact coordinates in aggregate storage; out-of-range or non-finite
/// input yields "unknown".
pub fn grid_key(lat: Option<f64>, lon: Option<f64>, cell_meters: f64) -> String {
    let (lat, lon) = match (lat, lon) {
        (Some(lat), Some(lon))
            if lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0 =>
        {
            (lat, lon)
        }
        _ => return "unknown".to_string(),
    };
    let gy = (lat * METERS_PER_DEGREE / cell_meters).floor() as i64;
    let gx = (lon * METERS_PER_DEGREE * lat.to_radians().cos() / cell_meters).floor() as i64;
    format!("c{}:{}:{}", cell_meters as i64, gx, gy)
}

/// Floor a wall-clock instant to the enclosing bucket boundary.
pub fn bucket_floor_ms(now_ms: i64, width_ms: i64) -> i64 {
    (now_ms.div_euclid(width_ms)) * width_ms
}

fn iso_utc_seconds(epoch_ms: i64) -> String {
    match Utc.timestamp_millis_opt(epoch_ms).single() {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => String::from("1970-01-01T00:00:00Z"),
    }
}

// ─── Wire record ─────────────────────────────────────────────────────────────

/// One upload-ready aggregate. Field names match the receiving collaborator's
/// columns; absent optionals are omitted so older servers stay compatible.
#[derive(Clone, Debug, Serialize)]
pub struct AggregateRecord {
    pub node_id: String,
    pub bucket_start: String,
    pub bucket_seconds: u32,
    pub grid_key: String,
    pub direction: String,
    pub speed_band: String,
    pub road_roughness: Option<f64>,
    pub shock_events: u32,
    pub confidence: f64,
    pub sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    pub analyzable: u8,
    pub points_eligible: u8,
    pub quality_note: String,
    pub mount_state: String,
    pub moving: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    pub motion_g: f64,
    pub motion_rms: f64,
    pub device_posture: String,
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

// ─── Accumulation ────────────────────────────────────────────────────────────

/// Running vertical-acceleration statistics between emissions: sum of squares
/// for the RMS roughness proxy, plus a shock counter.
#[derive(Clone, Copy, Debug, Default)]
struct VerticalAccum {
    count: u32,
    sum_squares: f64,
    shocks: u32,
}

impl VerticalAccum {
    fn push(&mut self, vertical_ms2: f64, shock_threshold: f64) {
        if !vertical_ms2.is_finite() {
            return;
        }
        self.count += 1;
        self.sum_squares += vertical_ms2 * vertical_ms2;
        if vertical_ms2.abs() > shock_threshold {
            self.shocks += 1;
        }
    }

    fn rms(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some((self.sum_squares / self.count as f64).sqrt())
        }
    }

    fn reset(&mut self) {
        *self = VerticalAccum::default();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketMode {
    /// Accumulate a full window, flush one aggregate when it closes.
    Windowed,
    /// Every send-loop evaluation is its own short single-sample bucket.
    LiveTick,
}

pub struct Bucketizer {
    mode: BucketMode,
    window_ms: i64,
    live_ms: i64,
    shock_threshold: f64,
    flush_min_samples: u32,
    grid_cell_meters: f64,
    accum: VerticalAccum,
    /// Start of the currently-open window (windowed mode only).
    open_window_ms: Option<i64>,
}

impl Bucketizer {
    pub fn new(mode: BucketMode, cfg: &EstimatorConfig) -> Self {
        Bucketizer {
            mode,
            window_ms: i64::from(cfg.bucket_window_secs) * 1000,
            live_ms: i64::from(cfg.bucket_live_secs) * 1000,
            shock_threshold: cfg.shock_threshold_ms2,
            flush_min_samples: cfg.flush_min_samples,
            grid_cell_meters: cfg.grid_cell_meters,
            accum: VerticalAccum::default(),
            open_window_ms: None,
        }
    }

    pub fn mode(&self) -> BucketMode {
        self.mode
    }

    /// Feed the vertical deviation of one raw motion sample (m/s²). Constant
    /// time; called from the ingest path.
    pub fn push_motion(&mut self, vertical_ms2: f64, now: f64) {
        if self.mode == BucketMode::Windowed && self.open_window_ms.is_none() {
            self.open_window_ms = Some(bucket_floor_ms(to_ms(now), self.window_ms));
        }
        self.accum.push(vertical_ms2, self.shock_threshold);
    }

    /// One scheduler evaluation. Live mode always yields a record; windowed
    /// mode yields one only when the wall clock has crossed into a new
    /// window.
    pub fn on_tick(&mut self, eval: &Evaluation, node_id: &str, now: f64) -> Option<AggregateRecord> {
        match self.mode {
            BucketMode::LiveTick => {
                let start = bucket_floor_ms(to_ms(now), self.live_ms);
                let roughness = self.accum.rms();
                let shocks = self.accum.shocks;
                self.accum.reset();
                Some(self.build(eval, node_id, start, self.live_ms, roughness, shocks, 1))
            }
            BucketMode::Windowed => {
                let current = bucket_floor_ms(to_ms(now), self.window_ms);
                let open = self.open_window_ms.get_or_insert(current);
                if current == *open {
                    return None;
                }
                let closed = *open;
                let roughness = self.accum.rms();
                let shocks = self.accum.shocks;
                let samples = self.accum.count;
                self.accum.reset();
                self.open_window_ms = Some(current);
                Some(self.build(eval, node_id, closed, self.window_ms, roughness, shocks, samples.max(1)))
            }
        }
    }

    /// Session stop: emit the partially-filled window if enough samples
    /// accumulated to be worth keeping.
    pub fn force_flush(&mut self, eval: &Evaluation, node_id: &str) -> Option<AggregateRecord> {
        if self.mode != BucketMode::Windowed {
            return None;
        }
        let open = self.open_window_ms?;
        if self.accum.count <= self.flush_min_samples {
            return None;
        }
        let roughness = self.accum.rms();
        let shocks = self.accum.shocks;
        let samples = self.accum.count;
        self.accum.reset();
        self.open_window_ms = None;
        Some(self.build(eval, node_id, open, self.window_ms, roughness, shocks, samples))
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        eval: &Evaluation,
        node_id: &str,
        bucket_start_ms: i64,
        width_ms: i64,
        roughness: Option<f64>,
        shocks: u32,
        sample_count: u32,
    ) -> AggregateRecord {
        let s = &eval.scoring;
        let c = &eval.classification;
        AggregateRecord {
            node_id: node_id.to_string(),
            bucket_start: iso_utc_seconds(bucket_start_ms),
            bucket_seconds: (width_ms / 1000) as u32,
            grid_key: grid_key(eval.latitude, eval.longitude, self.grid_cell_meters),
            direction: direction_bin(eval.heading_deg).to_string(),
            speed_band: speed_band(eval.speed_mps).to_string(),
            road_roughness: roughness.map(round4),
            shock_events: shocks,
            confidence: round4(s.confidence),
            sample_count,
            lat: eval.latitude.filter(|v| v.is_finite()),
            lon: eval.longitude.filter(|v| v.is_finite()),
            analyzable: u8::from(s.analyzable),
            points_eligible: u8::from(s.points_eligible),
            quality_note: s.quality_note.as_str().to_string(),
            mount_state: c.mount_state.as_str().to_string(),
            moving: u8::from(c.moving),
            speed_mps: eval.speed_mps.filter(|v| v.is_finite() && *v >= 0.0),
            heading_deg: eval.heading_deg.filter(|v| v.is_finite() && (0.0..360.0).contains(v)),
            motion_g: round4(eval.motion_level),
            motion_rms: round4(eval.motion_jitter),
            device_posture: c.posture.as_str().to_string(),
        }
    }
}

fn to_ms(secs: f64) -> i64 {
    (secs * 1000.0).floor() as i64
}
