//! Data models for GrapheneTrace.
//!
//! # Safety invariants
//!
//! All types in this module are designed to be **safe by construction**:
//!
//! - A [`PressureGrid`] can only exist with the declared number of cells
//!   and only non-negative, finite readings
//! - A [`RiskScore`] is always within `[0, 100]`
//! - An [`AlertEvent`] is only ever produced by a genuine, confirmed
//!   state-machine transition; it carries the transition, never a guess
//!
//! Frames are immutable once constructed and are discarded after the
//! pipeline has consumed them; the engine retains no frame history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque patient identifier, assigned by the admission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub String);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Name of an anatomical region, e.g. `"sacrum"` or `"left-heel"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionName(pub String);

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Fixed sensor resolution for one patient's e-textile layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub rows: usize,
    pub cols: usize,
}

impl GridDimensions {
    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

impl fmt::Display for GridDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A single sensor cell coordinate, `row` and `col` zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

/// One spatial grid of pressure readings in mmHg, row-major.
///
/// The constructor is the only way to build one, so a `PressureGrid` in
/// hand always has exactly `dims.cell_count()` readings, all finite and
/// non-negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureGrid {
    dims: GridDimensions,
    values: Vec<f64>,
}

impl PressureGrid {
    /// Build a grid, validating the payload against the declared
    /// dimensions.
    pub fn new(dims: GridDimensions, values: Vec<f64>) -> Result<Self, EngineError> {
        if values.len() != dims.cell_count() {
            return Err(EngineError::InvalidFrame(format!(
                "expected {} readings for a {} grid, got {}",
                dims.cell_count(),
                dims,
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(EngineError::InvalidFrame(format!(
                "pressure readings must be finite and non-negative, got {bad}"
            )));
        }
        Ok(Self { dims, values })
    }

    pub fn dims(&self) -> GridDimensions {
        self.dims
    }

    /// Reading at a cell. The cell must be in bounds; region cells are
    /// bounds-checked once at configuration time, so mapper lookups never
    /// go out of range.
    pub fn reading(&self, cell: Cell) -> f64 {
        self.values[cell.row * self.dims.cols + cell.col]
    }
}

/// Immutable data unit: one timestamped pressure grid for one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureFrame {
    pub patient_id: PatientId,
    /// Acquisition timestamp (UTC). Frames for a patient must arrive in
    /// non-decreasing timestamp order.
    pub timestamp: DateTime<Utc>,
    pub grid: PressureGrid,
}

impl PressureFrame {
    pub fn new(patient_id: PatientId, timestamp: DateTime<Utc>, grid: PressureGrid) -> Self {
        Self {
            patient_id,
            timestamp,
            grid,
        }
    }
}

/// Ephemeral per-frame aggregate for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReading {
    pub region: RegionName,
    /// Aggregated pressure over the region's cells, in mmHg.
    pub pressure: f64,
}

/// Bounded risk score in `[0, 100]`.
///
/// Derived from exposure state every frame; never persisted independently.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    /// Construct a score, clamping into `[0, 100]`.
    pub fn clamped(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Alert lifecycle state for one patient/region pair.
///
/// # Lifecycle
///
/// `Normal → Warning → Critical`, and `Warning/Critical → Clearing → Normal`.
/// Escalations are dwell-confirmed; de-escalations pass through `Clearing`
/// with a hysteresis margin, so a score hovering at a boundary never flaps.
/// A direct `Critical → Normal` transition does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// No clinically significant sustained exposure.
    Normal,
    /// Risk score crossed the warning threshold and held through the dwell.
    Warning,
    /// Risk score crossed the critical threshold and held through the dwell.
    Critical,
    /// Score has dropped below the hysteresis band; awaiting confirmation
    /// before returning to `Normal`.
    Clearing,
}

/// A single confirmed state-machine transition, handed to notification
/// collaborators. The engine emits exactly one per transition and retains
/// no history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub patient_id: PatientId,
    pub region: RegionName,
    pub from: AlertState,
    pub to: AlertState,
    pub timestamp: DateTime<Utc>,
    pub risk_score: RiskScore,
}

/// A detected sensor dropout: the interval between the last processed
/// frame and the frame that ended the silence exceeded the configured
/// maximum gap.
///
/// Exposure is frozen across the gap: neither accumulated (sustained
/// pressure cannot be assumed during data loss) nor reset (genuine
/// sustained pressure must not be hidden).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorGap {
    pub patient_id: PatientId,
    pub gap_start: DateTime<Utc>,
    pub gap_end: DateTime<Utc>,
}

impl SensorGap {
    pub fn duration_secs(&self) -> f64 {
        (self.gap_end - self.gap_start).num_milliseconds() as f64 / 1000.0
    }
}

/// Outcome of one successful `ingest` call.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Emitted transitions, in region-definition order.
    pub events: Vec<AlertEvent>,
    /// Present when this frame ended a sensor dropout.
    pub gap: Option<SensorGap>,
}

/// Read-only view of one region's current state, for dashboards and tests.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSnapshot {
    pub region: RegionName,
    pub current_pressure: f64,
    pub accumulated_secs: f64,
    pub risk: RiskScore,
    pub state: AlertState,
}
