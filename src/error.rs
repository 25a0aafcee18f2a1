//! Error taxonomy for the risk engine.
//!
//! The split matters clinically: configuration problems are fatal at setup
//! and never surface per frame, while per-frame rejections are recoverable
//! and always leave the previous valid patient state untouched. One
//! patient's malformed data can never affect another patient's processing.
//!
//! Note that a sensor gap is deliberately NOT an error here. A gap is a
//! non-fatal condition reported alongside a successful ingest (see
//! [`crate::model::IngestReport`]), because the engine still has a correct
//! answer for the frame that ended the gap.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{GridDimensions, PatientId};

/// Everything that can go wrong at the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed region/grid/threshold configuration. Fatal at setup,
    /// never returned for an individual frame.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A frame's grid payload is internally inconsistent (wrong cell
    /// count, negative or non-finite readings).
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The frame's grid resolution differs from the patient's configured
    /// sensor layout. Frames are rejected rather than silently resized.
    #[error("frame resolution {got} does not match configured layout {expected}")]
    ResolutionMismatch {
        expected: GridDimensions,
        got: GridDimensions,
    },

    /// The frame's timestamp precedes the patient's last processed
    /// timestamp. The caller decides whether to drop or reorder; the
    /// engine never silently reorders.
    #[error("frame for patient '{patient}' at {frame_ts} precedes last processed timestamp {last_ts}")]
    OutOfOrderFrame {
        patient: PatientId,
        frame_ts: DateTime<Utc>,
        last_ts: DateTime<Utc>,
    },

    /// Frame or query for a patient that was never admitted, or was
    /// discharged.
    #[error("unknown patient '{0}'")]
    UnknownPatient(PatientId),

    /// Attempt to admit a patient that already has a live state bundle.
    #[error("patient '{0}' is already admitted")]
    PatientAlreadyAdmitted(PatientId),

    /// The patient's processing lane shut down while a request for it was
    /// still in flight (teardown racing an ingest).
    #[error("processing lane for patient '{0}' is closed")]
    LaneClosed(PatientId),
}
