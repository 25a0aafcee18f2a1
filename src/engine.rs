//! The risk engine orchestrator.
//!
//! Owns all per-patient state and drives each incoming frame through the
//! pipeline: region mapper → exposure tracker → risk scorer → alert state
//! machine. [`RiskEngine::ingest`] is the only mutating per-frame entry
//! point; it is a bounded synchronous computation that performs no I/O and
//! never waits; notification and persistence happen downstream of the
//! events it returns.
//!
//! Every rejected frame leaves the previous valid state untouched, and one
//! patient's malformed data never affects another patient's processing.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::alert::AlertMachine;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::exposure::ExposureState;
use crate::model::{
    AlertEvent, IngestReport, PatientId, PressureFrame, RegionSnapshot, SensorGap,
};
use crate::region::map_regions;
use crate::risk;

/// Per-region slice of a patient's state bundle.
#[derive(Debug, Clone)]
struct RegionState {
    exposure: ExposureState,
    alarm: AlertMachine,
}

/// One patient's complete state bundle: region states in
/// region-definition order plus the last processed timestamp.
#[derive(Debug, Clone)]
struct PatientState {
    last_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    regions: Vec<RegionState>,
}

impl PatientState {
    fn new(region_count: usize) -> Self {
        Self {
            last_timestamp: None,
            regions: vec![
                RegionState {
                    exposure: ExposureState::new(),
                    alarm: AlertMachine::new(),
                };
                region_count
            ],
        }
    }
}

/// The pressure exposure risk engine for one sensor layout.
///
/// Frames for the same patient must be fed strictly in timestamp order
/// and never concurrently; `ingest` takes `&mut self` so the type system
/// already rules out concurrent mutation. For parallelism across patients
/// see [`crate::supervisor::EngineSupervisor`].
pub struct RiskEngine {
    config: EngineConfig,
    patients: HashMap<PatientId, PatientState>,
}

impl RiskEngine {
    /// Build an engine from a configuration, validating it first.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            patients: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a fresh state bundle for a patient: every region starts at
    /// zero exposure, `Normal` alert state.
    pub fn admit(&mut self, patient: PatientId) -> Result<(), EngineError> {
        if self.patients.contains_key(&patient) {
            return Err(EngineError::PatientAlreadyAdmitted(patient));
        }
        info!(patient = %patient, regions = self.config.regions.len(), "patient admitted");
        self.patients
            .insert(patient, PatientState::new(self.config.regions.len()));
        Ok(())
    }

    /// Tear down a patient's state bundle. Subsequent frames for the
    /// patient fail with [`EngineError::UnknownPatient`].
    pub fn discharge(&mut self, patient: &PatientId) -> Result<(), EngineError> {
        match self.patients.remove(patient) {
            Some(_) => {
                info!(patient = %patient, "patient discharged");
                Ok(())
            }
            None => Err(EngineError::UnknownPatient(patient.clone())),
        }
    }

    pub fn is_admitted(&self, patient: &PatientId) -> bool {
        self.patients.contains_key(patient)
    }

    /// Process one frame, returning the alert events it caused (in
    /// region-definition order) and any sensor-gap condition.
    ///
    /// Validation happens before any state is touched: unknown patients,
    /// resolution mismatches and out-of-order timestamps are rejected
    /// whole, leaving the bundle exactly as it was. Frames with a
    /// timestamp equal to the last processed one are accepted (elapsed
    /// time zero) and, with unchanged state, emit nothing.
    pub fn ingest(&mut self, frame: &PressureFrame) -> Result<IngestReport, EngineError> {
        let state = self
            .patients
            .get_mut(&frame.patient_id)
            .ok_or_else(|| EngineError::UnknownPatient(frame.patient_id.clone()))?;

        let got = frame.grid.dims();
        if got != self.config.grid {
            warn!(patient = %frame.patient_id, %got, expected = %self.config.grid,
                "rejecting frame with mismatched resolution");
            return Err(EngineError::ResolutionMismatch {
                expected: self.config.grid,
                got,
            });
        }

        let previous_timestamp = state.last_timestamp;
        if let Some(last) = previous_timestamp {
            if frame.timestamp < last {
                warn!(patient = %frame.patient_id, frame_ts = %frame.timestamp, last_ts = %last,
                    "rejecting out-of-order frame");
                return Err(EngineError::OutOfOrderFrame {
                    patient: frame.patient_id.clone(),
                    frame_ts: frame.timestamp,
                    last_ts: last,
                });
            }
        }

        let readings = map_regions(&self.config.regions, self.config.aggregation, &frame.grid);

        let mut events = Vec::new();
        let mut gap_detected = false;
        for (region_state, reading) in state.regions.iter_mut().zip(&readings) {
            let gap = region_state.exposure.advance(
                reading.pressure,
                frame.timestamp,
                &self.config.exposure,
            );
            if gap {
                // Dwell and confirmation clocks restart at the frame that
                // ended the gap, like the relief spell does.
                region_state.alarm.note_gap();
                gap_detected = true;
            }
            let score = risk::score(&region_state.exposure, &self.config.exposure, &self.config.risk);
            for transition in region_state
                .alarm
                .evaluate(score, frame.timestamp, &self.config.alert)
            {
                let event = AlertEvent {
                    patient_id: frame.patient_id.clone(),
                    region: reading.region.clone(),
                    from: transition.from,
                    to: transition.to,
                    timestamp: frame.timestamp,
                    risk_score: score,
                };
                info!(patient = %event.patient_id, region = %event.region,
                    from = ?event.from, to = ?event.to, score = %event.risk_score,
                    "alert transition");
                events.push(event);
            }
        }

        let gap = if gap_detected {
            // A gap implies a previous frame existed; all regions share
            // the same frame clock, so the first region's flag stands for
            // the whole frame.
            previous_timestamp.map(|start| {
                let gap = SensorGap {
                    patient_id: frame.patient_id.clone(),
                    gap_start: start,
                    gap_end: frame.timestamp,
                };
                warn!(patient = %gap.patient_id, start = %gap.gap_start, end = %gap.gap_end,
                    secs = gap.duration_secs(), "sensor gap detected");
                gap
            })
        } else {
            None
        };

        state.last_timestamp = Some(frame.timestamp);
        Ok(IngestReport { events, gap })
    }

    /// Read-only view of a patient's current per-region state, in
    /// region-definition order.
    pub fn snapshot(&self, patient: &PatientId) -> Result<Vec<RegionSnapshot>, EngineError> {
        let state = self
            .patients
            .get(patient)
            .ok_or_else(|| EngineError::UnknownPatient(patient.clone()))?;

        Ok(self
            .config
            .regions
            .iter()
            .zip(&state.regions)
            .map(|(definition, region_state)| RegionSnapshot {
                region: definition.name.clone(),
                current_pressure: region_state.exposure.current_pressure(),
                accumulated_secs: region_state.exposure.accumulated_secs(),
                risk: risk::score(&region_state.exposure, &self.config.exposure, &self.config.risk),
                state: region_state.alarm.state(),
            })
            .collect())
    }
}
