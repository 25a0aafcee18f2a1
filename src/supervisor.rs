//! Per-patient processing lanes over the synchronous engine.
//!
//! Frames for different patients are fully independent, but frames for
//! the same patient must be processed strictly in order and never
//! concurrently. The supervisor gives every admitted patient its own
//! tokio task (a "lane") owning that patient's engine state; frames are
//! queued onto the lane's channel and processed one at a time, while
//! lanes for different patients run fully in parallel.
//!
//! Teardown is safe to invoke concurrently with an in-flight ingest: a
//! discharge removes the lane's sender and enqueues a shutdown command
//! behind whatever is already queued. The in-flight frame finishes
//! normally; anything that slips in behind the shutdown has its reply
//! channel dropped and surfaces to the caller as
//! [`EngineError::LaneClosed`]. A lane never writes into a state bundle
//! after its shutdown command has been processed.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::RiskEngine;
use crate::error::EngineError;
use crate::model::{AlertEvent, IngestReport, PatientId, PressureFrame, RegionSnapshot};

/// Commands a lane task understands.
enum LaneCommand {
    Frame {
        frame: PressureFrame,
        reply: oneshot::Sender<Result<IngestReport, EngineError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<Vec<RegionSnapshot>, EngineError>>,
    },
    Shutdown,
}

/// Depth of each lane's frame queue. Acquisition delivers one frame per
/// sampling interval, so a small buffer absorbs jitter without letting a
/// stalled consumer hoard memory.
const LANE_QUEUE_DEPTH: usize = 64;

/// Concurrent front door to the engine: one processing lane per patient.
///
/// Alert events from all lanes are forwarded, in per-patient order, onto
/// the outbound channel returned by [`EngineSupervisor::new`]; the
/// notification/persistence collaborators consume them from there.
pub struct EngineSupervisor {
    config: EngineConfig,
    lanes: Mutex<HashMap<PatientId, mpsc::Sender<LaneCommand>>>,
    alert_tx: mpsc::Sender<AlertEvent>,
}

impl EngineSupervisor {
    /// Create a supervisor for one sensor layout, validating the
    /// configuration up front. Returns the supervisor together with the
    /// receiving end of the outbound alert stream.
    pub fn new(
        config: EngineConfig,
        alert_queue_depth: usize,
    ) -> Result<(Self, mpsc::Receiver<AlertEvent>), EngineError> {
        config.validate()?;
        let (alert_tx, alert_rx) = mpsc::channel(alert_queue_depth);
        Ok((
            Self {
                config,
                lanes: Mutex::new(HashMap::new()),
                alert_tx,
            },
            alert_rx,
        ))
    }

    /// Admit a patient: spawn a dedicated lane task owning the patient's
    /// engine state bundle.
    pub async fn admit(&self, patient: PatientId) -> Result<(), EngineError> {
        let mut lanes = self.lanes.lock().await;
        if lanes.contains_key(&patient) {
            return Err(EngineError::PatientAlreadyAdmitted(patient));
        }

        let mut engine = RiskEngine::new(self.config.clone())?;
        engine.admit(patient.clone())?;

        let (tx, rx) = mpsc::channel(LANE_QUEUE_DEPTH);
        tokio::spawn(run_lane(patient.clone(), engine, rx, self.alert_tx.clone()));
        lanes.insert(patient, tx);
        Ok(())
    }

    /// Ingest one frame on the owning patient's lane and wait for its
    /// report. Calls for different patients proceed in parallel; calls
    /// for the same patient are serialized by the lane queue.
    pub async fn ingest(&self, frame: PressureFrame) -> Result<IngestReport, EngineError> {
        let patient = frame.patient_id.clone();
        let tx = {
            let lanes = self.lanes.lock().await;
            lanes
                .get(&patient)
                .cloned()
                .ok_or_else(|| EngineError::UnknownPatient(patient.clone()))?
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(LaneCommand::Frame {
            frame,
            reply: reply_tx,
        })
        .await
        .map_err(|_| EngineError::LaneClosed(patient.clone()))?;

        reply_rx
            .await
            .map_err(|_| EngineError::LaneClosed(patient))?
    }

    /// Current per-region state of one patient.
    pub async fn snapshot(&self, patient: &PatientId) -> Result<Vec<RegionSnapshot>, EngineError> {
        let tx = {
            let lanes = self.lanes.lock().await;
            lanes
                .get(patient)
                .cloned()
                .ok_or_else(|| EngineError::UnknownPatient(patient.clone()))?
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(LaneCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| EngineError::LaneClosed(patient.clone()))?;

        reply_rx
            .await
            .map_err(|_| EngineError::LaneClosed(patient.clone()))?
    }

    /// Discharge a patient: the lane finishes whatever is already queued,
    /// then tears down the state bundle. Frames submitted after this call
    /// fail with [`EngineError::UnknownPatient`].
    pub async fn discharge(&self, patient: &PatientId) -> Result<(), EngineError> {
        let tx = {
            let mut lanes = self.lanes.lock().await;
            lanes
                .remove(patient)
                .ok_or_else(|| EngineError::UnknownPatient(patient.clone()))?
        };

        // Lane may already have exited; either way the sender is gone
        // from the map, which is what makes the discharge stick.
        let _ = tx.send(LaneCommand::Shutdown).await;
        info!(patient = %patient, "patient lane discharged");
        Ok(())
    }

    pub async fn is_admitted(&self, patient: &PatientId) -> bool {
        self.lanes.lock().await.contains_key(patient)
    }
}

/// A lane task: processes its patient's commands strictly in order until
/// shutdown, forwarding alert events to the outbound stream.
async fn run_lane(
    patient: PatientId,
    mut engine: RiskEngine,
    mut rx: mpsc::Receiver<LaneCommand>,
    alert_tx: mpsc::Sender<AlertEvent>,
) {
    debug!(patient = %patient, "lane started");
    while let Some(command) = rx.recv().await {
        match command {
            LaneCommand::Frame { frame, reply } => {
                let result = engine.ingest(&frame);
                if let Ok(report) = &result {
                    for event in &report.events {
                        // A gone consumer only loses forwarding; the
                        // caller still gets the report.
                        let _ = alert_tx.send(event.clone()).await;
                    }
                }
                let _ = reply.send(result);
            }
            LaneCommand::Snapshot { reply } => {
                let _ = reply.send(engine.snapshot(&patient));
            }
            LaneCommand::Shutdown => break,
        }
    }
    // Dropping the receiver cancels anything still queued behind the
    // shutdown; those callers observe LaneClosed.
    debug!(patient = %patient, "lane stopped");
}
