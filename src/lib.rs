//! GrapheneTrace: a pressure exposure risk engine for e-textile
//! pressure-mapping sensors.
//!
//! # Overview
//!
//! GrapheneTrace ingests a continuous stream of spatial pressure frames
//! per patient, tracks sustained high-pressure exposure per body region
//! over time, computes a bounded risk score with hysteresis, and emits
//! repositioning alerts with correct timing, without false-negative gaps
//! or alert storms.
//!
//! Each frame flows strictly left to right through the pipeline:
//!
//! ```text
//! region mapper → exposure tracker → risk scorer → alert state machine
//! ```
//!
//! The surrounding application (UI, persistence, notification delivery,
//! sensor acquisition) is out of scope: frames come in through
//! [`engine::RiskEngine::ingest`] (or the concurrent
//! [`supervisor::EngineSupervisor`]), and confirmed
//! [`model::AlertEvent`]s come out. The engine holds no history beyond
//! current per-patient state.
//!
//! # Modules
//!
//! - [`model`]: frames, readings, scores, alert states and events
//! - [`config`]: validated engine configuration (regions, thresholds, timings)
//! - [`error`]: the engine error taxonomy
//! - [`region`]: grid → per-region readings
//! - [`exposure`]: time-above-threshold accumulation with relief debounce
//! - [`risk`]: saturating risk curve
//! - [`alert`]: hysteresis state machine
//! - [`engine`]: the synchronous per-patient orchestrator
//! - [`supervisor`]: one concurrent processing lane per patient

pub mod alert;
pub mod config;
pub mod engine;
pub mod error;
pub mod exposure;
pub mod model;
pub mod region;
pub mod risk;
pub mod supervisor;
