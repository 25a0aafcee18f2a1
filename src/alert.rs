//! Alert state machine: risk-score trajectories to alert lifecycle
//! transitions.
//!
//! # Transition rules
//!
//! - `Normal → Warning` once the score has held at or above the warning
//!   threshold for the warning dwell.
//! - `Warning → Critical` once the score has held at or above the
//!   critical threshold for the critical dwell.
//! - `Warning → Clearing` / `Critical → Clearing` when the score drops
//!   below the entry threshold minus the hysteresis margin. Scores inside
//!   the margin band trigger nothing, so a score hovering at a boundary
//!   never flaps.
//! - `Clearing → Normal` once the score has stayed below the warning
//!   threshold minus the margin for the clear confirmation.
//! - Re-escalation out of `Clearing` requires the score to genuinely
//!   rise again, not merely sit where the de-escalation left it: the
//!   critical threshold is always armed (entering `Clearing` meant
//!   dropping below it by the margin), while the warning threshold arms
//!   only once the score has been below the clear band. Re-escalation is
//!   immediate; the interrupted confirmation needs no fresh dwell.
//!
//! A single evaluation may emit several transitions (a large jump still
//! passes through `Warning` on its way to `Critical`, both events emitted
//! in order), but entering `Clearing` always ends the evaluation, so one
//! frame can never bounce out of `Clearing` again. Re-entering the current
//! state emits nothing: repeated frames with unchanged state are silent.
//!
//! All dwell and confirmation timers are anchored to frame timestamps,
//! never the wall clock, so replayed feeds behave identically to live
//! ones. A sensor dropout forgets every running spell: unobserved time
//! never counts toward an escalation dwell or the clear confirmation.

use chrono::{DateTime, Utc};

use crate::config::AlertConfig;
use crate::model::{AlertState, RiskScore};

/// One state change produced by an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AlertState,
    pub to: AlertState,
}

/// Per patient/region state machine. Starts in [`AlertState::Normal`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMachine {
    state: AlertState,
    /// First frame of the current continuous spell at/above the warning
    /// threshold.
    above_warn_since: Option<DateTime<Utc>>,
    /// First frame of the current continuous spell at/above the critical
    /// threshold. Tracked independently of the state so a jump straight
    /// past both thresholds dwells both timers concurrently.
    above_crit_since: Option<DateTime<Utc>>,
    /// First frame of the current continuous spell below the clear band
    /// (warning threshold minus margin).
    below_clear_since: Option<DateTime<Utc>>,
    /// While in `Clearing`: whether the score has visited the clear band,
    /// re-arming the warning threshold for re-escalation.
    warn_rearmed: bool,
}

impl AlertMachine {
    pub fn new() -> Self {
        Self {
            state: AlertState::Normal,
            above_warn_since: None,
            above_crit_since: None,
            below_clear_since: None,
            warn_rearmed: false,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Forget every running spell after a sensor dropout. The unobserved
    /// interval must not count toward any dwell or confirmation; spells
    /// re-anchor at the frame that ended the gap. The alert state itself
    /// is untouched, matching the exposure freeze across the same gap.
    pub fn note_gap(&mut self) {
        self.above_warn_since = None;
        self.above_crit_since = None;
        self.below_clear_since = None;
    }

    /// Evaluate one risk score at one frame timestamp, returning the
    /// transitions it caused, in order. Usually empty.
    pub fn evaluate(
        &mut self,
        score: RiskScore,
        at: DateTime<Utc>,
        cfg: &AlertConfig,
    ) -> Vec<Transition> {
        let s = score.value();
        let clear_band = cfg.warn_threshold - cfg.hysteresis_margin;

        track_spell(&mut self.above_warn_since, s >= cfg.warn_threshold, at);
        track_spell(&mut self.above_crit_since, s >= cfg.critical_threshold, at);
        track_spell(&mut self.below_clear_since, s < clear_band, at);
        if s < clear_band {
            self.warn_rearmed = true;
        }

        let mut transitions = Vec::new();
        loop {
            let next = match self.state {
                AlertState::Normal => {
                    if dwell_met(self.above_warn_since, cfg.warn_dwell_secs, at) {
                        Some(AlertState::Warning)
                    } else {
                        None
                    }
                }
                AlertState::Warning => {
                    if dwell_met(self.above_crit_since, cfg.critical_dwell_secs, at) {
                        Some(AlertState::Critical)
                    } else if s < clear_band {
                        Some(AlertState::Clearing)
                    } else {
                        None
                    }
                }
                AlertState::Critical => {
                    if s < cfg.critical_threshold - cfg.hysteresis_margin {
                        Some(AlertState::Clearing)
                    } else {
                        None
                    }
                }
                AlertState::Clearing => {
                    if s >= cfg.critical_threshold {
                        Some(AlertState::Critical)
                    } else if self.warn_rearmed && s >= cfg.warn_threshold {
                        Some(AlertState::Warning)
                    } else if dwell_met(self.below_clear_since, cfg.clear_confirmation_secs, at) {
                        Some(AlertState::Normal)
                    } else {
                        None
                    }
                }
            };

            match next {
                Some(to) => {
                    transitions.push(Transition {
                        from: self.state,
                        to,
                    });
                    self.state = to;
                    if to == AlertState::Clearing {
                        // Arm re-escalation only for thresholds the score
                        // has genuinely cleared below.
                        self.warn_rearmed = s < clear_band;
                        break;
                    }
                }
                None => break,
            }
        }
        transitions
    }
}

impl Default for AlertMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep a spell anchor alive while its condition holds, clear it otherwise.
fn track_spell(anchor: &mut Option<DateTime<Utc>>, holds: bool, at: DateTime<Utc>) {
    if holds {
        anchor.get_or_insert(at);
    } else {
        *anchor = None;
    }
}

fn dwell_met(anchor: Option<DateTime<Utc>>, dwell_secs: f64, at: DateTime<Utc>) -> bool {
    match anchor {
        Some(since) => (at - since).num_milliseconds() as f64 / 1000.0 >= dwell_secs,
        None => false,
    }
}
