//! Exposure tracker: per-region accumulation of time above the pressure
//! threshold.
//!
//! # Accumulation policy
//!
//! - Pressure at or above the threshold accumulates elapsed frame time,
//!   clamped at the configured cap.
//! - Pressure below the threshold starts a relief spell. Until the spell
//!   has lasted the relief-confirmation duration, a dip during ongoing
//!   exposure is treated as clinically insignificant and exposure keeps
//!   accumulating; this is what makes fast oscillation around the
//!   threshold behave as continuous loading. Once confirmed, exposure
//!   decays at the relief rate, floored at zero. A region with zero
//!   accumulation is idle, not dipping, and stays at zero.
//! - An inter-frame delta beyond the maximum gap is a sensor dropout.
//!   Exposure is frozen across it: not accumulated (sustained pressure
//!   cannot be assumed during data loss) and not reset (genuine sustained
//!   pressure must not be hidden). Any pending relief spell restarts,
//!   since the gap says nothing about continuous relief either.

use chrono::{DateTime, Utc};

use crate::config::ExposureConfig;

/// Mutable accumulation state for one patient/region pair.
///
/// Owned exclusively by that patient's engine state bundle and mutated
/// only through [`ExposureState::advance`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureState {
    /// Accumulated time above threshold, seconds, `0 ..= cap`.
    accumulated_secs: f64,
    /// Timestamp of the last processed frame; `None` before the first.
    last_update: Option<DateTime<Utc>>,
    /// Aggregated pressure seen in the last frame, mmHg.
    current_pressure: f64,
    /// Start of the current continuous sub-threshold spell.
    below_since: Option<DateTime<Utc>>,
}

impl ExposureState {
    pub fn new() -> Self {
        Self {
            accumulated_secs: 0.0,
            last_update: None,
            current_pressure: 0.0,
            below_since: None,
        }
    }

    pub fn accumulated_secs(&self) -> f64 {
        self.accumulated_secs
    }

    pub fn current_pressure(&self) -> f64 {
        self.current_pressure
    }

    /// Advance the state with one region reading. Returns `true` when the
    /// elapsed time since the previous frame exceeded the configured
    /// maximum gap (sensor dropout).
    ///
    /// The engine guarantees `at` is not before the previous update.
    pub fn advance(&mut self, pressure: f64, at: DateTime<Utc>, cfg: &ExposureConfig) -> bool {
        let elapsed = match self.last_update {
            Some(prev) => (at - prev).num_milliseconds() as f64 / 1000.0,
            None => 0.0,
        };

        self.current_pressure = pressure;
        self.last_update = Some(at);

        if elapsed > cfg.max_gap_secs {
            // Dropout: freeze accumulation, restart any relief spell.
            self.below_since = None;
            return true;
        }

        if pressure >= cfg.pressure_threshold_mmhg {
            self.below_since = None;
            self.accumulate(elapsed, cfg);
        } else {
            let spell_start = *self.below_since.get_or_insert(at);
            let spell_secs = (at - spell_start).num_milliseconds() as f64 / 1000.0;
            if spell_secs >= cfg.relief_confirmation_secs {
                // Confirmed relief: decay toward zero, never instantly.
                self.accumulated_secs =
                    (self.accumulated_secs - cfg.relief_rate * elapsed).max(0.0);
            } else if self.accumulated_secs > 0.0 {
                // Unconfirmed dip mid-exposure: still counts as exposure.
                // A region with nothing accumulated is just idle, not
                // dipping, and stays at zero.
                self.accumulate(elapsed, cfg);
            }
        }

        false
    }

    fn accumulate(&mut self, elapsed: f64, cfg: &ExposureConfig) {
        self.accumulated_secs =
            (self.accumulated_secs + elapsed).min(cfg.max_accumulation_secs);
    }
}

impl Default for ExposureState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cfg() -> ExposureConfig {
        ExposureConfig {
            pressure_threshold_mmhg: 32.0,
            relief_confirmation_secs: 60.0,
            relief_rate: 2.0,
            max_gap_secs: 30.0,
            max_accumulation_secs: 500.0,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn first_frame_establishes_baseline_without_accumulating() {
        let mut state = ExposureState::new();
        let gap = state.advance(40.0, t0(), &cfg());
        assert!(!gap);
        assert_eq!(state.accumulated_secs(), 0.0);
        assert_eq!(state.current_pressure(), 40.0);
    }

    #[test]
    fn sustained_pressure_accumulates_elapsed_time() {
        let mut state = ExposureState::new();
        let start = t0();
        for i in 0..=10 {
            state.advance(40.0, start + Duration::seconds(i), &cfg());
        }
        assert_eq!(state.accumulated_secs(), 10.0);
    }

    #[test]
    fn accumulation_saturates_at_cap() {
        let mut state = ExposureState::new();
        let start = t0();
        for i in 0..=60 {
            state.advance(40.0, start + Duration::seconds(i * 10), &cfg());
        }
        assert_eq!(state.accumulated_secs(), 500.0);
    }

    #[test]
    fn unconfirmed_dip_keeps_accumulating() {
        let mut state = ExposureState::new();
        let start = t0();
        for i in 0..=5 {
            state.advance(40.0, start + Duration::seconds(i), &cfg());
        }
        // 20 s below threshold, shorter than the 60 s confirmation
        for i in 6..=25 {
            state.advance(20.0, start + Duration::seconds(i), &cfg());
        }
        assert_eq!(state.accumulated_secs(), 25.0);
    }

    #[test]
    fn idle_region_never_accumulates() {
        let mut state = ExposureState::new();
        let start = t0();
        for i in 0..=300 {
            state.advance(5.0, start + Duration::seconds(i), &cfg());
        }
        assert_eq!(state.accumulated_secs(), 0.0);
    }

    #[test]
    fn confirmed_relief_decays_but_never_resets() {
        let mut state = ExposureState::new();
        let start = t0();
        // 100 s of loading
        for i in 0..=100 {
            state.advance(40.0, start + Duration::seconds(i), &cfg());
        }
        assert_eq!(state.accumulated_secs(), 100.0);

        // Relief begins at t=101; confirmation completes at t=161
        let mut previous = state.accumulated_secs();
        let mut saw_decay = false;
        for i in 101..=260 {
            state.advance(10.0, start + Duration::seconds(i), &cfg());
            let now = state.accumulated_secs();
            if i > 161 && previous > 0.0 {
                assert!(now < previous, "expected strict decay at t={i}");
                saw_decay = true;
            }
            previous = now;
        }
        assert!(saw_decay);
        assert_eq!(state.accumulated_secs(), 0.0);
    }

    #[test]
    fn decay_floors_at_zero() {
        let mut state = ExposureState::new();
        let start = t0();
        for i in 0..=5 {
            state.advance(40.0, start + Duration::seconds(i), &cfg());
        }
        for i in 6..=600 {
            state.advance(10.0, start + Duration::seconds(i), &cfg());
        }
        assert_eq!(state.accumulated_secs(), 0.0);
    }

    #[test]
    fn dropout_freezes_accumulation_and_flags_gap() {
        let mut state = ExposureState::new();
        let start = t0();
        for i in 0..=100 {
            state.advance(40.0, start + Duration::seconds(i), &cfg());
        }
        let before = state.accumulated_secs();

        // 600 s of silence, well past the 30 s max gap
        let resumed = start + Duration::seconds(700);
        let gap = state.advance(40.0, resumed, &cfg());
        assert!(gap);
        assert_eq!(state.accumulated_secs(), before);

        // Accumulation resumes from the pre-gap value
        state.advance(40.0, resumed + Duration::seconds(1), &cfg());
        assert_eq!(state.accumulated_secs(), before + 1.0);
    }

    #[test]
    fn dropout_restarts_pending_relief_spell() {
        let mut state = ExposureState::new();
        let start = t0();
        for i in 0..=100 {
            state.advance(40.0, start + Duration::seconds(i), &cfg());
        }
        // 50 s of unconfirmed relief
        for i in 101..=150 {
            state.advance(10.0, start + Duration::seconds(i), &cfg());
        }
        let before = state.accumulated_secs();

        // Gap, then more sub-threshold frames: the spell clock restarts,
        // so decay must not begin until a fresh confirmation elapses.
        let resumed = start + Duration::seconds(300);
        assert!(state.advance(10.0, resumed, &cfg()));
        for i in 1..=59 {
            state.advance(10.0, resumed + Duration::seconds(i), &cfg());
        }
        assert!(state.accumulated_secs() >= before);
    }

    #[test]
    fn oscillation_faster_than_confirmation_behaves_as_continuous_load() {
        let mut state = ExposureState::new();
        let start = t0();
        state.advance(40.0, start, &cfg());
        for i in 1..=300 {
            let pressure = if i % 2 == 0 { 40.0 } else { 30.0 };
            state.advance(pressure, start + Duration::seconds(i), &cfg());
        }
        // The first dip lands before any exposure exists, so one second
        // is missing; every second after that counts as loaded.
        assert_eq!(state.accumulated_secs(), 299.0);
    }
}
