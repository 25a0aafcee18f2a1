//! Risk scorer: exposure state to a bounded score in `[0, 100]`.
//!
//! # Curve
//!
//! A normalized saturating exponential over effective exposure `x`:
//!
//! ```text
//! score(x) = 100 · (1 − e^(−k·x/S)) / (1 − e^(−k))   for x < S
//! score(x) = 100                                      for x ≥ S
//! ```
//!
//! where `S` is the configured clinical saturation window and `k` the
//! steepness. The normalization makes the score reach exactly 100 at the
//! saturation window; the function is continuous and monotonically
//! increasing everywhere and saturates rather than overflowing.
//!
//! Effective exposure is accumulated time scaled by how far the current
//! pressure exceeds the threshold, so higher pressure shortens
//! time-to-critical:
//!
//! ```text
//! x = accumulated · (1 + gain · max(0, (p − threshold) / threshold))
//! ```
//!
//! Deterministic and stateless given its inputs. Curve shape constants
//! are configuration (see [`crate::config::RiskCurveConfig`]), not code.

use crate::config::{ExposureConfig, RiskCurveConfig};
use crate::exposure::ExposureState;
use crate::model::RiskScore;

/// Score one region's current exposure state.
pub fn score(state: &ExposureState, exposure: &ExposureConfig, curve: &RiskCurveConfig) -> RiskScore {
    let overshoot = ((state.current_pressure() - exposure.pressure_threshold_mmhg)
        / exposure.pressure_threshold_mmhg)
        .max(0.0);
    let effective = state.accumulated_secs() * (1.0 + curve.overshoot_gain * overshoot);

    let x = effective / curve.saturation_secs;
    if x >= 1.0 {
        return RiskScore::clamped(100.0);
    }

    let k = curve.steepness;
    let raw = 100.0 * (1.0 - (-k * x).exp()) / (1.0 - (-k).exp());
    RiskScore::clamped(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn exposure_cfg() -> ExposureConfig {
        ExposureConfig {
            pressure_threshold_mmhg: 32.0,
            relief_confirmation_secs: 60.0,
            relief_rate: 1.0,
            max_gap_secs: 30.0,
            max_accumulation_secs: 86_400.0,
        }
    }

    fn curve_cfg() -> RiskCurveConfig {
        RiskCurveConfig {
            saturation_secs: 7_200.0,
            steepness: 5.0,
            overshoot_gain: 2.0,
        }
    }

    /// Build a state with the given accumulated seconds at the given
    /// pressure, by driving `advance` with 1 Hz frames.
    fn loaded_state(secs: i64, pressure: f64) -> ExposureState {
        let mut state = ExposureState::new();
        let start = Utc::now();
        for i in 0..=secs {
            state.advance(pressure, start + Duration::seconds(i), &exposure_cfg());
        }
        state
    }

    #[test]
    fn zero_exposure_scores_zero() {
        let state = ExposureState::new();
        assert_eq!(score(&state, &exposure_cfg(), &curve_cfg()).value(), 0.0);
    }

    #[test]
    fn monotonically_increasing_in_exposure() {
        let mut previous = -1.0;
        for secs in [0, 60, 300, 900, 1_800, 3_600, 7_200] {
            let s = score(&loaded_state(secs, 32.0), &exposure_cfg(), &curve_cfg()).value();
            assert!(s > previous, "score must grow with exposure ({secs}s)");
            previous = s;
        }
    }

    #[test]
    fn saturates_at_exactly_100() {
        // At threshold pressure there is no overshoot, so effective
        // exposure equals accumulated time.
        let s = score(&loaded_state(7_200, 32.0), &exposure_cfg(), &curve_cfg());
        assert_eq!(s.value(), 100.0);
        let beyond = score(&loaded_state(10_000, 32.0), &exposure_cfg(), &curve_cfg());
        assert_eq!(beyond.value(), 100.0);
    }

    #[test]
    fn higher_pressure_scores_higher_for_same_exposure() {
        let at_threshold = score(&loaded_state(600, 32.0), &exposure_cfg(), &curve_cfg());
        let overloaded = score(&loaded_state(600, 48.0), &exposure_cfg(), &curve_cfg());
        assert!(overloaded > at_threshold);
    }

    #[test]
    fn continuous_near_saturation() {
        // No discontinuous jump where the clamp takes over.
        let just_below = score(&loaded_state(7_199, 32.0), &exposure_cfg(), &curve_cfg());
        assert!(100.0 - just_below.value() < 0.1);
    }

    #[test]
    fn sub_threshold_pressure_gets_no_overshoot_bonus() {
        // Same accumulated time, pressure now relieved: no upward
        // modulation below the threshold.
        let mut state = ExposureState::new();
        let start = Utc::now();
        for i in 0..=600 {
            state.advance(48.0, start + Duration::seconds(i), &exposure_cfg());
        }
        state.advance(10.0, start + Duration::seconds(601), &exposure_cfg());

        let relieved = score(&state, &exposure_cfg(), &curve_cfg());
        let still_loaded = score(&loaded_state(601, 48.0), &exposure_cfg(), &curve_cfg());
        assert!(relieved < still_loaded);
    }
}
