//! Engine configuration.
//!
//! Everything the engine needs is an explicit input supplied once per
//! patient session: sensor resolution, region geometry, the pressure
//! threshold, debounce/dwell/hysteresis timings, and the risk-curve
//! parameters. The engine holds no implicit defaults that silently vary
//! by deployment, and clinical constants (thresholds, saturation window)
//! are configuration, not code.
//!
//! A configuration is validated once, at construction of the engine, and
//! shared read-only afterwards. Region geometry never mutates at runtime.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::model::{Cell, GridDimensions, RegionName};

/// How a region's cell readings collapse into one [`crate::model::RegionReading`].
///
/// `Max` is the safety-conservative default: a single hotspot cell
/// triggers risk even when the regional mean is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Max,
    Mean,
}

/// A named anatomical region and the sensor cells it covers.
///
/// Region sets for a sensor layout are fixed at configuration time and
/// shared read-only across every patient using that layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDefinition {
    pub name: RegionName,
    pub cells: Vec<Cell>,
}

/// Exposure-tracking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureConfig {
    /// Clinically significant pressure threshold, mmHg.
    pub pressure_threshold_mmhg: f64,
    /// How long pressure must stay below the threshold before relief is
    /// believed (debounces brief, clinically insignificant repositioning).
    pub relief_confirmation_secs: f64,
    /// Seconds of accumulated exposure drained per second of confirmed
    /// relief.
    pub relief_rate: f64,
    /// Inter-frame delta beyond which the engine declares a sensor
    /// dropout and freezes accumulation across it.
    pub max_gap_secs: f64,
    /// Cap on accumulated exposure, bounding numeric growth
    /// (e.g. 86400 for a 24 h equivalent).
    pub max_accumulation_secs: f64,
}

/// Risk-curve parameters.
///
/// The curve shape and every constant here are deployment decisions; see
/// [`crate::risk`] for the curve itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskCurveConfig {
    /// Accumulated-exposure window at which the score saturates at 100
    /// (e.g. 7200 for the 2 h clinical window).
    pub saturation_secs: f64,
    /// Curve steepness `k` of the saturating exponential; must be > 0.
    pub steepness: f64,
    /// How strongly pressure overshoot above the threshold shortens
    /// time-to-critical (0 disables modulation).
    pub overshoot_gain: f64,
}

/// Alert state-machine thresholds and timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Risk score at which `Normal → Warning` escalation arms.
    pub warn_threshold: f64,
    /// Risk score at which `Warning → Critical` escalation arms.
    pub critical_threshold: f64,
    /// Strictly positive hysteresis margin: exit requires dropping below
    /// the entry threshold minus this margin, so entry and exit levels
    /// never coincide.
    pub hysteresis_margin: f64,
    /// Minimum time the score must hold above `warn_threshold` before
    /// `Warning` is entered.
    pub warn_dwell_secs: f64,
    /// Minimum time the score must hold above `critical_threshold` before
    /// `Critical` is entered.
    pub critical_dwell_secs: f64,
    /// Time the score must stay below `warn_threshold - hysteresis_margin`
    /// for `Clearing` to confirm back to `Normal`.
    pub clear_confirmation_secs: f64,
}

/// Complete configuration for one sensor layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub grid: GridDimensions,
    pub regions: Vec<RegionDefinition>,
    #[serde(default)]
    pub aggregation: Aggregation,
    pub exposure: ExposureConfig,
    pub risk: RiskCurveConfig,
    pub alert: AlertConfig,
}

impl EngineConfig {
    /// Validate the configuration as a whole. Called once by the engine
    /// constructor; any failure here is fatal at setup, never per frame.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.grid.rows == 0 || self.grid.cols == 0 {
            return Err(EngineError::Configuration(format!(
                "grid dimensions must be at least 1x1, got {}",
                self.grid
            )));
        }
        if self.regions.is_empty() {
            return Err(EngineError::Configuration(
                "at least one region must be defined".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for region in &self.regions {
            if !seen.insert(&region.name) {
                return Err(EngineError::Configuration(format!(
                    "duplicate region name '{}'",
                    region.name
                )));
            }
            if region.cells.is_empty() {
                return Err(EngineError::Configuration(format!(
                    "region '{}' covers no cells",
                    region.name
                )));
            }
            for cell in &region.cells {
                if cell.row >= self.grid.rows || cell.col >= self.grid.cols {
                    return Err(EngineError::Configuration(format!(
                        "region '{}' cell ({}, {}) is outside the {} grid",
                        region.name, cell.row, cell.col, self.grid
                    )));
                }
            }
        }

        let e = &self.exposure;
        if e.pressure_threshold_mmhg <= 0.0 {
            return Err(EngineError::Configuration(
                "pressure threshold must be positive".to_string(),
            ));
        }
        if e.relief_confirmation_secs < 0.0
            || e.relief_rate < 0.0
            || e.max_gap_secs <= 0.0
            || e.max_accumulation_secs <= 0.0
        {
            return Err(EngineError::Configuration(
                "exposure durations and rates must be non-negative, with a positive \
                 max gap and accumulation cap"
                    .to_string(),
            ));
        }

        let r = &self.risk;
        if r.saturation_secs <= 0.0 || r.steepness <= 0.0 || r.overshoot_gain < 0.0 {
            return Err(EngineError::Configuration(
                "risk curve requires positive saturation and steepness and a \
                 non-negative overshoot gain"
                    .to_string(),
            ));
        }

        let a = &self.alert;
        if a.hysteresis_margin <= 0.0 {
            return Err(EngineError::Configuration(
                "hysteresis margin must be strictly positive".to_string(),
            ));
        }
        if !(0.0 < a.warn_threshold && a.warn_threshold < a.critical_threshold
            && a.critical_threshold < 100.0)
        {
            return Err(EngineError::Configuration(format!(
                "alert thresholds must satisfy 0 < warn < critical < 100, got \
                 warn={} critical={}",
                a.warn_threshold, a.critical_threshold
            )));
        }
        if a.hysteresis_margin >= a.warn_threshold {
            return Err(EngineError::Configuration(
                "hysteresis margin must be smaller than the warning threshold".to_string(),
            ));
        }
        if a.warn_dwell_secs < 0.0 || a.critical_dwell_secs < 0.0 || a.clear_confirmation_secs < 0.0
        {
            return Err(EngineError::Configuration(
                "alert dwell and confirmation durations must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}
