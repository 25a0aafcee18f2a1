//! Region mapper: collapses a pressure grid into per-region readings.
//!
//! Purely functional; geometry is validated once at configuration time,
//! and frames of the wrong resolution are rejected by the engine before
//! they reach this module.

use crate::config::{Aggregation, RegionDefinition};
use crate::model::{PressureGrid, RegionReading};

/// Map a frame's grid to one reading per configured region, in
/// region-definition order.
///
/// The grid's dimensions must match the layout the regions were validated
/// against; the engine enforces this before calling.
pub fn map_regions(
    regions: &[RegionDefinition],
    aggregation: Aggregation,
    grid: &PressureGrid,
) -> Vec<RegionReading> {
    regions
        .iter()
        .map(|region| RegionReading {
            region: region.name.clone(),
            pressure: aggregate(region, aggregation, grid),
        })
        .collect()
}

fn aggregate(region: &RegionDefinition, aggregation: Aggregation, grid: &PressureGrid) -> f64 {
    match aggregation {
        Aggregation::Max => region
            .cells
            .iter()
            .map(|c| grid.reading(*c))
            .fold(0.0, f64::max),
        Aggregation::Mean => {
            let sum: f64 = region.cells.iter().map(|c| grid.reading(*c)).sum();
            sum / region.cells.len() as f64
        }
    }
}
