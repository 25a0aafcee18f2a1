//! GrapheneTrace demo feed.
//!
//! Runs the risk engine against a simulated two-bed ward: one patient
//! lies still on the sacrum (sustained loading), the other is
//! repositioned regularly. Frames carry virtual 1 Hz timestamps but are
//! fed at an accelerated pace, and every alert transition is logged as it
//! is emitted.
//!
//! Configuration is loaded from the JSON file named by
//! `GRAPHENE_CONFIG`, falling back to a built-in demo layout.

use std::env;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use graphene_trace::config::{
    Aggregation, AlertConfig, EngineConfig, ExposureConfig, RegionDefinition, RiskCurveConfig,
};
use graphene_trace::model::{
    AlertEvent, Cell, GridDimensions, PatientId, PressureFrame, PressureGrid,
};
use graphene_trace::supervisor::EngineSupervisor;

/// Virtual seconds of feed to generate per patient.
const FEED_SECONDS: i64 = 3_600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("graphene_trace=info".parse()?))
        .init();

    let config = match env::var("GRAPHENE_CONFIG") {
        Ok(path) => {
            info!(path = %path, "loading configuration");
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        }
        Err(_) => demo_config(),
    };

    let (supervisor, alerts) = EngineSupervisor::new(config.clone(), 256)?;

    let still: PatientId = "bed-01".into();
    let restless: PatientId = "bed-02".into();
    supervisor.admit(still.clone()).await?;
    supervisor.admit(restless.clone()).await?;

    let notifier = tokio::spawn(log_alerts(alerts));

    let start = Utc::now();
    let threshold = config.exposure.pressure_threshold_mmhg;
    for secs in 0..FEED_SECONDS {
        let at = start + Duration::seconds(secs);

        // bed-01 never moves: sacrum pinned well above threshold.
        let frame = ward_frame(&config, still.clone(), at, threshold + 8.0)?;
        if let Err(e) = supervisor.ingest(frame).await {
            warn!(error = %e, "frame rejected");
        }

        // bed-02 is repositioned every 5 virtual minutes, relieving the
        // sacrum long enough for confirmed decay.
        let loaded = (secs / 300) % 2 == 0;
        let pressure = if loaded { threshold + 4.0 } else { threshold - 20.0 };
        let frame = ward_frame(&config, restless.clone(), at, pressure)?;
        if let Err(e) = supervisor.ingest(frame).await {
            warn!(error = %e, "frame rejected");
        }
    }

    for patient in [&still, &restless] {
        for region in supervisor.snapshot(patient).await? {
            info!(patient = %patient, region = %region.region, risk = %region.risk,
                state = ?region.state, accumulated_secs = region.accumulated_secs,
                "final state");
        }
        supervisor.discharge(patient).await?;
    }

    drop(supervisor);
    notifier.await?;
    Ok(())
}

async fn log_alerts(mut alerts: mpsc::Receiver<AlertEvent>) {
    while let Some(event) = alerts.recv().await {
        info!(patient = %event.patient_id, region = %event.region,
            from = ?event.from, to = ?event.to, score = %event.risk_score,
            at = %event.timestamp, "ALERT");
    }
}

/// Build a frame with the sacrum cells at the given pressure and the rest
/// of the mat at a light baseline.
fn ward_frame(
    config: &EngineConfig,
    patient: PatientId,
    at: chrono::DateTime<Utc>,
    sacrum_pressure: f64,
) -> anyhow::Result<PressureFrame> {
    let dims = config.grid;
    let mut values = vec![8.0; dims.cell_count()];
    if let Some(sacrum) = config.regions.iter().find(|r| r.name == "sacrum".into()) {
        for cell in &sacrum.cells {
            values[cell.row * dims.cols + cell.col] = sacrum_pressure;
        }
    }
    let grid = PressureGrid::new(dims, values)?;
    Ok(PressureFrame::new(patient, at, grid))
}

/// Built-in 8x8 demo layout with three regions.
fn demo_config() -> EngineConfig {
    EngineConfig {
        grid: GridDimensions { rows: 8, cols: 8 },
        regions: vec![
            RegionDefinition {
                name: "sacrum".into(),
                cells: vec![
                    Cell { row: 3, col: 3 },
                    Cell { row: 3, col: 4 },
                    Cell { row: 4, col: 3 },
                    Cell { row: 4, col: 4 },
                ],
            },
            RegionDefinition {
                name: "left-heel".into(),
                cells: vec![Cell { row: 7, col: 1 }],
            },
            RegionDefinition {
                name: "right-heel".into(),
                cells: vec![Cell { row: 7, col: 6 }],
            },
        ],
        aggregation: Aggregation::Max,
        exposure: ExposureConfig {
            pressure_threshold_mmhg: 32.0,
            relief_confirmation_secs: 60.0,
            relief_rate: 2.0,
            max_gap_secs: 30.0,
            max_accumulation_secs: 86_400.0,
        },
        risk: RiskCurveConfig {
            saturation_secs: 7_200.0,
            steepness: 5.0,
            overshoot_gain: 2.0,
        },
        alert: AlertConfig {
            warn_threshold: 40.0,
            critical_threshold: 75.0,
            hysteresis_margin: 5.0,
            warn_dwell_secs: 10.0,
            critical_dwell_secs: 10.0,
            clear_confirmation_secs: 30.0,
        },
    }
}
