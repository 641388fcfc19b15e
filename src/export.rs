// ------------------------------------------------------------
// Tabular export of a finished run
// ------------------------------------------------------------

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::SimConfig;
use crate::trajectory::Simulation;

pub const TRAJECTORY_HEADER: [&str; 10] = [
    "t", "theta1", "theta2", "omega1", "omega2", "x1", "y1", "x2", "y2", "energy",
];

pub fn write_csv(filename: &Path, header: &[&str], cols: &[Vec<f64>]) -> Result<()> {
    if cols.is_empty() {
        anyhow::bail!("CSV: no columns.");
    }
    if header.len() != cols.len() {
        anyhow::bail!("CSV: {} headers for {} columns.", header.len(), cols.len());
    }
    let n = cols[0].len();
    for c in cols {
        if c.len() != n {
            anyhow::bail!("CSV: column size mismatch.");
        }
    }

    let mut wtr = csv::Writer::from_path(filename)
        .with_context(|| format!("CSV: cannot open {}", filename.display()))?;

    wtr.write_record(header)?;
    for r in 0..n {
        let row: Vec<String> = cols.iter().map(|c| c[r].to_string()).collect();
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per sample: time, angular state, joint positions, total energy.
pub fn write_trajectory_csv(filename: &Path, sim: &Simulation) -> Result<()> {
    let points = sim.trace.points();
    let cols = vec![
        sim.times().to_vec(),
        sim.trajectory.theta1(),
        sim.trajectory.theta2(),
        sim.trajectory.omega1(),
        sim.trajectory.omega2(),
        points.iter().map(|c| c.x1).collect(),
        points.iter().map(|c| c.y1).collect(),
        points.iter().map(|c| c.x2).collect(),
        points.iter().map(|c| c.y2).collect(),
        sim.trajectory.energies(&sim.params),
    ];
    write_csv(filename, &TRAJECTORY_HEADER, &cols)?;
    info!(path = %filename.display(), rows = sim.len(), "wrote trajectory CSV");
    Ok(())
}

/// Effective configuration of the run, so the output folder is reproducible.
pub fn write_config_json(filename: &Path, config: &SimConfig) -> Result<()> {
    fs::write(filename, config.to_json_pretty()?)
        .with_context(|| format!("cannot write {}", filename.display()))
}
