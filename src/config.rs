//! Run configuration.
//!
//! Defaults reproduce the reference run: unit masses and rods, g = 9.81,
//! released from rest at (2π/5, 3π/4), sampled every 0.04 s up to 30 s.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::integrator::Tolerances;
use crate::params::PhysicalParameters;
use crate::state::State;
use crate::time_grid::TimeGrid;

/// Sampling window: `[t0, t_max)` every `dt` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSpan {
    pub t0: f64,
    pub t_max: f64,
    pub dt: f64,
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self {
            t0: 0.0,
            t_max: 30.0,
            dt: 0.04,
        }
    }
}

impl TimeSpan {
    pub fn grid(&self) -> SimResult<TimeGrid> {
        TimeGrid::new(self.t0, self.t_max, self.dt)
    }
}

/// Which artifacts to write and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    pub frames: bool,
    pub video: bool,
    pub plots: bool,
    pub csv: bool,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Number of past samples drawn as the outer bob's trail.
    pub trail_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("output").join("double_pendulum"),
            frames: true,
            video: true,
            plots: true,
            csv: true,
            frame_width: 800,
            frame_height: 800,
            trail_len: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub params: PhysicalParameters,
    pub initial: State,
    pub time: TimeSpan,
    pub tolerances: Tolerances,
    pub output: OutputConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            params: PhysicalParameters::default(),
            initial: State::new(2.0 * PI / 5.0, 3.0 * PI / 4.0, 0.0, 0.0),
            time: TimeSpan::default(),
            tolerances: Tolerances::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load a JSON config; missing fields fall back to the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("cannot parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("cannot serialize config")
    }

    /// Checks everything the core would reject, without integrating.
    pub fn validate(&self) -> SimResult<()> {
        self.params.validate()?;
        self.tolerances.validate()?;
        if !self.initial.is_finite() {
            return Err(SimError::invalid_parameter(format!(
                "initial state must be finite, got {:?}",
                self.initial
            )));
        }
        if self.output.frame_width < 16 || self.output.frame_height < 16 {
            return Err(SimError::invalid_parameter(format!(
                "frame size {}x{} is too small",
                self.output.frame_width, self.output.frame_height
            )));
        }
        self.time.grid().map(|_| ())
    }
}
