// ------------------------------------------------------------
// Double Pendulum (two point masses on rigid massless rods)
//   - Equations of motion integrated with adaptive RK5(4)
//   - One state per output sample (default 0..30 s every 0.04 s)
//   - Outputs: frames, optional mp4 (ffmpeg), angle plots, CSV log
//
// Output folder (relative to where you run the program):
//   output/double_pendulum/frames/frame_000000.png ... frame_000749.png
//   output/double_pendulum/double_pendulum.mp4   (if ffmpeg in PATH)
//   output/double_pendulum/angle_vs_time.png / .svg
//   output/double_pendulum/trajectory.csv
//   output/double_pendulum/config.json
// ------------------------------------------------------------

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use double_pendulum::export::{write_config_json, write_trajectory_csv};
use double_pendulum::plot::save_plots;
use double_pendulum::render::{encode_mp4_with_ffmpeg, realtime_fps, render_frames, FrameRenderer};
use double_pendulum::{simulate, SimConfig};

/// Simulate a double pendulum and render the result.
#[derive(Parser, Debug)]
#[command(name = "double_pendulum")]
#[command(about = "Double pendulum simulation with animation and angle plots", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inner bob mass (kg)
    #[arg(long)]
    m1: Option<f64>,
    /// Outer bob mass (kg)
    #[arg(long)]
    m2: Option<f64>,
    /// Inner rod length (m)
    #[arg(long)]
    l1: Option<f64>,
    /// Outer rod length (m)
    #[arg(long)]
    l2: Option<f64>,
    /// Gravitational acceleration (m/s^2)
    #[arg(long)]
    g: Option<f64>,

    /// Initial inner angle (rad, from downward vertical)
    #[arg(long, allow_hyphen_values = true)]
    theta1: Option<f64>,
    /// Initial outer angle (rad, from downward vertical)
    #[arg(long, allow_hyphen_values = true)]
    theta2: Option<f64>,
    /// Initial inner angular velocity (rad/s)
    #[arg(long, allow_hyphen_values = true)]
    omega1: Option<f64>,
    /// Initial outer angular velocity (rad/s)
    #[arg(long, allow_hyphen_values = true)]
    omega2: Option<f64>,

    /// Start time (s)
    #[arg(long, allow_hyphen_values = true)]
    t0: Option<f64>,
    /// End time, exclusive (s)
    #[arg(long)]
    t_max: Option<f64>,
    /// Output sample spacing (s)
    #[arg(long)]
    dt: Option<f64>,

    /// Relative tolerance of the integrator
    #[arg(long)]
    rtol: Option<f64>,
    /// Absolute tolerance of the integrator
    #[arg(long)]
    atol: Option<f64>,

    /// Output directory
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Skip animation frames (implies --no-video)
    #[arg(long)]
    no_frames: bool,
    /// Skip MP4 encoding
    #[arg(long)]
    no_video: bool,
    /// Skip angle plots
    #[arg(long)]
    no_plots: bool,
    /// Skip the CSV log
    #[arg(long)]
    no_csv: bool,
    /// Show frames in a window while they are generated
    #[arg(long, conflicts_with = "no_frames")]
    preview: bool,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Cli {
    fn into_config(self) -> Result<SimConfig> {
        let mut cfg = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };

        let p = &mut cfg.params;
        p.m1 = self.m1.unwrap_or(p.m1);
        p.m2 = self.m2.unwrap_or(p.m2);
        p.l1 = self.l1.unwrap_or(p.l1);
        p.l2 = self.l2.unwrap_or(p.l2);
        p.g = self.g.unwrap_or(p.g);

        let s = &mut cfg.initial;
        s.theta1 = self.theta1.unwrap_or(s.theta1);
        s.theta2 = self.theta2.unwrap_or(s.theta2);
        s.omega1 = self.omega1.unwrap_or(s.omega1);
        s.omega2 = self.omega2.unwrap_or(s.omega2);

        let t = &mut cfg.time;
        t.t0 = self.t0.unwrap_or(t.t0);
        t.t_max = self.t_max.unwrap_or(t.t_max);
        t.dt = self.dt.unwrap_or(t.dt);

        let tol = &mut cfg.tolerances;
        tol.rtol = self.rtol.unwrap_or(tol.rtol);
        tol.atol = self.atol.unwrap_or(tol.atol);

        let out = &mut cfg.output;
        if let Some(dir) = self.out_dir {
            out.out_dir = dir;
        }
        out.frames &= !self.no_frames;
        out.video &= out.frames && !self.no_video;
        out.plots &= !self.no_plots;
        out.csv &= !self.no_csv;

        Ok(cfg)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let preview = cli.preview;
    let dump_config = cli.dump_config;
    let cfg = cli.into_config()?;

    if dump_config {
        println!("{}", cfg.to_json_pretty()?);
        return Ok(());
    }

    cfg.validate().context("Invalid configuration")?;

    // ----------------------------
    // Simulation
    // ----------------------------
    let grid = cfg.time.grid()?;
    let sim = simulate(&cfg.params, &cfg.initial, &grid, &cfg.tolerances)
        .context("Integration failed")?;

    let stats = sim.trajectory.stats();
    info!(
        samples = sim.len(),
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        max_energy_drift = sim.max_energy_drift(),
        "simulation finished"
    );

    // ----------------------------
    // Outputs
    // ----------------------------
    let out = &cfg.output;
    fs::create_dir_all(&out.out_dir).context("Failed to create output directories")?;
    write_config_json(&out.out_dir.join("config.json"), &cfg)?;

    if out.csv {
        write_trajectory_csv(&out.out_dir.join("trajectory.csv"), &sim)?;
    }

    if out.plots {
        save_plots(&out.out_dir, &sim)?;
    }

    if out.frames {
        let frames_dir = out.out_dir.join("frames");
        let renderer = FrameRenderer::new(
            out.frame_width,
            out.frame_height,
            cfg.params.reach(),
            out.trail_len,
        );
        let n = render_frames(&sim, &renderer, &frames_dir, preview)?;
        info!(frames = n, dir = %frames_dir.display(), "frames written");

        if out.video {
            let mp4 = out.out_dir.join("double_pendulum.mp4");
            encode_mp4_with_ffmpeg(&frames_dir, realtime_fps(grid.dt()), &mp4)?;
        }
    }

    info!(dir = %out.out_dir.display(), "done");
    Ok(())
}
