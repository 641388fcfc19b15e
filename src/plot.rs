// ------------------------------------------------------------
// Angle vs time figure (Plotters)
// ------------------------------------------------------------
//
// Two stacked panels, theta1(t) on top and theta2(t) below, on a dark face.
// Written once as a high-resolution PNG and once as SVG (vector document).

use std::path::Path;

use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::trajectory::Simulation;

const FACE: RGBColor = RGBColor(0x21, 0x29, 0x46);
const GRID: RGBColor = RGBColor(0x2A, 0x34, 0x59);
const THETA1_COLOR: RGBColor = RGBColor(0x08, 0xF7, 0xFE);
const THETA2_COLOR: RGBColor = RGBColor(0xFE, 0x53, 0xBB);

/// Bounds of a series with a small padding; a flat series gets a unit band.
pub fn padded_range(v: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &x in v {
        lo = lo.min(x);
        hi = hi.max(x);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    if (hi - lo).abs() < 1e-12 {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = 0.05 * (hi - lo);
    (lo - pad, hi + pad)
}

fn draw_angle_panels<DB>(root: &DrawingArea<DB, Shift>, sim: &Simulation, scale: u32) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let t = sim.times();
    let (t_lo, t_hi) = match (t.first(), t.last()) {
        (Some(&a), Some(&b)) if b > a => (a, b),
        (Some(&a), _) => (a, a + sim.grid.dt()),
        _ => anyhow::bail!("Plot error: empty simulation."),
    };

    let panels = [
        ("theta1", sim.trajectory.theta1(), THETA1_COLOR),
        ("theta2", sim.trajectory.theta2(), THETA2_COLOR),
    ];
    let areas = root.split_evenly((2, 1));

    for (area, (label, values, color)) in areas.iter().zip(panels.iter()) {
        let (y_lo, y_hi) = padded_range(values);

        let mut chart = ChartBuilder::on(area)
            .margin(10 * scale)
            .x_label_area_size(40 * scale)
            .y_label_area_size(60 * scale)
            .build_cartesian_2d(t_lo..t_hi, y_lo..y_hi)?;

        chart.plotting_area().fill(&FACE)?;

        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .y_desc("theta (rad)")
            .axis_desc_style(("sans-serif", 16 * scale))
            .label_style(("sans-serif", 12 * scale))
            .x_labels(10)
            .y_labels(8)
            .x_label_formatter(&|v| format!("{:.1}", v))
            .y_label_formatter(&|v| format!("{:.1}", v))
            .bold_line_style(GRID.stroke_width(scale))
            .light_line_style(GRID.mix(0.5).stroke_width(scale.max(2) / 2))
            .draw()?;

        let stroke = color.stroke_width(2 * scale);
        chart
            .draw_series(LineSeries::new(
                t.iter().copied().zip(values.iter().copied()),
                stroke,
            ))?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], stroke));

        chart
            .configure_series_labels()
            .label_font(("sans-serif", 12 * scale).into_font().color(&WHITE))
            .background_style(FACE.mix(0.8))
            .border_style(GRID)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

pub fn save_angle_plot_png(filename: &Path, sim: &Simulation) -> Result<()> {
    // 8.5 x 11 in at 200 DPI
    let root = BitMapBackend::new(filename, (1700, 2200)).into_drawing_area();
    draw_angle_panels(&root, sim, 3)
        .with_context(|| format!("Failed to draw {}", filename.display()))?;
    info!(path = %filename.display(), "saved angle plot");
    Ok(())
}

pub fn save_angle_plot_svg(filename: &Path, sim: &Simulation) -> Result<()> {
    let root = SVGBackend::new(filename, (850, 1100)).into_drawing_area();
    draw_angle_panels(&root, sim, 1)
        .with_context(|| format!("Failed to draw {}", filename.display()))?;
    info!(path = %filename.display(), "saved angle plot");
    Ok(())
}

pub fn save_plots(out_dir: &Path, sim: &Simulation) -> Result<()> {
    save_angle_plot_png(&out_dir.join("angle_vs_time.png"), sim)?;
    save_angle_plot_svg(&out_dir.join("angle_vs_time.svg"), sim)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_range() {
        let (lo, hi) = padded_range(&[0.0, 10.0]);
        assert!((lo + 0.5).abs() < 1e-12);
        assert!((hi - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_padded_range_flat_and_empty() {
        assert_eq!(padded_range(&[2.0, 2.0]), (1.5, 2.5));
        assert_eq!(padded_range(&[]), (-1.0, 1.0));
    }
}
