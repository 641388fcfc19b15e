// ------------------------------------------------------------
// Animation frames of the two-link arm (CPU rasterization)
// ------------------------------------------------------------
//
// Frames are written as frame_000000.png ... into a folder, optionally shown
// in a minifb preview window while they are generated, and optionally encoded
// to MP4 with ffmpeg found on PATH.

use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use minifb::{Key, Window, WindowOptions};
use tracing::{info, warn};

use crate::trajectory::Simulation;

pub type Img = ImageBuffer<Rgba<u8>, Vec<u8>>;

fn rgba(r: u8, g: u8, b: u8, a: u8) -> Rgba<u8> {
    Rgba([r, g, b, a])
}

// Linear blend used to fade the trail into the background.
fn mix(a: Rgba<u8>, b: Rgba<u8>, w: f32) -> Rgba<u8> {
    let w = w.clamp(0.0, 1.0);
    let ch = |i: usize| (a[i] as f32 * (1.0 - w) + b[i] as f32 * w).round() as u8;
    rgba(ch(0), ch(1), ch(2), 255)
}

// Draw a thicker line segment by rendering several parallel line segments.
fn draw_thick_line_segment(
    img: &mut Img,
    start: (f32, f32),
    end: (f32, f32),
    thickness_px: i32,
    color: Rgba<u8>,
) {
    let dx = end.0 - start.0;
    let dy = end.1 - start.1;

    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-3 {
        return;
    }

    // Unit normal (perpendicular) direction used for parallel offsets.
    let nx = -dy / len;
    let ny = dx / len;

    let half = thickness_px.max(1) / 2;

    for k in -half..=half {
        let off = k as f32;
        let s = (start.0 + nx * off, start.1 + ny * off);
        let e = (end.0 + nx * off, end.1 + ny * off);
        draw_line_segment_mut(img, s, e, color);
    }
}

// Convert an RGBA image to a minifb buffer (u32 ARGB).
fn to_minifb_buffer(img: &Img) -> Vec<u32> {
    let mut out = vec![0u32; (img.width() * img.height()) as usize];
    for (i, p) in img.pixels().enumerate() {
        let r = p[0] as u32;
        let g = p[1] as u32;
        let b = p[2] as u32;
        out[i] = (255u32 << 24) | (r << 16) | (g << 8) | b;
    }
    out
}

/// Maps world coordinates (metres, y up, pivot at the origin) to pixels.
#[derive(Debug, Clone, Copy)]
pub struct FrameRenderer {
    pub width: u32,
    pub height: u32,
    pub trail_len: usize,
    pixels_per_meter: f32,
    origin: (f32, f32),
    half_extent: f64,
}

impl FrameRenderer {
    /// The visible box spans ±`reach` in both axes, like the fixed
    /// `±(L1 + L2)` limits of the reference animation.
    pub fn new(width: u32, height: u32, reach: f64, trail_len: usize) -> Self {
        let half_extent = reach * 1.05;
        let side = width.min(height) as f32;
        Self {
            width,
            height,
            trail_len,
            pixels_per_meter: 0.5 * side / half_extent as f32,
            origin: (width as f32 * 0.5, height as f32 * 0.5),
            half_extent,
        }
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        (
            self.origin.0 + x as f32 * self.pixels_per_meter,
            self.origin.1 - y as f32 * self.pixels_per_meter,
        )
    }

    /// Draw sample `index` of `sim`.
    pub fn render(&self, sim: &Simulation, index: usize) -> Img {
        let (w, h) = (self.width, self.height);

        // Colors
        let bg = rgba(20, 24, 38, 255);
        let grid_color = rgba(42, 52, 89, 255);
        let rod_color = rgba(230, 230, 230, 255);
        let bob1_color = rgba(40, 140, 255, 255);
        let bob2_color = rgba(255, 220, 60, 255);
        let trail_color = rgba(254, 83, 187, 255);
        let pivot_color = rgba(170, 170, 170, 255);
        let bar_color = rgba(60, 255, 120, 255);

        let mut img: Img = ImageBuffer::from_pixel(w, h, bg);

        // Grid every 0.5 m inside the visible box
        let steps = (self.half_extent / 0.5).floor() as i32;
        for k in -steps..=steps {
            let v = k as f64 * 0.5;
            let (gx, _) = self.to_pixel(v, 0.0);
            let (_, gy) = self.to_pixel(0.0, v);
            draw_line_segment_mut(&mut img, (gx, 0.0), (gx, h as f32), grid_color);
            draw_line_segment_mut(&mut img, (0.0, gy), (w as f32, gy), grid_color);
        }

        let points = sim.trace.points();
        let Some(p) = points.get(index) else {
            return img;
        };

        // Fading trail of the outer bob, oldest first
        let start = index.saturating_sub(self.trail_len);
        let span = (index - start).max(1) as f32;
        for k in start..index {
            let a = self.to_pixel(points[k].x2, points[k].y2);
            let b = self.to_pixel(points[k + 1].x2, points[k + 1].y2);
            let age = (index - k) as f32 / span;
            draw_thick_line_segment(&mut img, a, b, 3, mix(trail_color, bg, age));
        }

        let pivot = self.to_pixel(0.0, 0.0);
        let joint = self.to_pixel(p.x1, p.y1);
        let tip = self.to_pixel(p.x2, p.y2);

        // Rods: pivot -> bob 1 -> bob 2 ('o-' style)
        draw_thick_line_segment(&mut img, pivot, joint, 5, rod_color);
        draw_thick_line_segment(&mut img, joint, tip, 5, rod_color);

        let bob_r = (0.06 * self.pixels_per_meter).round().max(3.0) as i32;
        let round = |q: (f32, f32)| (q.0.round() as i32, q.1.round() as i32);
        draw_filled_circle_mut(&mut img, round(pivot), bob_r / 2, pivot_color);
        draw_filled_circle_mut(&mut img, round(joint), bob_r, bob1_color);
        draw_filled_circle_mut(&mut img, round(tip), bob_r, bob2_color);

        // Elapsed-time bar along the top edge
        let progress = if sim.len() > 1 {
            index as f32 / (sim.len() - 1) as f32
        } else {
            1.0
        };
        let bar_w = ((w as f32) * progress).round() as u32;
        if bar_w > 0 {
            draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(bar_w, 6), bar_color);
        }

        img
    }
}

/// Remove stale frame images from a previous run.
pub fn clean_frames_dir(frames_dir: &Path) -> Result<()> {
    fs::create_dir_all(frames_dir)
        .with_context(|| format!("Failed to create {}", frames_dir.display()))?;
    for entry in fs::read_dir(frames_dir)? {
        let p = entry?.path();
        if p.is_file() {
            let _ = fs::remove_file(p);
        }
    }
    Ok(())
}

/// Render every sample to `frames_dir`; returns the number of frames written.
pub fn render_frames(
    sim: &Simulation,
    renderer: &FrameRenderer,
    frames_dir: &Path,
    preview: bool,
) -> Result<usize> {
    clean_frames_dir(frames_dir)?;

    let (w, h) = (renderer.width as usize, renderer.height as usize);
    let mut window = if preview {
        let mut win = Window::new("Double Pendulum", w, h, WindowOptions::default())
            .context("Failed to create preview window")?;
        win.set_target_fps(60);
        Some(win)
    } else {
        None
    };

    let total = sim.len();
    let report_every = (total / 10).max(1);

    for frame in 0..total {
        // Closing the preview does not stop frame generation.
        if let Some(win) = window.as_ref() {
            if !win.is_open() || win.is_key_down(Key::Escape) {
                window = None;
            }
        }

        let img = renderer.render(sim, frame);

        let frame_name = frames_dir.join(format!("frame_{:06}.png", frame));
        img.save(&frame_name)
            .with_context(|| format!("Failed to save {}", frame_name.display()))?;

        if let Some(win) = window.as_mut() {
            let buffer = to_minifb_buffer(&img);
            win.update_with_buffer(&buffer, w, h)
                .context("Failed to update preview window")?;
        }

        if frame % report_every == 0 {
            let s = sim.trajectory.states()[frame];
            info!(
                frame,
                total,
                t = sim.times()[frame],
                theta1 = s.theta1,
                theta2 = s.theta2,
                "rendering"
            );
        }
    }

    Ok(total)
}

// ------------------------------------------------------------
// MP4 encoding via ffmpeg
// ------------------------------------------------------------
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg").arg("-version").output().is_ok()
}

/// Frame rate that plays the animation back in real time.
pub fn realtime_fps(dt: f64) -> usize {
    ((1.0 / dt).round() as usize).max(1)
}

pub fn encode_mp4_with_ffmpeg(frames_dir: &Path, fps: usize, out_mp4: &Path) -> Result<bool> {
    if !ffmpeg_available() {
        warn!("ffmpeg not found on PATH; MP4 will not be created");
        return Ok(false);
    }

    info!(fps, "encoding MP4");

    // Pattern used by ffmpeg to read frames.
    let input_pattern = frames_dir.join("frame_%06d.png");

    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-framerate")
        .arg(format!("{}", fps))
        .arg("-i")
        .arg(input_pattern.to_string_lossy().as_ref())
        .arg("-c:v")
        .arg("libx264")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg(out_mp4.to_string_lossy().as_ref())
        .status()
        .context("Failed to run ffmpeg")?;

    if status.success() {
        info!(path = %out_mp4.display(), "MP4 created");
        Ok(true)
    } else {
        warn!(?status, "ffmpeg encoding failed");
        Ok(false)
    }
}
