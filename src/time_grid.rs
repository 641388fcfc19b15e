//! Output sampling times.

use crate::error::{SimError, SimResult};

/// Upper bound on the number of requested samples.
pub const MAX_SAMPLES: usize = 10_000_000;

/// Half-open grid `t0, t0 + dt, ...` strictly below `t_max`.
///
/// # Example
///
/// ```
/// use double_pendulum::TimeGrid;
///
/// let grid = TimeGrid::new(0.0, 30.0, 0.04).unwrap();
/// assert_eq!(grid.len(), 750);
/// assert_eq!(grid.times()[0], 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    t0: f64,
    t_max: f64,
    dt: f64,
    times: Vec<f64>,
}

impl TimeGrid {
    pub fn new(t0: f64, t_max: f64, dt: f64) -> SimResult<Self> {
        if !t0.is_finite() || !t_max.is_finite() || !dt.is_finite() {
            return Err(SimError::invalid_parameter(format!(
                "time grid bounds must be finite, got t0={t0}, t_max={t_max}, dt={dt}"
            )));
        }
        if dt <= 0.0 {
            return Err(SimError::invalid_parameter(format!(
                "dt must be positive, got {dt}"
            )));
        }
        if t_max <= t0 {
            return Err(SimError::invalid_parameter(format!(
                "t_max must exceed t0, got t0={t0}, t_max={t_max}"
            )));
        }

        if t0 + dt <= t0 {
            return Err(SimError::invalid_parameter(format!(
                "dt = {dt} is below the float resolution at t0 = {t0}"
            )));
        }

        let n = sample_count((t_max - t0) / dt);
        if n > MAX_SAMPLES {
            return Err(SimError::invalid_parameter(format!(
                "time grid would hold {n} samples (limit {MAX_SAMPLES})"
            )));
        }

        let times: Vec<f64> = (0..n).map(|i| t0 + i as f64 * dt).collect();
        if let Some(pair) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SimError::invalid_parameter(format!(
                "sample times collide at t = {} with dt = {dt}",
                pair[0]
            )));
        }

        Ok(Self {
            t0,
            t_max,
            dt,
            times,
        })
    }

    pub fn t0(&self) -> f64 {
        self.t0
    }

    pub fn t_max(&self) -> f64 {
        self.t_max
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

// ceil() of the span ratio, except that a ratio within 1e-9 (relative) of an
// integer counts as that integer: 30 / 0.04 must give 750, not 751.
fn sample_count(ratio: f64) -> usize {
    let nearest = ratio.round();
    let n = if (ratio - nearest).abs() <= 1e-9 * nearest.max(1.0) {
        nearest
    } else {
        ratio.ceil()
    };
    (n as usize).max(1)
}
