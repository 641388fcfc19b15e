//! Adaptive time integration of the equations of motion.
//!
//! Embedded Runge-Kutta 5(4) pair of Dormand and Prince with a PI step-size
//! controller. Internal steps are chosen freely between output times but are
//! clamped so that every requested grid point is hit exactly; only states at
//! grid points are returned.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dynamics::checked_derivative;
use crate::error::{SimError, SimResult};
use crate::params::PhysicalParameters;
use crate::state::State;
use crate::time_grid::TimeGrid;
use crate::trajectory::Trajectory;

type Vec4 = [f64; 4];

/// Error control and step budget.
///
/// Defaults match the classic LSODA settings (`rtol = atol = 1.49012e-8`,
/// at most 500 internal steps per output interval).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Relative tolerance on each state component.
    pub rtol: f64,
    /// Absolute tolerance on each state component.
    pub atol: f64,
    /// Internal steps (accepted or rejected) allowed between two output times.
    pub max_steps_per_output: usize,
    /// Smallest step the controller may propose before giving up.
    pub min_step: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            max_steps_per_output: 500,
            min_step: 1e-12,
        }
    }
}

impl Tolerances {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) {
            return Err(SimError::invalid_parameter(format!(
                "rtol must be positive, got {}",
                self.rtol
            )));
        }
        if !(self.atol.is_finite() && self.atol > 0.0) {
            return Err(SimError::invalid_parameter(format!(
                "atol must be positive, got {}",
                self.atol
            )));
        }
        if self.max_steps_per_output == 0 {
            return Err(SimError::invalid_parameter(
                "max_steps_per_output must be at least 1",
            ));
        }
        if !(self.min_step.is_finite() && self.min_step > 0.0) {
            return Err(SimError::invalid_parameter(format!(
                "min_step must be positive, got {}",
                self.min_step
            )));
        }
        Ok(())
    }
}

/// Work counters for one integration call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub fn_evals: usize,
}

// ------------------------------------------------------------
// Dormand-Prince 5(4) tableau
// ------------------------------------------------------------
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const A71: f64 = 35.0 / 384.0;
const A73: f64 = 500.0 / 1113.0;
const A74: f64 = 125.0 / 192.0;
const A75: f64 = -2187.0 / 6784.0;
const A76: f64 = 11.0 / 84.0;

// Difference between the 5th and embedded 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

// ------------------------------------------------------------
// PI step-size controller
// ------------------------------------------------------------
//
// Works on the error already normalised by the tolerances, so a step is
// accepted when err <= 1:
//   h_new = h * safety * err^(-alpha) * err_prev^(beta)
#[derive(Debug, Clone)]
struct PiController {
    alpha: f64,
    beta: f64,
    safety: f64,
    min_factor: f64,
    max_factor: f64,
    prev_error: f64,
}

impl PiController {
    fn new() -> Self {
        let beta = 0.04;
        Self {
            alpha: 0.2 - 0.75 * beta,
            beta,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
            prev_error: 1e-4,
        }
    }

    /// Returns (step scale factor, accept step).
    fn adjust(&mut self, error: f64) -> (f64, bool) {
        if error <= 1.0 {
            let err = error.max(1e-10);
            let factor = self.safety * err.powf(-self.alpha) * self.prev_error.powf(self.beta);
            self.prev_error = error.max(1e-4);
            (factor.clamp(self.min_factor, self.max_factor), true)
        } else {
            // No growth right after a rejection
            let factor = self.safety * error.powf(-0.2);
            (factor.clamp(self.min_factor, 1.0), false)
        }
    }
}

struct StepResult {
    y: Vec4,
    k_end: Vec4,
    error: f64,
}

struct Stepper<'a> {
    params: &'a PhysicalParameters,
    tol: &'a Tolerances,
    stats: IntegrationStats,
}

impl<'a> Stepper<'a> {
    fn eval(&mut self, t: f64, y: &Vec4) -> SimResult<Vec4> {
        self.stats.fn_evals += 1;
        Ok(checked_derivative(&State::from_array(*y), t, self.params)?.to_array())
    }

    fn error_norm(&self, err: &Vec4, y0: &Vec4, y1: &Vec4) -> f64 {
        let sum: f64 = (0..4)
            .map(|i| {
                let scale = self.tol.atol + self.tol.rtol * y0[i].abs().max(y1[i].abs());
                let e = err[i] / scale;
                e * e
            })
            .sum();
        (sum / 4.0).sqrt()
    }

    // Starting step from the local derivative scale (Hairer, Norsett & Wanner).
    fn initial_step(&mut self, t: f64, y: &Vec4, f0: &Vec4, span: f64) -> SimResult<f64> {
        let d0 = self.error_norm(y, y, y);
        let d1 = self.error_norm(f0, y, y);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        let h0 = h0.min(span);

        let y1 = axpy(y, h0, f0);
        let f1 = self.eval(t + h0, &y1)?;
        let df = [f1[0] - f0[0], f1[1] - f0[1], f1[2] - f0[2], f1[3] - f0[3]];
        let d2 = self.error_norm(&df, y, y) / h0;

        let h1 = if d1.max(d2) <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };
        Ok((100.0 * h0).min(h1).min(span))
    }

    fn step(&mut self, t: f64, y: &Vec4, k1: &Vec4, h: f64) -> SimResult<StepResult> {
        let k2 = self.eval(t + C2 * h, &combine(y, h, &[(A21, k1)]))?;
        let k3 = self.eval(t + C3 * h, &combine(y, h, &[(A31, k1), (A32, &k2)]))?;
        let k4 = self.eval(
            t + C4 * h,
            &combine(y, h, &[(A41, k1), (A42, &k2), (A43, &k3)]),
        )?;
        let k5 = self.eval(
            t + C5 * h,
            &combine(y, h, &[(A51, k1), (A52, &k2), (A53, &k3), (A54, &k4)]),
        )?;
        let k6 = self.eval(
            t + h,
            &combine(
                y,
                h,
                &[(A61, k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)],
            ),
        )?;
        let y_new = combine(
            y,
            h,
            &[(A71, k1), (A73, &k3), (A74, &k4), (A75, &k5), (A76, &k6)],
        );
        let k7 = self.eval(t + h, &y_new)?;

        let zero = [0.0; 4];
        let err = combine(
            &zero,
            h,
            &[(E1, k1), (E3, &k3), (E4, &k4), (E5, &k5), (E6, &k6), (E7, &k7)],
        );

        Ok(StepResult {
            y: y_new,
            k_end: k7,
            error: self.error_norm(&err, y, &y_new),
        })
    }
}

fn axpy(y: &Vec4, h: f64, k: &Vec4) -> Vec4 {
    [y[0] + h * k[0], y[1] + h * k[1], y[2] + h * k[2], y[3] + h * k[3]]
}

// y + h * sum(a_i * k_i)
fn combine(y: &Vec4, h: f64, terms: &[(f64, &Vec4)]) -> Vec4 {
    let mut out = *y;
    for (a, k) in terms {
        for i in 0..4 {
            out[i] += h * a * k[i];
        }
    }
    out
}

/// Integrate from `initial` over every time in `grid`.
///
/// The first returned state is `initial` itself (bit-for-bit). Fails with
/// [`SimError::InvalidParameter`] before doing any work if the inputs are
/// invalid, with [`SimError::NumericalDivergence`] if the model yields a
/// non-finite derivative, and with [`SimError::SolverNonConvergence`] if the
/// step budget or minimum step is exhausted.
pub fn integrate(
    params: &PhysicalParameters,
    initial: &State,
    grid: &TimeGrid,
    tol: &Tolerances,
) -> SimResult<Trajectory> {
    params.validate()?;
    tol.validate()?;
    if !initial.is_finite() {
        return Err(SimError::invalid_parameter(format!(
            "initial state must be finite, got {initial:?}"
        )));
    }

    let times = grid.times();
    let mut states = Vec::with_capacity(times.len());
    states.push(*initial);

    let mut stepper = Stepper {
        params,
        tol,
        stats: IntegrationStats::default(),
    };
    let mut controller = PiController::new();

    let mut t = times[0];
    let mut y = initial.to_array();
    let mut k1 = stepper.eval(t, &y)?;
    let mut h = stepper.initial_step(t, &y, &k1, grid.dt())?;

    for &t_out in &times[1..] {
        let mut steps = 0usize;

        while t < t_out {
            if steps >= tol.max_steps_per_output {
                warn!(t, t_out, steps, "step budget exhausted");
                return Err(SimError::non_convergence(
                    t,
                    format!(
                        "more than {} internal steps before reaching t = {t_out}",
                        tol.max_steps_per_output
                    ),
                ));
            }

            let remaining = t_out - t;
            let clamped = h >= remaining;
            let h_try = if clamped { remaining } else { h };

            let result = stepper.step(t, &y, &k1, h_try)?;
            steps += 1;

            let (factor, accept) = controller.adjust(result.error);
            if accept {
                stepper.stats.accepted_steps += 1;
                // Land exactly on the output time
                t = if clamped { t_out } else { t + h_try };
                y = result.y;
                k1 = result.k_end;
                h = if clamped {
                    h * factor.min(1.0)
                } else {
                    h_try * factor
                };
            } else {
                stepper.stats.rejected_steps += 1;
                h = h_try * factor;
            }

            if h < tol.min_step {
                warn!(t, h, "step size underflow");
                return Err(SimError::non_convergence(
                    t,
                    format!("step size {h:e} fell below minimum {:e}", tol.min_step),
                ));
            }
        }

        debug!(t = t_out, steps, h, "reached output time");
        states.push(State::from_array(y));
    }

    let stats = stepper.stats;
    info!(
        samples = states.len(),
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        fn_evals = stats.fn_evals,
        "integration complete"
    );

    Ok(Trajectory::new(states, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hanging() -> State {
        State::new(0.0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_default_tolerances_valid() {
        assert!(Tolerances::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_tolerances() {
        let tol = Tolerances {
            rtol: 0.0,
            ..Tolerances::default()
        };
        assert!(tol.validate().is_err());
        let tol = Tolerances {
            max_steps_per_output: 0,
            ..Tolerances::default()
        };
        assert!(tol.validate().is_err());
    }

    #[test]
    fn test_equilibrium_stays_put() {
        let p = PhysicalParameters::default();
        let grid = TimeGrid::new(0.0, 2.0, 0.1).unwrap();
        let traj = integrate(&p, &hanging(), &grid, &Tolerances::default()).unwrap();
        assert_eq!(traj.len(), grid.len());
        for s in traj.states() {
            assert_eq!(s.to_array(), [0.0; 4]);
        }
    }

    #[test]
    fn test_small_oscillation_matches_normal_mode() {
        // Slow normal mode of the equal-mass, equal-length pendulum:
        // theta2 / theta1 = sqrt(2), omega^2 = (2 - sqrt(2)) g / L
        let p = PhysicalParameters::default();
        let amp = 1e-4;
        let initial = State::new(amp, amp * 2f64.sqrt(), 0.0, 0.0);
        let omega = ((2.0 - 2f64.sqrt()) * p.g).sqrt();

        let grid = TimeGrid::new(0.0, 3.0, 0.05).unwrap();
        let traj = integrate(&p, &initial, &grid, &Tolerances::default()).unwrap();

        for (t, s) in grid.times().iter().zip(traj.states()) {
            let expected = amp * (omega * t).cos();
            assert_relative_eq!(s.theta1, expected, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_step_budget_exhaustion() {
        let p = PhysicalParameters::default();
        let tol = Tolerances {
            rtol: 1e-14,
            atol: 1e-14,
            max_steps_per_output: 1,
            ..Tolerances::default()
        };
        let grid = TimeGrid::new(0.0, 10.0, 5.0).unwrap();
        let initial = State::new(2.0, 2.5, 0.0, 0.0);
        let err = integrate(&p, &initial, &grid, &tol).unwrap_err();
        assert!(matches!(err, SimError::SolverNonConvergence { .. }));
    }

    #[test]
    fn test_rejects_non_finite_initial_state() {
        let p = PhysicalParameters::default();
        let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
        let initial = State::new(f64::NAN, 0.0, 0.0, 0.0);
        let err = integrate(&p, &initial, &grid, &Tolerances::default()).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter(_)));
    }

    #[test]
    fn test_stats_are_counted() {
        let p = PhysicalParameters::default();
        let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
        let initial = State::new(1.0, -0.5, 0.0, 0.0);
        let traj = integrate(&p, &initial, &grid, &Tolerances::default()).unwrap();
        let stats = traj.stats();
        assert!(stats.accepted_steps >= grid.len() - 1);
        // 6 stage evaluations per attempted step plus start-up evaluations
        assert!(stats.fn_evals >= 6 * (stats.accepted_steps + stats.rejected_steps));
    }
}
