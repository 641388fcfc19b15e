//! Integrated trajectory, Cartesian joint positions and the full run bundle.

use serde::Serialize;
use tracing::info;

use crate::dynamics::total_energy;
use crate::error::SimResult;
use crate::integrator::{integrate, IntegrationStats, Tolerances};
use crate::params::PhysicalParameters;
use crate::state::State;
use crate::time_grid::TimeGrid;

/// One state per grid time, in grid order.
#[derive(Debug, Clone)]
pub struct Trajectory {
    states: Vec<State>,
    stats: IntegrationStats,
}

impl Trajectory {
    pub(crate) fn new(states: Vec<State>, stats: IntegrationStats) -> Self {
        Self { states, stats }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn stats(&self) -> IntegrationStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Option<&State> {
        self.states.first()
    }

    pub fn theta1(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.theta1).collect()
    }

    pub fn theta2(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.theta2).collect()
    }

    pub fn omega1(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.omega1).collect()
    }

    pub fn omega2(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.omega2).collect()
    }

    pub fn energies(&self, params: &PhysicalParameters) -> Vec<f64> {
        self.states.iter().map(|s| total_energy(s, params)).collect()
    }
}

/// Positions of both bobs, pivot at the origin, y pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CartesianPoint {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

pub fn cartesian(s: &State, p: &PhysicalParameters) -> CartesianPoint {
    let x1 = p.l1 * s.theta1.sin();
    let y1 = -p.l1 * s.theta1.cos();
    CartesianPoint {
        x1,
        y1,
        x2: x1 + p.l2 * s.theta2.sin(),
        y2: y1 - p.l2 * s.theta2.cos(),
    }
}

/// Element-wise Cartesian transform of a trajectory.
#[derive(Debug, Clone)]
pub struct CartesianTrace {
    points: Vec<CartesianPoint>,
}

impl CartesianTrace {
    pub fn from_trajectory(trajectory: &Trajectory, params: &PhysicalParameters) -> Self {
        Self {
            points: trajectory
                .states()
                .iter()
                .map(|s| cartesian(s, params))
                .collect(),
        }
    }

    pub fn points(&self) -> &[CartesianPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Everything one run produces, aligned sample for sample.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub params: PhysicalParameters,
    pub grid: TimeGrid,
    pub trajectory: Trajectory,
    pub trace: CartesianTrace,
}

impl Simulation {
    pub fn times(&self) -> &[f64] {
        self.grid.times()
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Largest |E(t) - E(t0)| / |E(t0)| over the run (absolute if E(t0) ~ 0).
    pub fn max_energy_drift(&self) -> f64 {
        let energies = self.trajectory.energies(&self.params);
        let Some(&e0) = energies.first() else {
            return 0.0;
        };
        let scale = if e0.abs() > 1e-12 { e0.abs() } else { 1.0 };
        energies
            .iter()
            .map(|e| (e - e0).abs() / scale)
            .fold(0.0, f64::max)
    }
}

/// Validate, integrate over `grid`, then derive the Cartesian trace.
pub fn simulate(
    params: &PhysicalParameters,
    initial: &State,
    grid: &TimeGrid,
    tol: &Tolerances,
) -> SimResult<Simulation> {
    info!(
        samples = grid.len(),
        t0 = grid.t0(),
        t_max = grid.t_max(),
        dt = grid.dt(),
        "starting simulation"
    );

    let trajectory = integrate(params, initial, grid, tol)?;
    let trace = CartesianTrace::from_trajectory(&trajectory, params);

    debug_assert_eq!(trajectory.len(), grid.len());
    debug_assert_eq!(trace.len(), trajectory.len());

    Ok(Simulation {
        params: *params,
        grid: grid.clone(),
        trajectory,
        trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_cartesian_hanging() {
        let p = PhysicalParameters::default().l1(1.5).l2(0.5);
        let c = cartesian(&State::new(0.0, 0.0, 0.0, 0.0), &p);
        assert_relative_eq!(c.x1, 0.0);
        assert_relative_eq!(c.y1, -1.5);
        assert_relative_eq!(c.x2, 0.0);
        assert_relative_eq!(c.y2, -2.0);
    }

    #[test]
    fn test_cartesian_horizontal_and_inverted() {
        let p = PhysicalParameters::default();
        let c = cartesian(&State::new(PI / 2.0, PI, 0.0, 0.0), &p);
        assert_relative_eq!(c.x1, 1.0);
        assert_relative_eq!(c.y1, 0.0, epsilon = 1e-15);
        assert_relative_eq!(c.x2, 1.0, epsilon = 1e-15);
        assert_relative_eq!(c.y2, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_trace_is_elementwise() {
        let p = PhysicalParameters::default();
        let states = vec![
            State::new(0.1, 0.2, 0.0, 0.0),
            State::new(-0.4, 1.1, 0.0, 0.0),
        ];
        let traj = Trajectory::new(states.clone(), IntegrationStats::default());
        let trace = CartesianTrace::from_trajectory(&traj, &p);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.points()[1], cartesian(&states[1], &p));
    }

    #[test]
    fn test_column_accessors() {
        let traj = Trajectory::new(
            vec![State::new(1.0, 2.0, 3.0, 4.0), State::new(5.0, 6.0, 7.0, 8.0)],
            IntegrationStats::default(),
        );
        assert_eq!(traj.theta1(), vec![1.0, 5.0]);
        assert_eq!(traj.theta2(), vec![2.0, 6.0]);
        assert_eq!(traj.omega1(), vec![3.0, 7.0]);
        assert_eq!(traj.omega2(), vec![4.0, 8.0]);
    }

    #[test]
    fn test_simulate_shapes() {
        let p = PhysicalParameters::default();
        let grid = TimeGrid::new(0.0, 1.0, 0.05).unwrap();
        let initial = State::new(0.5, -0.5, 0.0, 0.0);
        let sim = simulate(&p, &initial, &grid, &Tolerances::default()).unwrap();
        assert_eq!(sim.len(), 20);
        assert_eq!(sim.trajectory.len(), sim.len());
        assert_eq!(sim.trace.len(), sim.len());
        assert_eq!(sim.trajectory.first(), Some(&initial));
        assert!(sim.max_energy_drift() < 1e-6);
    }
}
