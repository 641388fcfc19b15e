//! End-to-end behaviour of the simulation core.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use double_pendulum::{
    cartesian, derivative, integrate, simulate, total_energy, PhysicalParameters, SimError, State,
    TimeGrid, Tolerances,
};
use proptest::prelude::*;

fn reference_initial() -> State {
    State::new(2.0 * PI / 5.0, 3.0 * PI / 4.0, 0.0, 0.0)
}

// =============================================================================
// Reference run
// =============================================================================

#[test]
fn reference_run_has_750_samples_and_exact_start() {
    let params = PhysicalParameters::default();
    let grid = TimeGrid::new(0.0, 30.0, 0.04).unwrap();
    let initial = reference_initial();

    let sim = simulate(&params, &initial, &grid, &Tolerances::default()).unwrap();

    assert_eq!(grid.len(), 750);
    assert_eq!(sim.trajectory.len(), 750);
    assert_eq!(sim.trace.len(), 750);
    assert_eq!(sim.trajectory.states()[0], initial);
    assert!(sim.trajectory.states().iter().all(State::is_finite));
}

#[test]
fn trace_matches_trajectory_sample_by_sample() {
    let params = PhysicalParameters::default().l1(1.3).l2(0.7);
    let grid = TimeGrid::new(0.0, 2.0, 0.1).unwrap();
    let sim = simulate(&params, &reference_initial(), &grid, &Tolerances::default()).unwrap();

    for (s, c) in sim.trajectory.states().iter().zip(sim.trace.points()) {
        assert_eq!(*c, cartesian(s, &params));
        // rods are rigid
        assert_relative_eq!(c.x1.hypot(c.y1), 1.3, epsilon = 1e-12);
        assert_relative_eq!((c.x2 - c.x1).hypot(c.y2 - c.y1), 0.7, epsilon = 1e-12);
    }
}

// =============================================================================
// Physical sanity
// =============================================================================

#[test]
fn energy_stays_bounded_over_first_second() {
    let params = PhysicalParameters::default();
    let grid = TimeGrid::new(0.0, 1.0, 0.04).unwrap();
    let traj = integrate(&params, &reference_initial(), &grid, &Tolerances::default()).unwrap();

    let e0 = total_energy(&traj.states()[0], &params);
    for s in traj.states() {
        let e = total_energy(s, &params);
        assert!(
            ((e - e0) / e0).abs() < 1e-5,
            "energy drifted from {e0} to {e}"
        );
    }
}

#[test]
fn energy_stays_bounded_with_unequal_parameters() {
    let params = PhysicalParameters {
        m1: 2.0,
        m2: 0.5,
        l1: 0.8,
        l2: 1.4,
        g: 9.81,
    };
    let grid = TimeGrid::new(0.0, 1.0, 0.02).unwrap();
    let sim = simulate(
        &params,
        &State::new(1.2, -0.3, 0.5, 2.0),
        &grid,
        &Tolerances::default(),
    )
    .unwrap();
    assert!(sim.max_energy_drift() < 1e-5);
}

#[test]
fn tiny_perturbation_diverges_by_t20() {
    let params = PhysicalParameters::default();
    let grid = TimeGrid::new(0.0, 20.04, 0.04).unwrap();
    let tol = Tolerances::default();

    let base = reference_initial();
    let perturbed = State::new(base.theta1 + 1e-10, base.theta2, base.omega1, base.omega2);

    let a = integrate(&params, &base, &grid, &tol).unwrap();
    let b = integrate(&params, &perturbed, &grid, &tol).unwrap();

    let start = a.states()[0].distance(&b.states()[0]);
    assert!(start < 1e-9);

    let (last_a, last_b) = (a.states().last().unwrap(), b.states().last().unwrap());
    assert_relative_eq!(grid.times()[grid.len() - 1], 20.0, epsilon = 1e-9);
    let separation = last_a.distance(last_b);
    assert!(
        separation > 1e-3,
        "trajectories are only {separation} apart at t = 20"
    );
}

// =============================================================================
// Integration failures
// =============================================================================

#[test]
fn non_finite_derivative_aborts_with_time_and_state() {
    let params = PhysicalParameters::default();
    let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
    // omega1^2 overflows to infinity on the first evaluation
    let initial = State::new(0.3, 0.1, 1e200, 0.0);

    match integrate(&params, &initial, &grid, &Tolerances::default()) {
        Err(SimError::NumericalDivergence { t, state }) => {
            assert_eq!(t, 0.0);
            assert_eq!(state, initial);
        }
        other => panic!("expected NumericalDivergence, got {other:?}"),
    }
}

#[test]
fn step_size_collapse_is_non_convergence() {
    let params = PhysicalParameters::default();
    let grid = TimeGrid::new(0.0, 1.0, 0.1).unwrap();
    let tol = Tolerances {
        rtol: 1e-15,
        atol: 1e-15,
        max_steps_per_output: 1_000_000,
        min_step: 1e-3,
    };

    let err = integrate(&params, &State::new(2.0, 2.5, 0.0, 0.0), &grid, &tol).unwrap_err();
    match err {
        SimError::SolverNonConvergence { reason, .. } => {
            assert!(reason.contains("fell below minimum"), "{reason}");
        }
        other => panic!("expected SolverNonConvergence, got {other:?}"),
    }
}

// =============================================================================
// Input rejection
// =============================================================================

#[test]
fn zero_rod_length_is_rejected() {
    let params = PhysicalParameters::default().l1(0.0);
    let grid = TimeGrid::new(0.0, 30.0, 0.04).unwrap();
    let err = simulate(&params, &reference_initial(), &grid, &Tolerances::default()).unwrap_err();
    assert!(matches!(err, SimError::InvalidParameter(_)));
}

#[test]
fn zero_dt_is_rejected() {
    assert!(matches!(
        TimeGrid::new(0.0, 30.0, 0.0),
        Err(SimError::InvalidParameter(_))
    ));
}

#[test]
fn reversed_time_span_is_rejected() {
    assert!(matches!(
        TimeGrid::new(5.0, 1.0, 0.04),
        Err(SimError::InvalidParameter(_))
    ));
}

// =============================================================================
// Properties of the model
// =============================================================================

fn arb_state() -> impl Strategy<Value = State> {
    (
        -10.0..10.0f64,
        -10.0..10.0f64,
        -20.0..20.0f64,
        -20.0..20.0f64,
    )
        .prop_map(|(a, b, c, d)| State::new(a, b, c, d))
}

fn arb_params() -> impl Strategy<Value = PhysicalParameters> {
    (0.1..10.0f64, 0.1..10.0f64, 0.1..5.0f64, 0.1..5.0f64, 1.0..20.0f64).prop_map(
        |(m1, m2, l1, l2, g)| PhysicalParameters { m1, m2, l1, l2, g },
    )
}

proptest! {
    #[test]
    fn velocity_components_equal_angular_rates(s in arb_state(), p in arb_params(), t in -100.0..100.0f64) {
        let d = derivative(&s, t, &p);
        prop_assert_eq!(d.theta1_dot, s.omega1);
        prop_assert_eq!(d.theta2_dot, s.omega2);
        prop_assert!(d.is_finite());
    }

    #[test]
    fn hanging_configuration_maps_below_pivot(l1 in 0.1..5.0f64, l2 in 0.1..5.0f64) {
        let p = PhysicalParameters::default().l1(l1).l2(l2);
        let c = cartesian(&State::new(0.0, 0.0, 0.0, 0.0), &p);
        prop_assert_eq!(c.x1, 0.0);
        prop_assert_eq!(c.y1, -l1);
        prop_assert_eq!(c.x2, 0.0);
        prop_assert_eq!(c.y2, -(l1 + l2));
    }
}
