//! Equations of motion of the double pendulum.
//!
//! Two point masses on massless rods, pivot at the origin, angles measured
//! from the downward vertical. The system is autonomous: the time argument
//! is accepted for the integrator's calling convention and otherwise unused.

use crate::error::{SimError, SimResult};
use crate::params::PhysicalParameters;
use crate::state::{Derivative, State};

// ------------------------------------------------------------
// Lagrangian double-pendulum dynamics
// ------------------------------------------------------------
pub fn derivative(s: &State, _t: f64, p: &PhysicalParameters) -> Derivative {
    let delta = s.theta1 - s.theta2;
    let (sin_d, cos_d) = delta.sin_cos();

    let w1_sq = s.omega1 * s.omega1;
    let w2_sq = s.omega2 * s.omega2;
    let m_sum = p.m1 + p.m2;

    // m1 + m2*sin^2(theta1 - theta2); positive whenever both masses are
    let mass_term = p.m1 + p.m2 * sin_d * sin_d;

    let omega1_dot = (p.m2 * p.g * s.theta2.sin() * cos_d
        - p.m2 * sin_d * (p.l1 * w1_sq * cos_d + p.l2 * w2_sq)
        - m_sum * p.g * s.theta1.sin())
        / (p.l1 * mass_term);

    let omega2_dot = (m_sum * (p.l1 * w1_sq * sin_d - p.g * s.theta2.sin()
        + p.g * s.theta1.sin() * cos_d)
        + p.m2 * p.l2 * w2_sq * sin_d * cos_d)
        / (p.l2 * mass_term);

    Derivative {
        theta1_dot: s.omega1,
        theta2_dot: s.omega2,
        omega1_dot,
        omega2_dot,
    }
}

/// Like [`derivative`], but a NaN or infinite component is an error.
pub fn checked_derivative(s: &State, t: f64, p: &PhysicalParameters) -> SimResult<Derivative> {
    let d = derivative(s, t, p);
    if d.is_finite() {
        Ok(d)
    } else {
        Err(SimError::NumericalDivergence { t, state: *s })
    }
}

// ------------------------------------------------------------
// Mechanical energy (potential datum at the pivot)
// ------------------------------------------------------------
pub fn kinetic_energy(s: &State, p: &PhysicalParameters) -> f64 {
    let v1_sq = p.l1 * p.l1 * s.omega1 * s.omega1;
    let v2_sq = v1_sq
        + p.l2 * p.l2 * s.omega2 * s.omega2
        + 2.0 * p.l1 * p.l2 * s.omega1 * s.omega2 * (s.theta1 - s.theta2).cos();
    0.5 * p.m1 * v1_sq + 0.5 * p.m2 * v2_sq
}

pub fn potential_energy(s: &State, p: &PhysicalParameters) -> f64 {
    let y1 = -p.l1 * s.theta1.cos();
    let y2 = y1 - p.l2 * s.theta2.cos();
    p.g * (p.m1 * y1 + p.m2 * y2)
}

pub fn total_energy(s: &State, p: &PhysicalParameters) -> f64 {
    kinetic_energy(s, p) + potential_energy(s, p)
}
