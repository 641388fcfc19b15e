//! Angular state of the two links and its time derivative.

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------
// State (theta measured from the downward vertical)
// Rendering convention: x = L*sin(theta), y = -L*cos(theta).
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub theta1: f64, // rad
    pub theta2: f64, // rad
    pub omega1: f64, // rad/s
    pub omega2: f64, // rad/s
}

impl State {
    pub const fn new(theta1: f64, theta2: f64, omega1: f64, omega2: f64) -> Self {
        Self {
            theta1,
            theta2,
            omega1,
            omega2,
        }
    }

    /// Vector view used by the integrator: `[theta1, theta2, omega1, omega2]`.
    pub const fn to_array(self) -> [f64; 4] {
        [self.theta1, self.theta2, self.omega1, self.omega2]
    }

    pub const fn from_array(y: [f64; 4]) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Euclidean distance in (theta1, theta2, omega1, omega2) space.
    pub fn distance(&self, other: &State) -> f64 {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

// ------------------------------------------------------------
// ODE derivative
// ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derivative {
    pub theta1_dot: f64,
    pub theta2_dot: f64,
    pub omega1_dot: f64,
    pub omega2_dot: f64,
}

impl Derivative {
    pub const fn to_array(self) -> [f64; 4] {
        [
            self.theta1_dot,
            self.theta2_dot,
            self.omega1_dot,
            self.omega2_dot,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}
