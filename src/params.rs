//! Physical parameters of the two-link pendulum.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Masses, rod lengths and gravity for one simulation run.
///
/// # Example
///
/// ```
/// use double_pendulum::PhysicalParameters;
///
/// let params = PhysicalParameters::default();
/// assert!(params.validate().is_ok());
///
/// let bad = PhysicalParameters::default().l1(0.0);
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalParameters {
    pub m1: f64, // inner bob mass (kg)
    pub m2: f64, // outer bob mass (kg)
    pub l1: f64, // inner rod length (m)
    pub l2: f64, // outer rod length (m)
    pub g: f64,  // gravitational acceleration (m/s^2)
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self {
            m1: 1.0,
            m2: 1.0,
            l1: 1.0,
            l2: 1.0,
            g: 9.81,
        }
    }
}

impl PhysicalParameters {
    #[must_use]
    pub const fn m1(mut self, m1: f64) -> Self {
        self.m1 = m1;
        self
    }

    #[must_use]
    pub const fn m2(mut self, m2: f64) -> Self {
        self.m2 = m2;
        self
    }

    #[must_use]
    pub const fn l1(mut self, l1: f64) -> Self {
        self.l1 = l1;
        self
    }

    #[must_use]
    pub const fn l2(mut self, l2: f64) -> Self {
        self.l2 = l2;
        self
    }

    #[must_use]
    pub const fn g(mut self, g: f64) -> Self {
        self.g = g;
        self
    }

    /// Reach of the fully extended arm, `L1 + L2`.
    pub fn reach(&self) -> f64 {
        self.l1 + self.l2
    }

    /// Every field must be finite and strictly positive.
    pub fn validate(&self) -> SimResult<()> {
        let fields = [
            ("m1", self.m1),
            ("m2", self.m2),
            ("l1", self.l1),
            ("l2", self.l2),
            ("g", self.g),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::invalid_parameter(format!(
                    "{name} must be a finite positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let p = PhysicalParameters::default();
        assert!((p.g - 9.81).abs() < f64::EPSILON);
        assert!((p.reach() - 2.0).abs() < f64::EPSILON);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive() {
        for p in [
            PhysicalParameters::default().m1(0.0),
            PhysicalParameters::default().m2(-1.0),
            PhysicalParameters::default().l1(0.0),
            PhysicalParameters::default().l2(-0.5),
            PhysicalParameters::default().g(0.0),
        ] {
            assert!(matches!(p.validate(), Err(SimError::InvalidParameter(_))));
        }
    }

    #[test]
    fn test_rejects_non_finite() {
        let p = PhysicalParameters::default().l2(f64::NAN);
        assert!(p.validate().is_err());
        let p = PhysicalParameters::default().m1(f64::INFINITY);
        assert!(p.validate().is_err());
    }
}
