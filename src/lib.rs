//! # Double Pendulum
//!
//! Numerical simulation of a planar two-link pendulum under gravity.
//!
//! The core is small and pure:
//!
//! - [`dynamics`]: the equations of motion, state → derivative
//! - [`integrator`]: adaptive Runge-Kutta 5(4) driving the model over a [`TimeGrid`]
//! - [`trajectory`]: the resulting [`Trajectory`], its [`CartesianTrace`], and [`simulate`]
//!
//! Everything else consumes a finished [`Simulation`]: [`plot`] draws the
//! angle-vs-time figure, [`render`] rasterises animation frames, [`export`]
//! writes CSV/JSON.
//!
//! ```
//! use double_pendulum::{simulate, PhysicalParameters, State, TimeGrid, Tolerances};
//!
//! let params = PhysicalParameters::default();
//! let initial = State::new(0.5, 1.0, 0.0, 0.0);
//! let grid = TimeGrid::new(0.0, 1.0, 0.05).unwrap();
//!
//! let sim = simulate(&params, &initial, &grid, &Tolerances::default()).unwrap();
//! assert_eq!(sim.trajectory.len(), grid.len());
//! assert_eq!(sim.trajectory.states()[0], initial);
//! ```

pub mod config;
pub mod dynamics;
pub mod error;
pub mod export;
pub mod integrator;
pub mod params;
pub mod plot;
pub mod render;
pub mod state;
pub mod time_grid;
pub mod trajectory;

pub use config::{OutputConfig, SimConfig, TimeSpan};
pub use dynamics::{checked_derivative, derivative, total_energy};
pub use error::{SimError, SimResult};
pub use integrator::{integrate, IntegrationStats, Tolerances};
pub use params::PhysicalParameters;
pub use state::{Derivative, State};
pub use time_grid::TimeGrid;
pub use trajectory::{cartesian, simulate, CartesianPoint, CartesianTrace, Simulation, Trajectory};
