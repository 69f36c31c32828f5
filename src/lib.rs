//! emergence: command-line host for the emergence network library.

pub mod simulate;

pub use simulate::{run, SimulationOptions, SimulationReport};
