//! Seismic Analysis Session Simulator
//!
//! Randomized end-to-end checks of the history session against the
//! in-memory authority.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seis_sim::{run_simulator, SimulatorConfig};
//!
//! let report = run_simulator(SimulatorConfig { steps: 500, ..Default::default() }).await;
//! assert!(report.passed(), "{}", report.generate_text());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod simulator;

// Re-exports
pub use simulator::{
    run_simulator, SimulatedOperation, SimulatorConfig, SimulatorReport, SimulatorStats,
    Violation, SIM_INTERVAL, SIM_INTERVALS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
