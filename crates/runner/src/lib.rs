//! Test execution for docparity
//!
//! A [`Runner`] executes canonical test cases against one exclusively owned
//! store through one access path:
//! - [`ApiRunner`]: direct in-process calls on the `Store`
//! - [`WireRunner`]: round trips through a protocol server and client
//!
//! Test actions are parsed once into an [`Operation`], so both runners apply
//! identical argument rules and produce comparable [`docparity_core::TestResult`]s.

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod operation;
pub mod outcome;
pub mod runner;
pub mod wire;

pub use api::ApiRunner;
pub use config::{HarnessConfig, ModeConfig, RunnerConfig, WireConfig, WireSection, CONFIG_FILE_NAME};
pub use error::{ActionError, HarnessError};
pub use operation::Operation;
pub use outcome::Outcome;
pub use runner::{run_suite, Runner};
pub use wire::WireRunner;

/// Open the runner selected by `config.mode`
pub fn open(config: &RunnerConfig) -> Result<Box<dyn Runner>, HarnessError> {
    Ok(match config.mode {
        ModeConfig::Api => Box::new(ApiRunner::open(config)?),
        ModeConfig::Wire(_) => Box::new(WireRunner::open(config)?),
    })
}
