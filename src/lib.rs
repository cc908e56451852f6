//! docparity - Dual-mode conformance harness for document store implementations
//!
//! docparity executes a canonical, data-driven suite of document-store
//! operations against a store through two access paths, a direct library
//! interface ("api") and a framed wire protocol ("wire"), and then compares the
//! results of many independent runs into a consistency report.
//!
//! # Quick Start
//!
//! ```ignore
//! use docparity::{run_suite, ApiRunner, Mode, RunnerConfig, TestSuite};
//!
//! let suite = TestSuite::load("fixtures/suite.json")?;
//! let mut runner = ApiRunner::open(&RunnerConfig::in_memory(Mode::Api))?;
//! let results = run_suite(&mut runner, &suite);
//! results.write_json("reports/rust_api.json")?;
//! ```
//!
//! # Architecture
//!
//! - `docparity-core`: document values, test cases, results documents
//! - `docparity-engine`: the `Store` boundary and an in-memory reference store
//! - `docparity-wire`: protocol server and client
//! - `docparity-runner`: API and wire runners over a shared operation plan
//! - `docparity-verifier`: cross-run aggregation and reports

pub use docparity_core::*;
pub use docparity_engine::{MemoryStore, SeedSnapshot, Store, StoreError, MEMORY_LOCATION};
pub use docparity_runner::{
    run_suite, ActionError, ApiRunner, HarnessConfig, HarnessError, ModeConfig, Operation,
    Runner, RunnerConfig, WireConfig, WireRunner,
};
pub use docparity_verifier::{
    render_markdown, summary_lines, Aggregator, Report, RunManifest, VerifierConfig, VerifyError,
};
pub use docparity_wire::{ProtocolClient, ProtocolServer, WireError};
