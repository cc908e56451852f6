//! Cross-implementation consistency verification for docparity
//!
//! Loads the results files named by a [`RunManifest`], builds the
//! test × run comparison matrix and produces a [`Report`] with a Markdown and
//! console rendering.

#![warn(clippy::all)]

pub mod aggregate;
pub mod error;
pub mod manifest;
pub mod render;
pub mod report;

pub use aggregate::{run_keys, Aggregator, LoadedRun, VerifierConfig, UNCATEGORIZED};
pub use error::{Result, VerifyError};
pub use manifest::{RunEntry, RunManifest, RESERVED_KEYS};
pub use render::{render_markdown, summary_lines, write_markdown};
pub use report::{Comparison, FailureDetail, Report, ReportSummary, Stats};
