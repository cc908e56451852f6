//! Shared test utilities for all integration test suites.
//!
//! Import via `mod common;` from any test's main.rs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use docparity::{
    ApiRunner, Mode, ModeConfig, Runner, RunnerConfig, TestCase, TestSuite, WireConfig, WireRunner,
};
use tempfile::TempDir;

/// Both access paths, for parameterized tests
pub const MODES: [Mode; 2] = [Mode::Api, Mode::Wire];

/// Repository-relative fixture path
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

/// The canonical suite shipped in `fixtures/suite.json`
pub fn fixture_suite() -> TestSuite {
    TestSuite::load(fixture("suite.json")).expect("fixture suite should load")
}

/// Seed snapshot path for the canonical suite
pub fn seed_path() -> PathBuf {
    fixture("base_seed.json")
}

/// Runner configuration for `mode` against `store`, on an ephemeral port in wire mode
pub fn config(mode: Mode, store: impl Into<PathBuf>) -> RunnerConfig {
    let mut config = RunnerConfig::in_memory(mode);
    config.store = store.into();
    if mode == Mode::Wire {
        config.mode = ModeConfig::Wire(WireConfig::ephemeral());
    }
    config
}

/// Open a runner over an empty in-memory store
pub fn empty_runner(mode: Mode) -> Box<dyn Runner> {
    open(config(mode, docparity::MEMORY_LOCATION))
}

/// Open a runner over the fixture seed
pub fn seeded_runner(mode: Mode) -> Box<dyn Runner> {
    open(config(mode, seed_path()))
}

fn open(config: RunnerConfig) -> Box<dyn Runner> {
    match config.mode {
        ModeConfig::Api => Box::new(ApiRunner::open(&config).expect("api runner should open")),
        ModeConfig::Wire(_) => Box::new(WireRunner::open(&config).expect("wire runner should open")),
    }
}

/// Parse a single test case from JSON
pub fn case(json: &str) -> TestCase {
    serde_json::from_str(json).expect("test case JSON should parse")
}

/// Parse a suite from JSON
pub fn suite(json: &str) -> TestSuite {
    TestSuite::from_json_str(json).expect("suite JSON should parse")
}

/// Temporary directory for output files
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("temp dir should be created")
}
