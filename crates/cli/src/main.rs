//! docparity CLI: run a suite through one access path, or verify results.
//!
//! Exit status is 0 whenever the run or verification completes, even if tests
//! failed, and 1 on any fatal configuration, serialization or I/O error.

mod commands;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::ArgMatches;
use docparity_core::{Mode, TestSuite};
use docparity_runner::{run_suite, HarnessConfig, ModeConfig, CONFIG_FILE_NAME};
use docparity_verifier::{
    render_markdown, summary_lines, Aggregator, RunManifest, VerifierConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::build_cli;

fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    let outcome = match matches.subcommand() {
        Some(("run", m)) => run_command(m),
        Some(("verify", m)) => verify_command(m),
        Some(("init", m)) => init_command(m),
        _ => Ok(()),
    };
    if let Err(e) = outcome {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn harness_config(m: &ArgMatches) -> Result<HarnessConfig> {
    let mut config = match m.get_one::<String>("config") {
        Some(path) => HarnessConfig::from_file(Path::new(path))?,
        None => HarnessConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?,
    };
    if let Some(name) = m.get_one::<String>("implementation") {
        config.implementation = name.clone();
    }
    if let Some(listen) = m.get_one::<String>("listen") {
        config.wire.listen = listen.clone();
    }
    Ok(config)
}

fn run_command(m: &ArgMatches) -> Result<()> {
    let harness = harness_config(m)?;
    let mode: Mode = m
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("api")
        .parse()?;
    let suite_path = required_path(m, "suite")?;
    let output = required_path(m, "output")?;
    let store = m
        .get_one::<String>("store")
        .map(String::as_str)
        .unwrap_or(":memory:");

    let suite = TestSuite::load(&suite_path)
        .with_context(|| format!("cannot load suite {}", suite_path.display()))?;

    let mut config = harness.runner_config(mode, store);
    if let (Some(port), ModeConfig::Wire(wire)) = (m.get_one::<u16>("port"), &mut config.mode) {
        *wire = wire.clone().with_port(*port);
    }

    let mut runner = docparity_runner::open(&config)?;
    let results = run_suite(runner.as_mut(), &suite);
    if let Err(e) = runner.close() {
        warn!(target: "docparity::runner", error = %e, "Runner teardown incomplete");
    }

    results
        .write_json(&output)
        .with_context(|| format!("cannot write results to {}", output.display()))?;
    info!(
        target: "docparity::runner",
        output = %output.display(),
        total = results.summary.total,
        passed = results.summary.passed,
        failed = results.summary.failed,
        "Results written"
    );
    Ok(())
}

fn verify_command(m: &ArgMatches) -> Result<()> {
    let manifest = match m.get_many::<String>("run") {
        Some(runs) => {
            let runs: Vec<&String> = runs.collect();
            RunManifest::from_entries(&runs)?
        }
        None => {
            let dir = required_path(m, "results-dir")?;
            RunManifest::scan_dir(&dir)?
        }
    };
    let suite = m
        .get_one::<String>("suite")
        .map(|p| TestSuite::load(p).with_context(|| format!("cannot load suite {}", p)))
        .transpose()?;

    let report = Aggregator::new(VerifierConfig { manifest, suite }).run();

    let json_path = required_path(m, "output-json")?;
    report.write_json(&json_path)?;
    info!(target: "docparity::verifier", path = %json_path.display(), "JSON report written");

    if let Some(md) = m.get_one::<String>("output-md") {
        let md_path = PathBuf::from(md);
        docparity_verifier::write_markdown(&report, &md_path)?;
        info!(target: "docparity::verifier", path = %md_path.display(), "Markdown report written");
    } else {
        tracing::debug!(target: "docparity::verifier", "\n{}", render_markdown(&report));
    }

    for line in summary_lines(&report) {
        println!("{}", line);
    }
    Ok(())
}

fn init_command(m: &ArgMatches) -> Result<()> {
    let path = required_path(m, "path")?;
    HarnessConfig::write_default_if_missing(&path)?;
    println!("{}", path.display());
    Ok(())
}

fn required_path(m: &ArgMatches, id: &str) -> Result<PathBuf> {
    m.get_one::<String>(id)
        .map(PathBuf::from)
        .with_context(|| format!("--{} is required", id))
}
