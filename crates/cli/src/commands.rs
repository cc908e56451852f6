//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("docparity")
        .about("Dual-mode conformance harness for document store implementations")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug-level logging (RUST_LOG takes precedence)")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(build_run())
        .subcommand(build_verify())
        .subcommand(build_init())
}

// =========================================================================
// Run
// =========================================================================

fn build_run() -> Command {
    Command::new("run")
        .about("Execute a test suite through one access path and write a results file")
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_parser(["api", "wire"])
                .default_value("api")
                .help("Access path: api (in-process) or wire (protocol server)"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .default_value(":memory:")
                .help("Store location: :memory: or a seed snapshot path"),
        )
        .arg(
            Arg::new("suite")
                .long("suite")
                .required(true)
                .help("Path to the suite document"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .required(true)
                .help("Path of the results document to write"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_parser(clap::value_parser!(u16))
                .help("Wire mode: port to listen on (keeps the configured host)"),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .conflicts_with("port")
                .help("Wire mode: full listen address (default: 127.0.0.1:27018)"),
        )
        .arg(
            Arg::new("implementation")
                .long("implementation")
                .help("Implementation name recorded in results (default: rust)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Harness config file (default: ./docparity.toml when present)"),
        )
}

// =========================================================================
// Verify
// =========================================================================

fn build_verify() -> Command {
    Command::new("verify")
        .about("Compare results files and write a consistency report")
        .arg(
            Arg::new("results-dir")
                .long("results-dir")
                .conflicts_with("run")
                .required_unless_present("run")
                .help("Directory scanned for *.json results files"),
        )
        .arg(
            Arg::new("run")
                .long("run")
                .action(ArgAction::Append)
                .help("Results file as key=path or path (repeatable)"),
        )
        .arg(
            Arg::new("output-json")
                .long("output-json")
                .required(true)
                .help("Path of the JSON report"),
        )
        .arg(
            Arg::new("output-md")
                .long("output-md")
                .help("Path of the Markdown report"),
        )
        .arg(
            Arg::new("suite")
                .long("suite")
                .help("Suite document used to group verdicts by category"),
        )
}

// =========================================================================
// Init
// =========================================================================

fn build_init() -> Command {
    Command::new("init")
        .about("Write a default docparity.toml if none exists")
        .arg(
            Arg::new("path")
                .long("path")
                .default_value("docparity.toml")
                .help("Where to write the config file"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tree_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let m = build_cli()
            .try_get_matches_from(["docparity", "run", "--suite", "s.json", "-o", "r.json"])
            .unwrap();
        let (_, run) = m.subcommand().unwrap();
        assert_eq!(run.get_one::<String>("mode").unwrap(), "api");
        assert_eq!(run.get_one::<String>("store").unwrap(), ":memory:");
    }

    #[test]
    fn test_verify_requires_a_source() {
        assert!(build_cli()
            .try_get_matches_from(["docparity", "verify", "--output-json", "r.json"])
            .is_err());
        let m = build_cli()
            .try_get_matches_from([
                "docparity",
                "verify",
                "--run",
                "go_api=a.json",
                "--run",
                "b.json",
                "--output-json",
                "r.json",
            ])
            .unwrap();
        let (_, verify) = m.subcommand().unwrap();
        assert_eq!(verify.get_many::<String>("run").unwrap().count(), 2);
    }

    #[test]
    fn test_bad_mode_rejected() {
        assert!(build_cli()
            .try_get_matches_from(["docparity", "run", "--mode", "grpc", "--suite", "s", "-o", "o"])
            .is_err());
    }
}
