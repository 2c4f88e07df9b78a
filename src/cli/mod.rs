//! CLI argument parsing module
//!
//! This module handles command-line argument parsing and application entry point.

use crate::config::{Config, ConflictPolicy, HeaderMerge};
use crate::error::{Result, TabJarError};
use crate::exit_code::exit_code_for_error;
use crate::output::OutputWriter;
use crate::utils::FileUtils;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub mod replay;

use replay::{replay, ReplayScript};

/// Main entry point for the CLI application
pub fn run() {
    let matches = create_app().get_matches();

    let verbose = matches
        .subcommand()
        .map(|(_, sub)| sub.get_flag("verbose"))
        .unwrap_or(false);
    crate::logging::init(verbose);

    if let Err(e) = run_with_args(&matches) {
        eprintln!("tabjar: error: {}", e);
        std::process::exit(exit_code_for_error(&e));
    }
}

/// Run tabjar with parsed command line arguments
fn run_with_args(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("replay", sub)) => run_replay(sub),
        _ => Err(TabJarError::Config("No command given".to_string())),
    }
}

fn run_replay(matches: &ArgMatches) -> Result<()> {
    let script_path = matches
        .get_one::<String>("script")
        .ok_or_else(|| TabJarError::Config("Missing script path".to_string()))?;
    let script = ReplayScript::load(&FileUtils::expand_path(script_path)?)?;

    let base = script.config.clone().unwrap_or_default();
    let config = build_config_from_args(matches, base)?;

    let output_path = match matches.get_one::<String>("output") {
        Some(path) => Some(FileUtils::expand_path(path)?),
        None => None,
    };
    let mut output = OutputWriter::new(output_path.as_deref())?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| TabJarError::Config(format!("Failed to create async runtime: {}", e)))?;
    let requests = rt.block_on(replay(script, config, matches.get_flag("send"), &mut output))?;
    output.finish()?;

    log::info!("Replayed {} request(s)", requests);
    Ok(())
}

/// Create the CLI application structure
pub fn create_app() -> Command {
    Command::new("tabjar")
        .version(crate::VERSION)
        .about("Per-tab cookie isolation for browser containers")
        .subcommand_required(true)
        .subcommand(
            Command::new("replay")
                .about("Replay a JSON script of tab and request events")
                .arg(Arg::new("script")
                    .help("Event script (JSON)")
                    .required(true)
                    .index(1))
                .arg(Arg::new("send")
                    .long("send")
                    .help("Send each request over HTTP after filtering")
                    .action(clap::ArgAction::SetTrue))
                .arg(Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("FILE")
                    .help("Write request reports to file"))
                .arg(Arg::new("conflict-policy")
                    .long("conflict-policy")
                    .value_name("overwrite|skip")
                    .env("TABJAR_CONFLICT_POLICY")
                    .help("Existing cookies in a tab's store are overwritten or kept"))
                .arg(Arg::new("header-merge")
                    .long("header-merge")
                    .value_name("replace|append")
                    .env("TABJAR_HEADER_MERGE")
                    .help("How the isolated Cookie header meets an existing one"))
                .arg(Arg::new("group-by-container")
                    .long("group-by-container")
                    .help("Tabs in the same container share a cookie store")
                    .action(clap::ArgAction::SetTrue))
                .arg(Arg::new("lookup-concurrency")
                    .long("lookup-concurrency")
                    .value_name("N")
                    .env("TABJAR_LOOKUP_CONCURRENCY")
                    .help("Maximum concurrent cookie lookups per request"))
                .arg(Arg::new("timeout")
                    .long("timeout")
                    .value_name("SECONDS")
                    .help("Request timeout when sending"))
                .arg(Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Verbose logging")
                    .action(clap::ArgAction::SetTrue)),
        )
}

/// Apply command line overrides on top of `config`
fn build_config_from_args(matches: &ArgMatches, mut config: Config) -> Result<Config> {
    if let Some(policy) = matches.get_one::<String>("conflict-policy") {
        config.conflict_policy = policy.parse::<ConflictPolicy>().map_err(|_| {
            TabJarError::Config(format!("Unknown conflict policy: {}", policy))
        })?;
    }

    if let Some(merge) = matches.get_one::<String>("header-merge") {
        config.header_merge = merge
            .parse::<HeaderMerge>()
            .map_err(|_| TabJarError::Config(format!("Unknown header merge mode: {}", merge)))?;
    }

    if matches.get_flag("group-by-container") {
        config.group_by_container = true;
    }

    if let Some(limit) = matches.get_one::<String>("lookup-concurrency") {
        config.lookup_concurrency = match limit.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(TabJarError::Config(format!(
                    "Invalid lookup concurrency: '{}'",
                    limit
                )))
            }
        };
    }

    if let Some(timeout) = matches.get_one::<String>("timeout") {
        let secs = timeout
            .parse::<u64>()
            .map_err(|_| TabJarError::Config(format!("Invalid timeout: '{}'", timeout)))?;
        config.timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay_matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["tabjar", "replay", "script.json"];
        argv.extend_from_slice(args);
        let matches = create_app().try_get_matches_from(argv).expect("args");
        matches
            .subcommand_matches("replay")
            .cloned()
            .expect("replay subcommand")
    }

    #[test]
    fn flags_override_script_config() {
        let matches = replay_matches(&[
            "--conflict-policy",
            "skip",
            "--header-merge",
            "append",
            "--group-by-container",
            "--lookup-concurrency",
            "3",
        ]);
        let config = build_config_from_args(&matches, Config::default()).expect("config");
        assert_eq!(config.conflict_policy, ConflictPolicy::Skip);
        assert_eq!(config.header_merge, HeaderMerge::Append);
        assert!(config.group_by_container);
        assert_eq!(config.lookup_concurrency, 3);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let matches = replay_matches(&["--lookup-concurrency", "0"]);
        let err = build_config_from_args(&matches, Config::default()).expect_err("invalid");
        assert!(matches!(err, TabJarError::Config(_)));
    }
}
