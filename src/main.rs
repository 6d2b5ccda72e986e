//! Dashboard settings CLI
//!
//! Loads and validates the layered configuration, then inspects it: effective
//! settings, resolved directories, and scoped temporary allocations.

use anyhow::{Context, Result};
use clap::Parser;
use dashboard_settings::cli::{Cli, Command, PathsArgs, TempArgs};
use dashboard_settings::config::{ConfigurationManager, SCHEMA};
use dashboard_settings::error::InitError;
use dashboard_settings::format::{
    OutputFormat, PathRow, format_paths, format_schema, format_settings, format_source_issues,
    format_validation_errors,
};
use dashboard_settings::logging;
use dashboard_settings::paths::{LogicalPath, ResolvedPath};
use serde::Serialize;
use std::process::ExitCode;
use tracing::info;

/// `EX_CONFIG` from sysexits.h.
const EX_CONFIG: u8 = 78;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Needs no configuration, so it works while the configuration is broken.
    if cli.command() == Command::Schema {
        return match format_schema(SCHEMA, &cli.env_prefix, cli.format) {
            Ok(out) => {
                print!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    // Startup logging until settings are known.
    let initialized = {
        let _guard = logging::bootstrap(cli.verbose);
        ConfigurationManager::initialize_with(cli.init_options())
    };

    let manager = match initialized {
        Ok(manager) => manager,
        Err(InitError::Invalid(errors)) => {
            match format_validation_errors(&errors, cli.format) {
                Ok(report) => eprint!("{}", report),
                Err(_) => eprintln!("{}", errors),
            }
            return ExitCode::from(EX_CONFIG);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EX_CONFIG);
        }
    };

    match run(&cli, &manager) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, manager: &ConfigurationManager) -> Result<()> {
    let command = cli.command();
    // Dry runs stay off the disk, log files included.
    let files = command.writes_files().then(|| manager.paths());
    let logs_dir = logging::init(manager.settings(), files, cli.verbose)?;

    match command {
        Command::Check => run_check(manager, cli.format),
        Command::Show => {
            print!("{}", format_settings(manager.settings(), cli.format)?);
            Ok(())
        }
        Command::Schema => Ok(()),
        Command::Paths(args) => run_paths(manager, &args, cli.format, logs_dir),
        Command::Temp(args) => run_temp(manager, &args),
    }
}

#[derive(Serialize)]
struct CheckReport<'a> {
    valid: bool,
    environment: &'static str,
    sources: Vec<String>,
    skipped_lines: &'a [dashboard_settings::error::MalformedLine],
}

fn run_check(manager: &ConfigurationManager, format: OutputFormat) -> Result<()> {
    let settings = manager.settings();
    match format {
        OutputFormat::Text => {
            println!(
                "Configuration OK (environment: {})",
                settings.environment().as_str()
            );
            for source in manager.sources() {
                println!("  source: {}", source);
            }
            print!("{}", format_source_issues(manager.source_issues()));
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let report = CheckReport {
                valid: true,
                environment: settings.environment().as_str(),
                sources: manager.sources().iter().map(|s| s.to_string()).collect(),
                skipped_lines: manager.source_issues(),
            };
            let rendered = if format == OutputFormat::Json {
                serde_json::to_string_pretty(&report)? + "\n"
            } else {
                serde_yaml::to_string(&report)?
            };
            print!("{}", rendered);
        }
    }
    Ok(())
}

fn run_paths(
    manager: &ConfigurationManager,
    args: &PathsArgs,
    format: OutputFormat,
    logs_dir: Option<ResolvedPath>,
) -> Result<()> {
    let logical: Vec<LogicalPath> = if args.names.is_empty() {
        LogicalPath::ALL.to_vec()
    } else {
        args.names
            .iter()
            .map(|name| name.parse::<LogicalPath>())
            .collect::<Result<_, _>>()?
    };

    let paths = manager.paths();
    let mut rows = Vec::with_capacity(logical.len());
    for item in logical {
        let row = if args.create {
            // File logging may already have created the logs directory.
            let resolved = match logs_dir {
                Some(ref logs) if item == LogicalPath::LogsDir => logs.clone(),
                _ => paths
                    .resolve(item)
                    .with_context(|| format!("Failed to resolve {}", item))?,
            };
            PathRow {
                name: item.to_string(),
                path: resolved.path,
                created: Some(resolved.created),
            }
        } else {
            PathRow {
                name: item.to_string(),
                path: paths.locate(item)?,
                created: None,
            }
        };
        rows.push(row);
    }

    print!("{}", format_paths(&rows, format)?);
    Ok(())
}

fn run_temp(manager: &ConfigurationManager, args: &TempArgs) -> Result<()> {
    let paths = manager.paths();
    let allocated = paths.with_temp(&args.prefix, args.kind(), |path| {
        println!("{}", path.display());
        Ok::<_, anyhow::Error>(path.to_path_buf())
    })?;
    info!(path = %allocated.display(), "Temporary entry released");
    Ok(())
}
