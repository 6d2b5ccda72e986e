//! CLI command definitions for dashboard-settings
//!
//! Defines the CLI structure using clap's derive macros. The entry point is
//! the `Cli` struct; with no subcommand the binary runs `check`.

use crate::config::{DEFAULT_ENV_PREFIX, InitOptions};
use crate::format::OutputFormat;
use crate::paths::TempKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default prefix for `temp` allocations.
pub const DEFAULT_TEMP_PREFIX: &str = "report-";

/// Dashboard settings and path inspection tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Dot-env file to read (default: $APP_ENV_FILE or ./.env)
    #[arg(long, value_name = "FILE", global = true)]
    pub env_file: Option<PathBuf>,

    /// Environment variable prefix
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_ENV_PREFIX, global = true)]
    pub env_prefix: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Pipeline options for the real process environment.
    pub fn init_options(&self) -> InitOptions {
        let options = InitOptions::default().with_prefix(self.env_prefix.clone());
        match self.env_file {
            Some(ref path) => options.with_env_file(path.clone()),
            None => options,
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Check)
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate configuration and report every problem (default)
    Check,

    /// Print the effective settings with secrets redacted
    Show,

    /// List every setting with its variable, type and default
    Schema,

    /// Print the absolute path of each logical location
    Paths(PathsArgs),

    /// Allocate a scoped temporary entry, print it, then remove it
    Temp(TempArgs),
}

impl Command {
    /// Whether the command may create directories or files.
    pub fn writes_files(&self) -> bool {
        match self {
            Command::Paths(args) => args.create,
            Command::Temp(_) => true,
            Command::Check | Command::Show | Command::Schema => false,
        }
    }
}

/// Arguments for the paths subcommand
#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct PathsArgs {
    /// Logical names to show (default: all)
    ///
    /// Available: report_output_dir, cache_dir, temp_workspace, data_dir, logs_dir
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,

    /// Create missing directories instead of only computing paths
    #[arg(long)]
    pub create: bool,
}

/// Arguments for the temp subcommand
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TempArgs {
    /// Name prefix for the allocation
    #[arg(long, default_value = DEFAULT_TEMP_PREFIX)]
    pub prefix: String,

    /// Allocate a file instead of a directory
    #[arg(long)]
    pub file: bool,
}

impl TempArgs {
    pub fn kind(&self) -> TempKind {
        if self.file { TempKind::File } else { TempKind::Dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_check() {
        let cli = Cli::try_parse_from(["dashboard-settings"]).unwrap();
        assert_eq!(cli.command(), Command::Check);
        assert_eq!(cli.env_prefix, "APP_");
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dashboard-settings",
            "paths",
            "--create",
            "cache_dir",
            "--format",
            "json",
            "--env-file",
            "prod.env",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command() {
            Command::Paths(args) => {
                assert!(args.create);
                assert_eq!(args.names, vec!["cache_dir".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
        let options = cli.init_options();
        assert_eq!(options.env_file, Some(PathBuf::from("prod.env")));
    }

    #[test]
    fn test_temp_args() {
        let cli = Cli::try_parse_from(["dashboard-settings", "temp", "--file"]).unwrap();
        match cli.command() {
            Command::Temp(args) => {
                assert_eq!(args.prefix, DEFAULT_TEMP_PREFIX);
                assert_eq!(args.kind(), TempKind::File);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_env_prefix_and_temp_prefix_are_separate() {
        let cli = Cli::try_parse_from(["dashboard-settings", "temp", "--prefix", "job-"]).unwrap();
        assert_eq!(cli.env_prefix, "APP_");
        match cli.command() {
            Command::Temp(args) => assert_eq!(args.prefix, "job-"),
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from([
            "dashboard-settings",
            "--env-prefix",
            "DASH_",
            "temp",
            "--prefix",
            "x-",
        ])
        .unwrap();
        assert_eq!(cli.env_prefix, "DASH_");
        assert_eq!(cli.init_options().prefix, "DASH_");
        match cli.command() {
            Command::Temp(args) => assert_eq!(args.prefix, "x-"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_only_creating_commands_write_files() {
        let parse = |args: &[&str]| {
            let mut argv = vec!["dashboard-settings"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap().command()
        };
        assert!(!parse(&[]).writes_files());
        assert!(!parse(&["show"]).writes_files());
        assert!(!parse(&["paths"]).writes_files());
        assert!(parse(&["paths", "--create"]).writes_files());
        assert!(parse(&["temp"]).writes_files());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["dashboard-settings", "--format", "xml"]).is_err());
    }
}
