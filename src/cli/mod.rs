//! CLI tools for jobrunner
//!
//! A thin wrapper around the library:
//! - `run`: Execute a YAML batch file and report the outcome
//! - `completions`: Generate shell completions

pub mod completions;
pub mod run;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use jobrunner::{Config, init_logging};
use std::path::PathBuf;
use std::process::ExitCode;

/// CLI arguments for jobrunner
#[derive(Parser, Debug)]
#[command(name = "jobrunner")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overridden by JOBRUNNER_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a batch of jobs described in a YAML file
    Run {
        /// Batch file to run
        file: PathBuf,
        /// Maximum number of concurrently running jobs
        #[arg(short, long, allow_negative_numbers = true)]
        parallelism: Option<i64>,
        /// Report format
        #[arg(short, long, value_enum)]
        format: Option<ReportFormatArg>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormatArg {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Parse and execute CLI arguments
pub fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(args.log_level.as_deref().unwrap_or(&config.log_level));

    match args.command {
        Command::Run {
            file,
            parallelism,
            format,
        } => {
            let run_config = run::RunConfig {
                parallelism,
                format: match format {
                    Some(ReportFormatArg::Json) => run::OutputFormat::Json,
                    Some(ReportFormatArg::Text) | None => run::OutputFormat::Text,
                },
            };

            let report = run::run_batch(&file, &run_config, &config)?;
            println!("{}", run::format_report(&report, run_config.format)?);

            if report.succeeded() {
                Ok(ExitCode::SUCCESS)
            } else {
                println!("There was a problem running a job, please verify and run again once fixed.");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{}", completions);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_negative_parallelism() {
        let args = Args::try_parse_from(["jobrunner", "run", "batch.yaml", "-p", "-1"]).unwrap();
        match args.command {
            Command::Run { parallelism, .. } => assert_eq!(parallelism, Some(-1)),
            Command::Completions { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_global_config() {
        let args =
            Args::try_parse_from(["jobrunner", "run", "batch.yaml", "--config", "cfg.yaml"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("cfg.yaml")));
    }
}
