//! jobrunner - run a batch of jobs with fail-fast semantics
//!
//! ## Commands
//!
//! - `jobrunner run` - Execute a YAML batch file
//! - `jobrunner completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Run a batch with at most 4 jobs at a time
//! jobrunner run batch.yaml -p 4
//!
//! # Machine-readable report
//! jobrunner run batch.yaml --format json
//!
//! # Generate shell completions
//! jobrunner completions bash > /etc/bash_completion.d/jobrunner
//! ```

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if std::env::var("JOBRUNNER_VERBOSE").is_ok() {
                eprintln!("{:?}", e);
            }
            ExitCode::FAILURE
        }
    }
}
