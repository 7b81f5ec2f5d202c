//! # stagewise command-line entry point
//!
//! Housekeeping for filesystem-coupled pipelines:
//!
//! ```bash
//! stagewise inspect ./work
//! stagewise clear ./work --keep-inputs
//! stagewise layout ./layout.json
//! stagewise logs
//! ```
//!
//! Set `RUST_LOG=debug` for detailed logs; files go to the directory reported
//! by `stagewise::logging::get_log_dir`.

#![expect(clippy::print_stdout)] // The CLI reports on stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    stagewise::logging::init()?;

    let cli = cli::Cli::parse();
    cli::run_command(cli.command)
}
