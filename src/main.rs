//! # Site Clone CLI
//!
//! This is the binary entry point for the `site-clone` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Handling top-level application errors and translating them into user-friendly
//!   output.
//!
//! The clone engine itself lives in the `site_clone` library crate; the binary
//! is a thin wrapper that wires the real platform client, git and settings
//! into it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
