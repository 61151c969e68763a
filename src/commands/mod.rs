//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `site-clone`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic, calling into the `site_clone` library.

pub mod clone;
