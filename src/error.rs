//! # Error Handling
//!
//! This module defines the centralized error type for the `site-clone`
//! library. It uses `thiserror` to build a single `Error` enum covering every
//! failure mode of a clone run, and a `Result<T>` alias used throughout the
//! crate.
//!
//! The variants fall into two groups:
//!
//! - **Fatal**: validation, provisioning, git and code recreation failures.
//!   These propagate with `?` and end the run before the summary is printed.
//! - **Recoverable**: content import and hook failures. These are still
//!   represented as `Error` values, but the content pipeline and hook registry
//!   catch them, log them, and record them in their reports instead of
//!   propagating them.

use thiserror::Error;

/// Main error type for site-clone operations
#[derive(Error, Debug)]
pub enum Error {
    /// A precondition of the clone request does not hold.
    ///
    /// Raised before anything on the platform or on disk is mutated.
    #[error("Validation error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Validation {
        message: String,
        /// Optional hint for how to fix the request
        hint: Option<String>,
    },

    /// The platform has no site with the given name.
    #[error("Site not found: {site}")]
    SiteNotFound { site: String },

    /// The site exists but has no environment with the given name.
    #[error("Environment not found: {site}.{env}")]
    EnvironmentNotFound { site: String, env: String },

    /// Creating the target site failed.
    #[error("Failed to provision site {site}: {message}")]
    Provisioning { site: String, message: String },

    /// A git invocation exited unsuccessfully.
    #[error("Git command failed in {path}: {command} - {stderr}")]
    GitCommand {
        command: String,
        path: String,
        stderr: String,
    },

    /// An external program could not be started at all.
    #[error("Failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    /// A step of the code recreation plan failed.
    #[error("Code recreation failed at '{step}' for {site}: {message}")]
    Recreation {
        site: String,
        step: String,
        message: String,
    },

    /// The source environments do not form a valid promotion chain.
    #[error("Inconsistent topology: {message}")]
    InconsistentTopology { message: String },

    /// A platform client invocation failed or produced unusable output.
    #[error("Platform command failed: {command} - {message}")]
    Platform { command: String, message: String },

    /// Creating or locating a backup failed.
    #[error("Backup error for {site}.{env} ({element}): {message}")]
    Backup {
        site: String,
        env: String,
        element: String,
        message: String,
    },

    /// Importing a backup into the target environment failed.
    #[error("Import of {element} into {site}.{env} failed: {message}")]
    Import {
        site: String,
        env: String,
        element: String,
        message: String,
    },

    /// A transformation hook failed.
    #[error("Hook '{hook}' failed on {env}: {message}")]
    Hook {
        hook: String,
        env: String,
        message: String,
    },

    /// The operation is not implemented for this CMS or version.
    #[error("Unsupported operation: {operation} for {cms}")]
    Unsupported { operation: String, cms: String },

    /// The settings file could not be parsed.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A directory walk error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Shorthand for a `Validation` error without a hint.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            hint: None,
        }
    }

    /// Whether the error was raised by request validation, before any mutation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::SiteNotFound { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
