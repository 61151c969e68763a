//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Following CLI recommendations,
//! errors should tell users what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crate::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Settings file not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::config_not_found(path));
//! ```

use std::path::Path;

/// Generate an error for when the settings file is not found.
///
/// Includes hints about:
/// - Dropping the flag to use the defaults
/// - Using the --config flag
/// - Using the SITE_CLONE_CONFIG environment variable
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Settings file not found: {path}\n\n\
         hint: Omit --config to run with the built-in defaults\n\
         hint: Use --config to specify a different path\n\
         hint: Check the SITE_CLONE_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for when the platform client cannot be run.
///
/// Includes hints about installing and configuring it.
pub fn platform_client_missing(binary: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Platform client not found: {binary}\n\n\
         hint: Install it and make sure '{binary} --version' works\n\
         hint: Set platform_bin in the settings file to its full path"
    )
}

/// Generate an error for a source site that does not exist.
pub fn site_not_found(site: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Source site not found: {site}\n\n\
         hint: Check the spelling of --source-site\n\
         hint: Make sure the logged-in platform user is a member of the site"
    )
}

/// Generate an error for a hook name in the skip list that no hook has.
///
/// Includes the list of known hooks.
pub fn unknown_hook(name: &str, known: &[&str]) -> anyhow::Error {
    // Check for common typos
    let suggestion = find_similar(name, known);
    let did_you_mean = suggestion
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown hook: {name}{did_you_mean}\n\n\
         Known hooks are: {hooks}",
        hooks = known.join(", ")
    )
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}
