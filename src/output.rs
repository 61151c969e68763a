//! # Output
//!
//! Terminal colour handling and the end-of-run summary.
//!
//! ## Respecting User Preferences
//!
//! Colour follows the `--color=never|always|auto` flag. In auto mode:
//! - `NO_COLOR` disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors even in non-TTY
//! - `TERM=dumb` disables colors for dumb terminals
//!
//! ## Summary
//!
//! A successful clone prints, per cloned environment, the source and target
//! site URLs, then the target's dashboard link and anything that went wrong
//! along the way (missing backups, failed imports, failed hooks).

use std::env;
use std::fmt::Write as _;

use console::style;
use url::Url;

use crate::error::Result;
use crate::phases::orchestrator::CloneSummary;
use crate::site::Env;

/// Output configuration for controlling colors and markers.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is "always", "never" or "auto"; anything else is auto.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        console::set_colors_enabled(use_color);
        console::set_colors_enabled_stderr(use_color);

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Where environment and dashboard links point.
#[derive(Debug, Clone)]
pub struct UrlScheme {
    /// Domain of environment URLs, e.g. `pantheonsite.io`.
    pub site_domain: String,
    /// Dashboard base URL.
    pub dashboard_url: String,
}

impl UrlScheme {
    /// `https://<env>-<site>.<domain>/`
    pub fn environment_url(&self, site: &str, env: Env) -> Result<Url> {
        Ok(Url::parse(&format!(
            "https://{}-{}.{}",
            env, site, self.site_domain
        ))?)
    }

    /// `<dashboard>/sites/<site-id>`
    pub fn dashboard_url(&self, site_id: &str) -> Result<Url> {
        let base = Url::parse(&self.dashboard_url)?;
        Ok(base.join(&format!("sites/{}", site_id))?)
    }
}

/// Renders the end-of-run summary.
pub fn render_summary(
    config: &OutputConfig,
    summary: &CloneSummary,
    urls: &UrlScheme,
) -> Result<String> {
    let mut out = String::new();
    let ok = emoji(config, "✅", "[OK]");
    let warn = emoji(config, "⚠️ ", "[WARN]");

    let _ = writeln!(
        out,
        "{} Cloned {} to {}",
        ok,
        style(&summary.source.name).bold(),
        style(&summary.target.name).bold()
    );
    let _ = writeln!(out);

    for env in summary.topology.initialized() {
        let _ = writeln!(out, "  {}", style(env).cyan());
        let _ = writeln!(
            out,
            "    source: {}",
            urls.environment_url(&summary.source.name, env)?
        );
        let _ = writeln!(
            out,
            "    target: {}",
            urls.environment_url(&summary.target.name, env)?
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  dashboard: {}",
        urls.dashboard_url(&summary.target.id)?
    );

    for (env, element) in &summary.backups_created {
        let _ = writeln!(out, "  new backup: {} {}", env, element);
    }
    for failure in &summary.content.failures {
        let _ = writeln!(
            out,
            "{} {} {} was not imported: {}",
            warn,
            failure.env,
            failure.element,
            style(&failure.message).yellow()
        );
    }
    let failed_hooks = summary
        .code_hooks
        .failed
        .iter()
        .chain(summary.content.hooks.failed.iter());
    for (hook, message) in failed_hooks {
        let _ = writeln!(
            out,
            "{} hook {} failed: {}",
            warn,
            hook,
            style(message).yellow()
        );
    }
    for path in &summary.retained_workdirs {
        let _ = writeln!(out, "  kept working copy: {}", path.display());
    }

    Ok(out)
}
