//! Built-in content hooks.
//!
//! Both run `drush` on the target environment right after its database has
//! been imported, so a cloned site cannot email the real users of the
//! original.

use super::{HookContext, HookKind, Transform};
use crate::error::Result;
use crate::framework;

/// Mail relay host set on cloned sites; it resolves nowhere.
pub const NO_MAIL_HOST: &str = "NOEMAIL-FROM-CLONED-SITE.example.com";

/// Points the SMTP module at an unusable host.
pub struct DisableSmtp;

impl Transform for DisableSmtp {
    fn name(&self) -> &str {
        "disable-smtp"
    }

    fn kind(&self) -> HookKind {
        HookKind::Content
    }

    fn apply(&self, ctx: &HookContext<'_>) -> Result<()> {
        framework::run_drush(
            ctx.platform,
            ctx.target,
            ctx.env,
            ["vset", "smtp_host", NO_MAIL_HOST],
        )?;
        Ok(())
    }
}

/// Blanks the email address of every user except the anonymous one.
pub struct RemoveEmails;

impl Transform for RemoveEmails {
    fn name(&self) -> &str {
        "remove-emails"
    }

    fn kind(&self) -> HookKind {
        HookKind::Content
    }

    fn apply(&self, ctx: &HookContext<'_>) -> Result<()> {
        framework::run_drush(
            ctx.platform,
            ctx.target,
            ctx.env,
            ["sqlq", "update users set mail = '' where uid <> 0"],
        )?;
        Ok(())
    }
}
