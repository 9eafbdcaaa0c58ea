//! Shared helper functions for CLI commands

use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::partno::PartNumber;
use crate::core::team::CapabilityResolver;
use crate::core::{Capabilities, Config, Project};
use crate::stock::store::FsStore;

/// Everything a command needs: the discovered project, its config and roster,
/// the store and the acting user.
pub struct Ctx {
    pub project: Project,
    pub config: Config,
    pub store: FsStore,
    pub caps: Capabilities,
    pub user: String,
}

/// Discover the project and load config, roster and store.
pub fn context(global: &GlobalOpts) -> Result<Ctx> {
    let project = Project::discover().into_diagnostic()?;
    let config = Config::load(&project).into_diagnostic()?;
    let caps = Capabilities::load(&project);
    let store = FsStore::new(&project);
    let user = config.user(global.user.as_deref());
    Ok(Ctx {
        project,
        config,
        store,
        caps,
        user,
    })
}

/// Fail unless the acting user holds the given role.
pub fn require_role(ctx: &Ctx, role: &str) -> Result<()> {
    if ctx.caps.has_capability(&ctx.user, role) {
        Ok(())
    } else {
        Err(miette::miette!(
            "user '{}' lacks the '{}' role required for this operation",
            ctx.user,
            role
        ))
    }
}

/// Parse a part number argument with a diagnostic-friendly error.
pub fn parse_partno(text: &str) -> Result<PartNumber> {
    PartNumber::parse(text).into_diagnostic()
}
