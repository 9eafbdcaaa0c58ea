//! Team roster and capability lookups
//!
//! Role checks resolve against an optional roster file (`.pst/team.yaml`)
//! mapping user names to role lists. A project without a roster skips all
//! role enforcement - single-user projects need no ceremony.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resolves whether a user holds a named capability (role).
pub trait CapabilityResolver {
    fn has_capability(&self, user: &str, role: &str) -> bool;
}

/// Roster of known users and their roles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRoster {
    /// user name -> roles held
    pub users: BTreeMap<String, Vec<String>>,
}

impl TeamRoster {
    /// Load the roster from a project, if one is configured.
    pub fn load(project: &crate::core::project::Project) -> Option<Self> {
        let content = std::fs::read_to_string(project.team_path()).ok()?;
        serde_yml::from_str(&content).ok()
    }
}

impl CapabilityResolver for TeamRoster {
    fn has_capability(&self, user: &str, role: &str) -> bool {
        self.users
            .get(user)
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }
}

/// Roster wrapper used by commands: no roster means no role checks.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    roster: Option<TeamRoster>,
}

impl Capabilities {
    pub fn new(roster: Option<TeamRoster>) -> Self {
        Self { roster }
    }

    pub fn load(project: &crate::core::project::Project) -> Self {
        Self::new(TeamRoster::load(project))
    }
}

impl CapabilityResolver for Capabilities {
    fn has_capability(&self, user: &str, role: &str) -> bool {
        match &self.roster {
            Some(roster) => roster.has_capability(user, role),
            None => true,
        }
    }
}
