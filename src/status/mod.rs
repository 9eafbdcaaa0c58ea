//! Status transition engine for serialized items
//!
//! Legal status transitions are configured per part family: a map from status
//! name to its definition (allowed origin statuses, whether the status makes
//! the item unavailable, and an optional role required to perform the
//! transition). Each family owns an independent little graph; there is no
//! global state machine. The family for a part number is resolved through an
//! ordered candidate chain: the full id, then the base number, then the
//! literal key `default`.
//!
//! An item that has never been assigned a status has the empty string as its
//! status, so maps use `""` as the origin for initial transitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::partno::PartNumber;
use crate::core::team::CapabilityResolver;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("unknown status: '{0}'")]
    UnknownStatus(String),

    #[error("invalid status transition: from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("role '{role}' is required for the status transition from '{from}' to '{to}'")]
    Forbidden {
        from: String,
        to: String,
        role: String,
    },
}

/// Definition of a single status vertex within a family's transition map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusDefinition {
    /// Statuses a transition into this one may start from. The empty string
    /// denotes "no status assigned yet".
    pub origins: Vec<String>,

    /// Whether an item in this status is considered unavailable
    pub unavailable: bool,

    /// Role required to perform a transition into this status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Transition map of one part family: status name -> definition.
pub type StatusMap = BTreeMap<String, StatusDefinition>;

/// All configured transition maps, keyed by full part id, base number or
/// `default`. Loaded once from config and immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusBook {
    maps: BTreeMap<String, StatusMap>,
}

impl StatusBook {
    pub fn new(maps: BTreeMap<String, StatusMap>) -> Self {
        Self { maps }
    }

    /// Resolve the transition map for a part number. Candidate keys are tried
    /// in order (full id, base number, `default`); the first present map
    /// wins, even if empty.
    pub fn resolve(&self, partno: &PartNumber) -> Option<&StatusMap> {
        let id = partno.id();
        [id.as_str(), partno.base_number(), "default"]
            .iter()
            .find_map(|key| self.maps.get(*key))
    }

    /// Validate a status change for an item of the given part number.
    ///
    /// Checks run in a fixed order: the target status must exist in the
    /// resolved map, the current status must be a legal origin, and the
    /// acting user must hold the required role, if any. Returns the target
    /// definition so the caller can derive the availability flag.
    pub fn check_transition<'a>(
        &'a self,
        partno: &PartNumber,
        current: &str,
        target: &str,
        user: &str,
        capabilities: &dyn CapabilityResolver,
    ) -> Result<&'a StatusDefinition, StatusError> {
        let definition = self
            .resolve(partno)
            .and_then(|map| map.get(target))
            .ok_or_else(|| StatusError::UnknownStatus(target.to_string()))?;

        if !definition.origins.iter().any(|origin| origin == current) {
            return Err(StatusError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        if let Some(role) = &definition.role {
            if !capabilities.has_capability(user, role) {
                return Err(StatusError::Forbidden {
                    from: current.to_string(),
                    to: target.to_string(),
                    role: role.clone(),
                });
            }
        }

        Ok(definition)
    }

    /// Whether the given status marks items of this part family unavailable.
    /// Unknown statuses count as available.
    pub fn is_unavailable(&self, partno: &PartNumber, status: &str) -> bool {
        self.resolve(partno)
            .and_then(|map| map.get(status))
            .map(|definition| definition.unavailable)
            .unwrap_or(false)
    }
}
