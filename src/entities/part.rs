//! Catalog part definition
//!
//! A part definition carries the descriptive data for one base part number:
//! name, category, sourcing references and the ordered revision list. The
//! latest revision is the active one; earlier revisions are kept for
//! archiving. Once released a definition is meant to change only through a
//! new revision; obsolete parts are hidden from default listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sourcing reference: a supplier or manufacturer and their part number.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub name: String,

    /// The source's own part number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partno: Option<String>,
}

/// One entry of the revision list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Revision {
    /// What changed in this revision
    #[serde(default)]
    pub description: String,

    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Part {
    /// Base part number (no revision letter)
    pub partno: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppliers: Vec<SourceRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manufacturers: Vec<SourceRef>,

    /// Ordered revisions; index 0 is revision `a`, the last one is active
    pub revisions: Vec<Revision>,

    #[serde(default)]
    pub released: bool,

    #[serde(default)]
    pub obsolete: bool,

    pub author: String,

    pub created: DateTime<Utc>,
}

impl Part {
    /// Create a fresh definition starting at revision `a`.
    pub fn new(partno: &str, name: &str, author: &str) -> Self {
        let now = Utc::now();
        Self {
            partno: partno.to_string(),
            name: name.to_string(),
            description: String::new(),
            category: String::new(),
            suppliers: Vec::new(),
            manufacturers: Vec::new(),
            revisions: vec![Revision {
                description: "initial revision".to_string(),
                created: now,
            }],
            released: false,
            obsolete: false,
            author: author.to_string(),
            created: now,
        }
    }

    /// Append a new revision, making it the active one.
    pub fn revise(&mut self, description: &str) {
        self.revisions.push(Revision {
            description: description.to_string(),
            created: Utc::now(),
        });
    }

    /// The 0-based index of the active revision.
    pub fn active_revision(&self) -> usize {
        self.revisions.len().saturating_sub(1)
    }
}
