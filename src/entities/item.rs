//! Serialized item entity
//!
//! An item is one physical, serialized unit of a part: a serial number, the
//! full part number (including the revision it was built to), an optional
//! project association, a status string with its derived availability flag
//! and an append-only comment trail. Import files may carry arbitrary extra
//! columns; those are kept as free-form fields on the document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yml::Value;

/// One comment on an item. Status changes append `[Auto]` comments alongside
/// any user-supplied text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub user: String,
    pub date: DateTime<Utc>,
    pub message: String,
}

impl Comment {
    pub fn new(user: &str, message: &str) -> Self {
        Self {
            user: user.to_string(),
            date: Utc::now(),
            message: message.to_string(),
        }
    }

    pub fn at(user: &str, message: &str, date: DateTime<Utc>) -> Self {
        Self {
            user: user.to_string(),
            date,
            message: message.to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Serial number, unique across the project
    pub serial: String,

    /// Full part number including the revision letter
    pub partno: String,

    #[serde(default)]
    pub project: String,

    /// Current status; empty until a first transition assigns one
    #[serde(default)]
    pub status: String,

    #[serde(default = "default_true")]
    pub available: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,

    /// Free-form fields carried over from import columns
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Item {
    pub fn new(serial: &str, partno: &str) -> Self {
        Self {
            serial: serial.to_string(),
            partno: partno.to_string(),
            project: String::new(),
            status: String::new(),
            available: true,
            comments: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}
