//! Project configuration
//!
//! `.pst/config.yaml` holds the acting user, the per-part-family status
//! transition maps and the per-part-family item field requirements. It is
//! read once per command invocation; the maps are immutable afterwards.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_yml::Value;
use thiserror::Error;

use crate::core::partno::PartNumber;
use crate::core::project::Project;
use crate::status::StatusMap;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yml::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequirementError {
    #[error("required field '{0}' is missing")]
    MissingField(String),

    #[error("field '{field}' cannot be parsed as {expected}")]
    BadField { field: String, expected: String },
}

/// Typed field requirements for item imports of one part family.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FieldRequirements {
    pub required_fields: Vec<String>,
    pub date_fields: Vec<String>,
    pub integer_fields: Vec<String>,
    pub float_fields: Vec<String>,
    pub boolean_fields: Vec<String>,
}

impl FieldRequirements {
    /// Validate and coerce a row of raw string fields in place.
    ///
    /// Required fields must be present. Date fields must parse as RFC 3339 or
    /// `YYYY-MM-DD`; integer, float and boolean fields are converted to their
    /// typed YAML values. Unlisted fields stay strings.
    pub fn apply(&self, fields: &mut BTreeMap<String, Value>) -> Result<(), RequirementError> {
        for key in &self.required_fields {
            if !fields.contains_key(key) {
                return Err(RequirementError::MissingField(key.clone()));
            }
        }

        for (key, value) in fields.iter_mut() {
            let text = match value.as_str() {
                Some(text) => text.trim().to_string(),
                None => continue,
            };
            let bad = |expected: &str| RequirementError::BadField {
                field: key.clone(),
                expected: expected.to_string(),
            };

            if self.date_fields.contains(key) {
                let parsed = DateTime::parse_from_rfc3339(&text).is_ok()
                    || chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok();
                if !parsed {
                    return Err(bad("a date"));
                }
            } else if self.integer_fields.contains(key) {
                let n: i64 = text.parse().map_err(|_| bad("an integer"))?;
                *value = Value::from(n);
            } else if self.float_fields.contains(key) {
                let x: f64 = text.parse().map_err(|_| bad("a number"))?;
                *value = Value::from(x);
            } else if self.boolean_fields.contains(key) {
                let flag = match text.to_lowercase().as_str() {
                    "0" | "false" | "no" => false,
                    "1" | "true" | "yes" => true,
                    _ => return Err(bad("a boolean")),
                };
                *value = Value::from(flag);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Acting user for permission checks; `--user` and $USER override/fill this
    pub user: Option<String>,

    /// Per-part-family status transition maps (full id, base number or `default`)
    pub status_maps: BTreeMap<String, StatusMap>,

    /// Per-part-family item field requirements (full id or base number)
    pub item_requirements: BTreeMap<String, FieldRequirements>,
}

impl Config {
    /// Load the project config; a missing file yields the defaults.
    pub fn load(project: &Project) -> Result<Self, ConfigError> {
        let path = project.config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        // a fresh config file is all comments, which parses as an empty document
        Ok(serde_yml::from_str::<Option<Self>>(&content)?.unwrap_or_default())
    }

    /// The acting user: explicit override, then config, then $USER.
    pub fn user(&self, override_user: Option<&str>) -> String {
        override_user
            .map(str::to_string)
            .or_else(|| self.user.clone())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Field requirements for a part number: full id first, then base number.
    pub fn requirements(&self, partno: &PartNumber) -> FieldRequirements {
        let id = partno.id();
        [id.as_str(), partno.base_number()]
            .iter()
            .find_map(|key| self.item_requirements.get(*key))
            .cloned()
            .unwrap_or_default()
    }
}
