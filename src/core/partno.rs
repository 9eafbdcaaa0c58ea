//! Part number parsing and revision handling
//!
//! A part number is an uppercase letter prefix followed by exactly four
//! digits, optionally suffixed with a single lowercase revision letter
//! (`AB1234`, `AB1234c`). Stock and BOM bookkeeping use the revisionless
//! base number; item and document tracking use the full id. Revisions of the
//! same base number are interchangeable for stock purposes.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartNoError {
    #[error("'{0}' is not a valid part number")]
    Invalid(String),

    #[error("part number '{0}' has no revision context set")]
    NoRevisionContext(String),
}

/// A parsed part number: base number plus optional revision letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartNumber {
    base: String,
    revision: Option<char>,
    num_revisions: Option<usize>,
}

impl PartNumber {
    /// Parse a part number of the form `[A-Z]+\d{4}` with an optional
    /// trailing lowercase revision letter.
    pub fn parse(text: &str) -> Result<Self, PartNoError> {
        let invalid = || PartNoError::Invalid(text.to_string());

        let mut chars = text.chars().peekable();
        let mut prefix_len = 0;
        while chars.peek().is_some_and(|c| c.is_ascii_uppercase()) {
            prefix_len += 1;
            chars.next();
        }
        if prefix_len == 0 {
            return Err(invalid());
        }

        let mut digits = 0;
        while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            digits += 1;
            chars.next();
        }
        if digits != 4 {
            return Err(invalid());
        }

        let revision = match chars.next() {
            None => None,
            Some(c) if c.is_ascii_lowercase() => {
                if chars.next().is_some() {
                    return Err(invalid());
                }
                Some(c)
            }
            Some(_) => return Err(invalid()),
        };

        Ok(Self {
            base: text[..prefix_len + 4].to_string(),
            revision,
            num_revisions: None,
        })
    }

    /// The full id: base number plus revision letter when present.
    pub fn id(&self) -> String {
        match self.revision {
            Some(rev) => format!("{}{}", self.base, rev),
            None => self.base.clone(),
        }
    }

    /// The revisionless base number (stock/BOM granularity).
    pub fn base_number(&self) -> &str {
        &self.base
    }

    pub fn revision(&self) -> Option<char> {
        self.revision
    }

    /// 0-based revision index (`a` = 0), if a revision is set.
    pub fn revision_index(&self) -> Option<usize> {
        self.revision.map(|rev| (rev as usize) - ('a' as usize))
    }

    /// Fix the number of existing revisions (must be >= 1). If no revision
    /// letter was given, the latest revision is assumed.
    pub fn set_revision_count(&mut self, num_revisions: usize) {
        debug_assert!(num_revisions > 0);
        self.num_revisions = Some(num_revisions);
        if self.revision.is_none() {
            self.revision = Some(Self::revision_repr(num_revisions - 1));
        }
    }

    /// Whether a newer revision than this one exists. Requires the revision
    /// count to have been set via [`set_revision_count`](Self::set_revision_count).
    pub fn is_outdated(&self) -> Result<bool, PartNoError> {
        let count = self
            .num_revisions
            .ok_or_else(|| PartNoError::NoRevisionContext(self.id()))?;
        let index = self
            .revision_index()
            .ok_or_else(|| PartNoError::NoRevisionContext(self.id()))?;
        Ok(count > index + 1)
    }

    /// The letter representation of a 0-based revision index.
    pub fn revision_repr(index: usize) -> char {
        (b'a' + index as u8) as char
    }

    /// Build the full id of the given revision of this base number.
    pub fn revision_id(&self, index: usize) -> String {
        format!("{}{}", self.base, Self::revision_repr(index))
    }
}

impl std::str::FromStr for PartNumber {
    type Err = PartNoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for PartNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}
