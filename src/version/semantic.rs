//! Semantic version with up to four numeric components and a pre-release label.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use super::VersionSpec;

/// Error returned when a version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Version string is empty")]
    Empty,
    #[error("'{0}' is not a valid version string")]
    Invalid(String),
}

/// A `major.minor.patch(.revision)` version with an optional pre-release label.
///
/// Versions that differ only in the number of written components are equal
/// (`1.0` == `1.0.0`), and labels compare case-insensitively. A version with a
/// label sorts below the same numeric version without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticVersion {
    components: [u64; 4],
    /// Number of numeric components as written, used for display only
    written: usize,
    special: String,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            components: [major, minor, patch, 0],
            written: 3,
            special: String::new(),
        }
    }

    pub fn with_revision(major: u64, minor: u64, patch: u64, revision: u64) -> Self {
        Self {
            components: [major, minor, patch, revision],
            written: 4,
            special: String::new(),
        }
    }

    /// Attach a pre-release label (e.g. `beta1`).
    pub fn with_special(mut self, special: impl Into<String>) -> Self {
        self.special = special.into();
        self
    }

    pub fn major(&self) -> u64 {
        self.components[0]
    }

    pub fn minor(&self) -> u64 {
        self.components[1]
    }

    pub fn patch(&self) -> u64 {
        self.components[2]
    }

    pub fn revision(&self) -> u64 {
        self.components[3]
    }

    /// The pre-release label, empty for release versions.
    pub fn special_version(&self) -> &str {
        &self.special
    }

    pub fn is_prerelease(&self) -> bool {
        !self.special.is_empty()
    }

    pub fn is_release(&self) -> bool {
        self.special.is_empty()
    }

    /// The first version of the next minor line: `1.2.5-beta` -> `1.3`.
    ///
    /// Past the largest minor this is the next major line.
    pub fn next_minor(&self) -> Self {
        let components = match self.minor().checked_add(1) {
            Some(minor) => [self.major(), minor, 0, 0],
            None => [self.major().saturating_add(1), 0, 0, 0],
        };
        Self {
            components,
            written: 2,
            special: String::new(),
        }
    }

    /// Range of non-breaking upgrades from this version: `[self, next_minor)`.
    pub fn safe_range(&self) -> VersionSpec {
        VersionSpec::range(Some(self.clone()), true, Some(self.next_minor()), false)
    }

    fn numeric_cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }

    fn special_cmp(&self, other: &Self) -> Ordering {
        match (self.special.is_empty(), other.special.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self
                .special
                .to_ascii_lowercase()
                .cmp(&other.special.to_ascii_lowercase()),
        }
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_cmp(other).then_with(|| self.special_cmp(other))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
        self.special.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.written.max(2);
        for (i, component) in self.components[..shown].iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", component)?;
        }
        if !self.special.is_empty() {
            write!(f, "-{}", self.special)?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let invalid = || VersionParseError::Invalid(s.to_string());

        // Build metadata carries no ordering information
        let without_metadata = match trimmed.split_once('+') {
            Some((head, metadata)) if !metadata.is_empty() => head,
            Some(_) => return Err(invalid()),
            None => trimmed,
        };

        let (numeric, special) = match without_metadata.split_once('-') {
            Some((numeric, special)) => (numeric, special),
            None => (without_metadata, ""),
        };

        if without_metadata.contains('-') && special.is_empty() {
            return Err(invalid());
        }
        if !special
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(invalid());
        }

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid());
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self {
            components,
            written: parts.len(),
            special: special.to_string(),
        })
    }
}

impl TryFrom<String> for SemanticVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SemanticVersion> for String {
    fn from(value: SemanticVersion) -> Self {
        value.to_string()
    }
}
