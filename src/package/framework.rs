//! Target framework names and dependency-group selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::version::SemanticVersion;

/// Error returned when a framework name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid target framework name")]
pub struct FrameworkParseError(pub String);

/// Short framework prefixes and the identifiers they stand for.
/// Longer prefixes come first so `netstandard` is not read as `net`.
const SHORT_NAMES: &[(&str, &str)] = &[
    ("netstandard", ".NETStandard"),
    ("netcoreapp", ".NETCoreApp"),
    ("net", ".NETFramework"),
    ("sl", "Silverlight"),
    ("wp", "WindowsPhone"),
    ("win", "Windows"),
];

/// A target framework such as `.NETFramework,Version=v4.5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameworkName {
    pub identifier: String,
    pub version: SemanticVersion,
    pub profile: Option<String>,
}

impl FrameworkName {
    pub fn new(identifier: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            identifier: identifier.into(),
            version,
            profile: None,
        }
    }

    /// Whether a dependency group declared for `self` can be used by a
    /// project targeting `project`.
    pub fn is_compatible_with(&self, project: &FrameworkName) -> bool {
        self.identifier.eq_ignore_ascii_case(&project.identifier) && self.version <= project.version
    }

    fn parse_long(value: &str) -> Option<Self> {
        let mut parts = value.split(',').map(str::trim);
        let identifier = parts.next().filter(|s| !s.is_empty())?;
        let mut version = None;
        let mut profile = None;

        for part in parts {
            let (key, raw) = part.split_once('=')?;
            match key.trim().to_ascii_lowercase().as_str() {
                "version" => {
                    let raw = raw.trim();
                    let raw = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
                    version = Some(raw.parse().ok()?);
                }
                "profile" => profile = Some(raw.trim().to_string()).filter(|p| !p.is_empty()),
                _ => return None,
            }
        }

        Some(Self {
            identifier: identifier.to_string(),
            version: version?,
            profile,
        })
    }

    fn parse_short(value: &str) -> Option<Self> {
        let lower = value.to_ascii_lowercase();
        let (prefix, identifier) = SHORT_NAMES
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))?;
        let digits = &value[prefix.len()..];
        if digits.is_empty() {
            return None;
        }

        // "45" means 4.5, "451" means 4.5.1; dotted forms are taken as written
        let version = if digits.contains('.') {
            digits.parse().ok()?
        } else if digits.chars().all(|c| c.is_ascii_digit()) {
            let dotted: Vec<String> = digits.chars().map(String::from).collect();
            let text = if dotted.len() == 1 {
                format!("{}.0", dotted[0])
            } else {
                dotted.join(".")
            };
            text.parse().ok()?
        } else {
            return None;
        };

        Some(Self::new(*identifier, version))
    }
}

impl fmt::Display for FrameworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},Version=v{}", self.identifier, self.version)?;
        if let Some(profile) = &self.profile {
            write!(f, ",Profile={}", profile)?;
        }
        Ok(())
    }
}

impl FromStr for FrameworkName {
    type Err = FrameworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let parsed = if value.contains(',') {
            Self::parse_long(value)
        } else {
            Self::parse_short(value)
        };
        parsed.ok_or_else(|| FrameworkParseError(s.to_string()))
    }
}

impl TryFrom<String> for FrameworkName {
    type Error = FrameworkParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FrameworkName> for String {
    fn from(value: FrameworkName) -> Self {
        value.to_string()
    }
}
