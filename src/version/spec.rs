//! Version ranges (`[1.0,2.0)`, `1.0`, `[1.0]`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{SemanticVersion, VersionParseError};

/// Error returned when a version range cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionSpecParseError {
    #[error("Version range is empty")]
    Empty,
    #[error("'{0}' is not a valid version range")]
    Invalid(String),
    #[error("'{range}' contains an invalid version: {source}")]
    Version {
        range: String,
        #[source]
        source: VersionParseError,
    },
}

/// A predicate over [`SemanticVersion`] with optional lower and upper bounds.
///
/// The default value has no bounds and accepts every version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSpec {
    min: Option<SemanticVersion>,
    min_inclusive: bool,
    max: Option<SemanticVersion>,
    max_inclusive: bool,
}

impl VersionSpec {
    /// Range accepting every version.
    pub fn any() -> Self {
        Self::default()
    }

    /// `>= version`
    pub fn at_least(version: SemanticVersion) -> Self {
        Self::range(Some(version), true, None, false)
    }

    /// `== version`
    pub fn exact(version: SemanticVersion) -> Self {
        Self::range(Some(version.clone()), true, Some(version), true)
    }

    pub fn range(
        min: Option<SemanticVersion>,
        min_inclusive: bool,
        max: Option<SemanticVersion>,
        max_inclusive: bool,
    ) -> Self {
        Self {
            min_inclusive: min_inclusive && min.is_some(),
            max_inclusive: max_inclusive && max.is_some(),
            min,
            max,
        }
    }

    pub fn min_version(&self) -> Option<&SemanticVersion> {
        self.min.as_ref()
    }

    pub fn max_version(&self) -> Option<&SemanticVersion> {
        self.max.as_ref()
    }

    pub fn is_min_inclusive(&self) -> bool {
        self.min_inclusive
    }

    pub fn is_max_inclusive(&self) -> bool {
        self.max_inclusive
    }

    pub fn is_any(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The single version this range admits, if it is an exact range.
    pub fn exact_version(&self) -> Option<&SemanticVersion> {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) if min == max && self.min_inclusive && self.max_inclusive => {
                Some(min)
            }
            _ => None,
        }
    }

    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        let above_min = match &self.min {
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        };
        above_min && below_max
    }

    /// Human readable form for messages, e.g. `(>= 1.0 && < 2.0)`.
    pub fn pretty(&self) -> String {
        if let Some(version) = self.exact_version() {
            return format!("(= {})", version);
        }

        let mut parts = Vec::with_capacity(2);
        if let Some(min) = &self.min {
            let op = if self.min_inclusive { ">=" } else { ">" };
            parts.push(format!("{} {}", op, min));
        }
        if let Some(max) = &self.max {
            let op = if self.max_inclusive { "<=" } else { "<" };
            parts.push(format!("{} {}", op, max));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("({})", parts.join(" && "))
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(min), true, None) = (&self.min, self.min_inclusive, &self.max) {
            return write!(f, "{}", min);
        }
        if let Some(version) = self.exact_version() {
            return write!(f, "[{}]", version);
        }

        f.write_str(if self.min_inclusive { "[" } else { "(" })?;
        if let Some(min) = &self.min {
            write!(f, "{}", min)?;
        }
        f.write_str(",")?;
        if let Some(max) = &self.max {
            write!(f, "{}", max)?;
        }
        f.write_str(if self.max_inclusive { "]" } else { ")" })
    }
}

impl FromStr for VersionSpec {
    type Err = VersionSpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(VersionSpecParseError::Empty);
        }
        let invalid = || VersionSpecParseError::Invalid(s.to_string());
        let parse_version = |text: &str| {
            text.parse::<SemanticVersion>()
                .map_err(|source| VersionSpecParseError::Version {
                    range: s.to_string(),
                    source,
                })
        };

        // A bare version is an inclusive minimum
        if !value.starts_with(['[', '(']) {
            return Ok(Self::at_least(parse_version(value)?));
        }
        if value.len() < 3 || !value.ends_with([']', ')']) {
            return Err(invalid());
        }

        let min_inclusive = value.starts_with('[');
        let max_inclusive = value.ends_with(']');
        let inner = &value[1..value.len() - 1];
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();

        match parts.as_slice() {
            [single] => {
                // "[1.0]" is the only valid form without a comma
                if !(min_inclusive && max_inclusive) || single.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::exact(parse_version(single)?))
            }
            [min, max] => {
                if min.is_empty() && max.is_empty() {
                    return if min_inclusive || max_inclusive {
                        Err(invalid())
                    } else {
                        Ok(Self::any())
                    };
                }
                let min = (!min.is_empty()).then(|| parse_version(min)).transpose()?;
                let max = (!max.is_empty()).then(|| parse_version(max)).transpose()?;

                // An open bound cannot be inclusive
                if (min.is_none() && min_inclusive) || (max.is_none() && max_inclusive) {
                    return Err(invalid());
                }
                if let (Some(lo), Some(hi)) = (&min, &max) {
                    if lo > hi || (lo == hi && !(min_inclusive && max_inclusive)) {
                        return Err(invalid());
                    }
                }
                Ok(Self::range(min, min_inclusive, max, max_inclusive))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for VersionSpec {
    type Error = VersionSpecParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionSpec> for String {
    fn from(value: VersionSpec) -> Self {
        value.to_string()
    }
}
