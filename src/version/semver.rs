//! Dot-delimited version numbers and the two update decisions built on them.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::VersionCheckError;

/// Ordered numeric components, most significant first.
///
/// Equality and ordering pad the shorter side with zeros, so `1.2` == `1.2.0`.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
}

impl Version {
    pub fn new(components: Vec<u64>) -> Self {
        Self { components }
    }

    /// Never fails: a component that is not a non-negative integer counts as 0.
    pub fn parse_lossy(value: &str) -> Self {
        let components = value
            .trim()
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect();
        Self { components }
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }

    pub fn major(&self) -> u64 {
        self.component(0)
    }

    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    pub fn patch(&self) -> u64 {
        self.component(2)
    }
}

impl FromStr for Version {
    type Err = VersionCheckError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| VersionCheckError::InvalidVersion {
            value: value.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty version"));
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid(&format!("component '{}' is not a non-negative integer", part)));
                }
                part.parse::<u64>()
                    .map_err(|_| invalid(&format!("component '{}' is out of range", part)))
            })
            .collect::<Result<Vec<u64>, _>>()?;

        Ok(Self { components })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// True when `latest` is strictly greater than `current`.
pub fn is_version_newer(latest: &str, current: &str) -> bool {
    Version::parse_lossy(latest) > Version::parse_lossy(current)
}

/// One minor or one patch behind is tolerated, any major gap is not.
pub fn is_version_critically_outdated(latest: &str, current: &str) -> bool {
    is_critically_outdated(&Version::parse_lossy(latest), &Version::parse_lossy(current))
}

pub fn is_critically_outdated(latest: &Version, current: &Version) -> bool {
    if latest.major() > current.major() {
        return true;
    }
    if latest.major() == current.major() && latest.minor() >= current.minor().saturating_add(2) {
        return true;
    }
    latest.major() == current.major()
        && latest.minor() == current.minor()
        && latest.patch() >= current.patch().saturating_add(2)
}
