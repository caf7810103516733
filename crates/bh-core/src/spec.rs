// SPDX-License-Identifier: MIT

//! Package spec identity: the `(name, version)` pair that keys every bubble,
//! worker, and metadata-cache record.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A canonicalized package name.
///
/// Canonicalization is lowercase, `_` → `-`, surrounding whitespace
/// stripped. Two names that differ only by case or underscore/dash style
/// compare equal after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(canonicalize(raw.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonicalize(raw: &str) -> String {
    raw.trim().to_lowercase().replace('_', "-")
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Errors raised while parsing a `name==version` spec string.
#[derive(Debug, Error)]
pub enum SpecParseError {
    #[error("spec '{0}' is missing the '==' version separator")]
    MissingSeparator(String),
    #[error("spec '{0}' has an empty package name")]
    EmptyName(String),
    #[error("spec '{raw}' has an invalid version: {source}")]
    InvalidVersion { raw: String, source: semver::Error },
}

impl PartialEq for SpecParseError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MissingSeparator(a), Self::MissingSeparator(b)) => a == b,
            (Self::EmptyName(a), Self::EmptyName(b)) => a == b,
            (Self::InvalidVersion { raw: a, source: sa }, Self::InvalidVersion { raw: b, source: sb }) => {
                a == b && sa.to_string() == sb.to_string()
            }
            _ => false,
        }
    }
}

impl Eq for SpecParseError {}

/// The sole identity of a bubble and the sole key for routing to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spec {
    pub name: PackageName,
    #[serde(with = "version_serde")]
    pub version: Version,
}

impl Spec {
    pub fn new(name: impl Into<PackageName>, version: Version) -> Self {
        Self { name: name.into(), version }
    }

    /// The on-disk/cache-key slug for this spec: `<name>-<version>`.
    pub fn slug(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

impl FromStr for Spec {
    type Err = SpecParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, version) = raw
            .split_once("==")
            .ok_or_else(|| SpecParseError::MissingSeparator(raw.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SpecParseError::EmptyName(raw.to_string()));
        }
        let version = Version::parse(version.trim())
            .map_err(|source| SpecParseError::InvalidVersion { raw: raw.to_string(), source })?;
        Ok(Self::new(name, version))
    }
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(version: &Version, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Version, D::Error> {
        let raw = String::deserialize(d)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}
