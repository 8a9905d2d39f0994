//! Semantic version types.
//!
//! Provides the strict `Version` used for every resolved package and the
//! lenient `PartialVersion` used while building constraints, where missing
//! components and wildcards are allowed.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{BrickError, BrickResult};

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version with possibly missing components (`1`, `1.2`, `1.x`, `*`)
///
/// Once a component is missing, every later component is missing too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Strictly parse a version; all three numeric components are required
    pub fn parse(input: &str) -> BrickResult<Self> {
        input.parse()
    }

    /// Attach a prerelease tag
    pub fn with_prerelease(mut self, prerelease: &str) -> Self {
        self.prerelease = Some(prerelease.to_string());
        self
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Compare by semver precedence (build metadata ignored)
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }

    /// Same (major, minor, patch) triple, ignoring tags
    pub fn same_triple(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }
}

/// Compare dot-separated prerelease identifiers: numeric identifiers compare
/// numerically and sort before alphanumeric ones, a shorter prefix sorts first.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

fn is_numeric(component: &str) -> bool {
    !component.is_empty() && component.bytes().all(|b| b.is_ascii_digit())
}

fn valid_identifiers(tag: &str) -> bool {
    tag.split('.').all(|ident| {
        !ident.is_empty()
            && ident
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

/// Split `core-pre+build` into its three parts
fn split_tags(input: &str) -> (&str, Option<&str>, Option<&str>) {
    let (version_part, build) = match input.split_once('+') {
        Some((v, b)) => (v, Some(b)),
        None => (input, None),
    };
    let (core_part, prerelease) = match version_part.split_once('-') {
        Some((c, p)) => (c, Some(p)),
        None => (version_part, None),
    };
    (core_part, prerelease, build)
}

impl FromStr for Version {
    type Err = BrickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let invalid = |reason: &str| BrickError::InvalidVersion {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (core_part, prerelease, build) = split_tags(input);

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(invalid("expected major.minor.patch"));
        }
        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if !is_numeric(part) {
                return Err(invalid(&format!("'{}' is not a number", part)));
            }
            *slot = part
                .parse()
                .map_err(|_| invalid(&format!("'{}' is out of range", part)))?;
        }

        if let Some(pre) = prerelease {
            if !valid_identifiers(pre) {
                return Err(invalid("malformed prerelease identifier"));
            }
        }
        if let Some(build) = build {
            if !valid_identifiers(build) {
                return Err(invalid("malformed build metadata"));
            }
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            prerelease: prerelease.map(str::to_string),
            build: build.map(str::to_string),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Build metadata only breaks ties so that Ord agrees with Eq.
        self.cmp_precedence(other)
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl PartialVersion {
    /// Parse a possibly incomplete version. Components may be omitted or be a
    /// wildcard (`x`, `X`, `*`); anything else that is not a number is an error.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        let input = input.strip_prefix('v').unwrap_or(input);
        let (core_part, prerelease, _build) = split_tags(input);

        if let Some(pre) = prerelease {
            if !valid_identifiers(pre) {
                return Err(format!("malformed prerelease '{}'", pre));
            }
        }

        let mut partial = PartialVersion {
            prerelease: prerelease.map(str::to_string),
            ..Default::default()
        };
        if core_part.is_empty() {
            return Ok(partial);
        }

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() > 3 {
            return Err(format!("too many components in '{}'", core_part));
        }

        let mut wildcard = false;
        for (index, part) in parts.iter().enumerate() {
            let value = match *part {
                "x" | "X" | "*" => None,
                number if is_numeric(number) => Some(
                    number
                        .parse::<u64>()
                        .map_err(|_| format!("'{}' is out of range", number))?,
                ),
                other => return Err(format!("'{}' is not a version component", other)),
            };
            wildcard |= value.is_none();
            let value = if wildcard { None } else { value };
            match index {
                0 => partial.major = value,
                1 => partial.minor = value,
                _ => partial.patch = value,
            }
        }

        Ok(partial)
    }

    /// Parse leniently: any component that is not a number counts as missing
    pub fn parse_lenient(input: &str) -> Self {
        let input = input.trim();
        let input = input.strip_prefix('v').unwrap_or(input);
        let (core_part, prerelease, _build) = split_tags(input);

        let mut components = core_part
            .split('.')
            .map(|part| part.parse::<u64>().ok());
        let major = components.next().flatten();
        let minor = major.and(components.next().flatten());
        let patch = minor.and(components.next().flatten());

        PartialVersion {
            major,
            minor,
            patch,
            prerelease: prerelease
                .filter(|pre| valid_identifiers(pre))
                .map(str::to_string),
        }
    }

    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }
}

/// Lenient public entry point for version-like text; never fails.
///
/// Missing components and wildcard tokens become 0, and so does anything
/// that is not a number. The constraint parser does not go through here: it
/// uses [`PartialVersion::parse`] so malformed terms are reported.
pub fn parse_partial(input: &str) -> Version {
    PartialVersion::parse_lenient(input).to_version()
}
