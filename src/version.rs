//! Version canonicalization and the textual reference grammar.

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    str::FromStr,
};

use itertools::Itertools;
use thiserror::Error;

/// The minimum textual length of a canonical version. Shorter versions are
/// right-padded with `.0` until they reach it, so `1`, `1.0` and `1.0.0`
/// all share the canonical form `1.0.0`.
const CANONICAL_MIN_LEN: usize = 5;

/// Errors produced while parsing versions, references and constraints.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The reference contains no package name.
    #[error("reference {0:?} has no package name")]
    EmptyName(String),

    /// The package name contains a character outside `[A-Za-z0-9.+-]`.
    #[error("invalid character {1:?} in package name of {0:?}")]
    InvalidName(String, char),

    /// An operator was given without a version to compare against.
    #[error("reference {0:?} has an operator but no version")]
    EmptyVersion(String),

    /// A version component is not a run of ASCII digits.
    #[error("invalid version component {1:?} in {0:?}")]
    InvalidVersion(String, String),

    /// A user constraint did not start with `+` or `-`.
    #[error("constraint {0:?} must start with '+' or '-'")]
    MissingPrefix(String),
}

/// A package version in canonical dotted-numeric form.
///
/// The canonical form is the raw version right-padded with `.0` until it is
/// at least [`CANONICAL_MIN_LEN`] characters long. Ordering and equality
/// compare the numeric components of the canonical form, zero-filling the
/// shorter side, so `1.10` orders after `1.9` and `2` equals `2.0.0`.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    canonical: String,
    components: Vec<u64>,
}

impl Version {
    /// Parses a raw version string into its canonical form.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut canonical = raw.to_string();
        while canonical.len() < CANONICAL_MIN_LEN {
            canonical.push_str(".0");
        }

        let components = canonical
            .split('.')
            .map(|component| {
                if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ParseError::InvalidVersion(
                        raw.to_string(),
                        component.to_string(),
                    ));
                }
                component.parse::<u64>().map_err(|_| {
                    ParseError::InvalidVersion(raw.to_string(), component.to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            canonical,
            components,
        })
    }

    /// The version exactly as it appeared in the source document. Command
    /// synthesis uses this form.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The `.0`-padded form all comparisons are defined over.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components
            .iter()
            .copied()
            .zip_longest(other.components.iter().copied())
            .map(|pair| pair.or(0, 0))
            .map(|(left, right)| left.cmp(&right))
            .find(|&ordering| ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// A comparison operator of a version-constrained reference.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
}

impl Operator {
    /// Whether a package whose version compares to the reference version as
    /// `ordering` satisfies this operator.
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::Less => ordering == Ordering::Less,
            Operator::Greater => ordering == Ordering::Greater,
            Operator::LessEqual => ordering != Ordering::Greater,
            Operator::GreaterEqual => ordering != Ordering::Less,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One element of a dependency group, conflict list or user constraint: a
/// package name with an optional version bound.
///
/// The textual forms are `name`, `name=ver`, `name<ver`, `name>ver`,
/// `name<=ver` and `name>=ver`. A reference without an operator matches
/// every version of the named package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The package name the reference applies to.
    pub name: String,
    /// The version bound, if any.
    pub constraint: Option<(Operator, Version)>,
}

impl Reference {
    /// Whether the given version satisfies this reference's bound. Matching
    /// the package name is the caller's job.
    pub fn matches_version(&self, version: &Version) -> bool {
        match &self.constraint {
            None => true,
            Some((operator, bound)) => operator.matches(version.cmp(bound)),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-')
}

impl FromStr for Reference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, constraint) = match s.find(['<', '>', '=']) {
            None => (s, None),
            Some(at) => {
                let (name, rest) = s.split_at(at);
                let (operator, version) = if let Some(v) = rest.strip_prefix("<=") {
                    (Operator::LessEqual, v)
                } else if let Some(v) = rest.strip_prefix(">=") {
                    (Operator::GreaterEqual, v)
                } else if let Some(v) = rest.strip_prefix('=') {
                    (Operator::Equal, v)
                } else if let Some(v) = rest.strip_prefix('<') {
                    (Operator::Less, v)
                } else if let Some(v) = rest.strip_prefix('>') {
                    (Operator::Greater, v)
                } else {
                    unreachable!("split on an operator character")
                };

                if version.is_empty() {
                    return Err(ParseError::EmptyVersion(s.to_string()));
                }
                (name, Some((operator, Version::parse(version)?)))
            }
        };

        if name.is_empty() {
            return Err(ParseError::EmptyName(s.to_string()));
        }
        if let Some(c) = name.chars().find(|&c| !is_name_char(c)) {
            return Err(ParseError::InvalidName(s.to_string(), c));
        }

        Ok(Self {
            name: name.to_string(),
            constraint,
        })
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.constraint {
            None => write!(f, "{}", self.name),
            Some((operator, version)) => write!(f, "{}{}{}", self.name, operator, version),
        }
    }
}
