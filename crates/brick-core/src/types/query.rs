//! Version constraints (queries).
//!
//! Every textual form a consumer may write (`1.2.3`, `>=1.2`, `~1.2`, `^0.3.1`,
//! `1.x`, `1.2 - 2`, `>=1 <2`, `^1 || ^2`, empty) normalizes to one of four
//! shapes: an exact version, a single bound, a lower/upper pair, or an ordered
//! disjunction of those.

use std::cmp::Ordering;
use std::fmt;

use super::version::{PartialVersion, Version};
use crate::error::{BrickError, BrickResult};

/// Comparison operator of a single bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
}

/// One comparison against a concrete version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound {
    pub op: Op,
    pub version: Version,
}

/// Normalized version constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    /// Matches exactly one version
    Exact(Version),
    /// One comparison
    Single(Bound),
    /// Lower and upper comparison, both must hold
    Dual { lower: Bound, upper: Bound },
    /// Satisfied when any member matches
    List(Vec<Query>),
}

/// Intermediate result of a single whitespace-separated term
#[derive(Debug)]
enum Term {
    Any,
    Exact(Version),
    Range(Option<Bound>, Option<Bound>),
}

impl Op {
    fn symbol(&self) -> &'static str {
        match self {
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
        }
    }

    fn is_lower(&self) -> bool {
        matches!(self, Op::Greater | Op::GreaterEq)
    }
}

impl Bound {
    pub fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn at_least(version: Version) -> Self {
        Self::new(Op::GreaterEq, version)
    }

    fn below(version: Version) -> Self {
        Self::new(Op::Less, version)
    }

    /// Check the comparison alone, ignoring prerelease gating
    pub fn matches(&self, version: &Version) -> bool {
        let ordering = version.cmp_precedence(&self.version);
        match self.op {
            Op::Greater => ordering == Ordering::Greater,
            Op::GreaterEq => ordering != Ordering::Less,
            Op::Less => ordering == Ordering::Less,
            Op::LessEq => ordering != Ordering::Greater,
        }
    }

    /// Stricter of two lower bounds
    fn tighter_lower(self, other: Bound) -> Bound {
        match self.version.cmp_precedence(&other.version) {
            Ordering::Greater => self,
            Ordering::Less => other,
            Ordering::Equal if self.op == Op::Greater => self,
            Ordering::Equal => other,
        }
    }

    /// Stricter of two upper bounds
    fn tighter_upper(self, other: Bound) -> Bound {
        match self.version.cmp_precedence(&other.version) {
            Ordering::Less => self,
            Ordering::Greater => other,
            Ordering::Equal if self.op == Op::Less => self,
            Ordering::Equal => other,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.version)
    }
}

impl Query {
    /// Query matching every release
    pub fn any() -> Self {
        Query::Single(Bound::at_least(Version::new(0, 0, 0)))
    }

    /// Check if a version satisfies this query.
    ///
    /// A prerelease only satisfies a range when one of the range's bounds
    /// carries a prerelease on the same major.minor.patch.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Query::Exact(exact) => version.cmp_precedence(exact) == Ordering::Equal,
            Query::Single(bound) => {
                bound.matches(version) && Self::admits_prerelease(&[bound], version)
            },
            Query::Dual { lower, upper } => {
                lower.matches(version)
                    && upper.matches(version)
                    && Self::admits_prerelease(&[lower, upper], version)
            },
            Query::List(queries) => queries.iter().any(|query| query.matches(version)),
        }
    }

    fn admits_prerelease(bounds: &[&Bound], version: &Version) -> bool {
        !version.is_prerelease()
            || bounds
                .iter()
                .any(|bound| bound.version.is_prerelease() && bound.version.same_triple(version))
    }

    /// Pick the highest version in an ascending-sorted list that satisfies
    /// this query.
    pub fn find_best<'a>(&self, sorted: &'a [Version]) -> Option<&'a Version> {
        sorted.iter().rev().find(|version| self.matches(version))
    }

    /// Return the pinned version when the query is exact
    pub fn as_exact(&self) -> Option<&Version> {
        match self {
            Query::Exact(version) => Some(version),
            _ => None,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Exact(version) => write!(f, "={}", version),
            Query::Single(bound) => write!(f, "{}", bound),
            Query::Dual { lower, upper } => write!(f, "{} {}", lower, upper),
            Query::List(queries) => {
                for (index, query) in queries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" || ")?;
                    }
                    write!(f, "{}", query)?;
                }
                Ok(())
            },
        }
    }
}

impl std::str::FromStr for Query {
    type Err = BrickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_constraint(s)
    }
}

/// Parse a constraint expression into its normalized query
pub fn parse_constraint(input: &str) -> BrickResult<Query> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Query::any());
    }

    let mut queries = trimmed
        .split("||")
        .map(str::trim)
        .filter(|alternative| !alternative.is_empty())
        .map(|alternative| parse_range(input, alternative))
        .collect::<BrickResult<Vec<_>>>()?;

    match queries.len() {
        0 => Err(invalid(input, "no alternatives between '||'")),
        1 => Ok(queries.remove(0)),
        _ => Ok(Query::List(queries)),
    }
}

fn invalid(input: &str, reason: impl Into<String>) -> BrickError {
    BrickError::InvalidConstraint {
        input: input.to_string(),
        reason: reason.into(),
    }
}

const OPERATORS: [&str; 8] = [">=", "<=", ">", "<", "=", "~>", "~", "^"];

/// Parse one `||` alternative: a hyphen range or an AND of terms
fn parse_range(input: &str, range: &str) -> BrickResult<Query> {
    let tokens: Vec<&str> = range.split_whitespace().collect();

    if let Some(position) = tokens.iter().position(|token| *token == "-") {
        if position != 1 || tokens.len() != 3 {
            return Err(invalid(input, "hyphen ranges take the form 'A - B'"));
        }
        let term = parse_hyphen(input, tokens[0], tokens[2])?;
        return Ok(combine(vec![term]));
    }

    // Operators may be separated from their version by whitespace (">= 1.2").
    let mut terms = Vec::new();
    let mut pending: Option<&str> = None;
    for token in tokens {
        if OPERATORS.contains(&token) {
            if pending.is_some() {
                return Err(invalid(input, format!("operator '{}' without a version", token)));
            }
            pending = Some(token);
            continue;
        }
        let term = match pending.take() {
            Some(op) => parse_term(input, &format!("{}{}", op, token))?,
            None => parse_term(input, token)?,
        };
        terms.push(term);
    }
    if let Some(op) = pending {
        return Err(invalid(input, format!("operator '{}' without a version", op)));
    }

    Ok(combine(terms))
}

fn parse_partial_term(input: &str, text: &str) -> BrickResult<PartialVersion> {
    PartialVersion::parse(text).map_err(|reason| invalid(input, reason))
}

/// Component one past `value`; the largest component has no successor
fn bump(input: &str, value: Option<u64>) -> BrickResult<u64> {
    value
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| invalid(input, "version component too large for a range bound"))
}

fn next_major(input: &str, p: &PartialVersion) -> BrickResult<Version> {
    Ok(Version::new(bump(input, p.major)?, 0, 0))
}

fn next_minor(input: &str, p: &PartialVersion) -> BrickResult<Version> {
    Ok(Version::new(p.major.unwrap_or(0), bump(input, p.minor)?, 0))
}

fn next_patch(input: &str, p: &PartialVersion) -> BrickResult<Version> {
    Ok(Version::new(
        p.major.unwrap_or(0),
        p.minor.unwrap_or(0),
        bump(input, p.patch)?,
    ))
}

/// Range covering the precision a partial version leaves open
fn partial_range(input: &str, p: &PartialVersion) -> BrickResult<Term> {
    let ceiling = match (p.major, p.minor, p.patch) {
        (None, _, _) => return Ok(Term::Any),
        (Some(_), Some(_), Some(_)) => return Ok(Term::Exact(p.to_version())),
        (Some(_), None, _) => next_major(input, p)?,
        (Some(_), Some(_), None) => next_minor(input, p)?,
    };
    Ok(Term::Range(Some(Bound::at_least(p.to_version())), Some(Bound::below(ceiling))))
}

fn nothing() -> Term {
    Term::Range(None, Some(Bound::below(Version::new(0, 0, 0))))
}

fn parse_term(input: &str, token: &str) -> BrickResult<Term> {
    let (op, rest) = OPERATORS
        .iter()
        .find_map(|op| token.strip_prefix(op).map(|rest| (*op, rest)))
        .unwrap_or(("", token));
    let p = parse_partial_term(input, rest)?;
    let lower = |version: Version| Term::Range(Some(Bound::at_least(version)), None);
    let upper = |bound: Bound| Term::Range(None, Some(bound));

    let term = match op {
        "" | "=" => partial_range(input, &p)?,
        ">=" => match p.major {
            None => Term::Any,
            Some(_) => lower(p.to_version()),
        },
        ">" => match (p.major, p.minor, p.patch) {
            (None, _, _) => nothing(),
            (Some(_), None, _) => lower(next_major(input, &p)?),
            (Some(_), Some(_), None) => lower(next_minor(input, &p)?),
            (Some(_), Some(_), Some(_)) => {
                Term::Range(Some(Bound::new(Op::Greater, p.to_version())), None)
            },
        },
        "<" => match p.major {
            None => nothing(),
            Some(_) => upper(Bound::below(p.to_version())),
        },
        "<=" => match (p.major, p.minor, p.patch) {
            (None, _, _) => Term::Any,
            (Some(_), None, _) => upper(Bound::below(next_major(input, &p)?)),
            (Some(_), Some(_), None) => upper(Bound::below(next_minor(input, &p)?)),
            (Some(_), Some(_), Some(_)) => upper(Bound::new(Op::LessEq, p.to_version())),
        },
        "~" | "~>" => match (p.major, p.minor) {
            (None, _) => Term::Any,
            (Some(_), None) => partial_range(input, &p)?,
            (Some(_), Some(_)) => Term::Range(
                Some(Bound::at_least(p.to_version())),
                Some(Bound::below(next_minor(input, &p)?)),
            ),
        },
        "^" => caret(input, &p)?,
        other => return Err(invalid(input, format!("unknown operator '{}'", other))),
    };
    Ok(term)
}

/// Caret ranges allow changes that do not modify the left-most non-zero
/// component.
fn caret(input: &str, p: &PartialVersion) -> BrickResult<Term> {
    let ceiling = match (p.major, p.minor, p.patch) {
        (None, _, _) => return Ok(Term::Any),
        (Some(_), None, _) => next_major(input, p)?,
        (Some(0), Some(_), None) => next_minor(input, p)?,
        (Some(_), Some(_), None) => next_major(input, p)?,
        (Some(0), Some(0), Some(_)) => next_patch(input, p)?,
        (Some(0), Some(_), Some(_)) => next_minor(input, p)?,
        (Some(_), Some(_), Some(_)) => next_major(input, p)?,
    };
    Ok(Term::Range(Some(Bound::at_least(p.to_version())), Some(Bound::below(ceiling))))
}

fn parse_hyphen(input: &str, from: &str, to: &str) -> BrickResult<Term> {
    let from = parse_partial_term(input, from)?;
    let to = parse_partial_term(input, to)?;

    let lower = from.major.map(|_| Bound::at_least(from.to_version()));
    let upper = match (to.major, to.minor, to.patch) {
        (None, _, _) => None,
        (Some(_), None, _) => Some(Bound::below(next_major(input, &to)?)),
        (Some(_), Some(_), None) => Some(Bound::below(next_minor(input, &to)?)),
        (Some(_), Some(_), Some(_)) => Some(Bound::new(Op::LessEq, to.to_version())),
    };
    Ok(Term::Range(lower, upper))
}

/// AND together the terms of one alternative
fn combine(terms: Vec<Term>) -> Query {
    let mut lower: Option<Bound> = None;
    let mut upper: Option<Bound> = None;
    let mut exact: Option<Version> = None;
    let mut conflicting_exact = false;

    for term in terms {
        match term {
            Term::Any => {},
            Term::Exact(version) => match &exact {
                Some(existing) if existing.cmp_precedence(&version) != Ordering::Equal => {
                    conflicting_exact = true;
                },
                _ => exact = Some(version),
            },
            Term::Range(low, high) => {
                if let Some(low) = low {
                    debug_assert!(low.op.is_lower());
                    lower = Some(match lower {
                        Some(current) => current.tighter_lower(low),
                        None => low,
                    });
                }
                if let Some(high) = high {
                    upper = Some(match upper {
                        Some(current) => current.tighter_upper(high),
                        None => high,
                    });
                }
            },
        }
    }

    if let Some(version) = exact {
        let within = lower.as_ref().map_or(true, |bound| bound.matches(&version))
            && upper.as_ref().map_or(true, |bound| bound.matches(&version));
        if within && !conflicting_exact {
            return Query::Exact(version);
        }
        // Unsatisfiable conjunction: an empty interval.
        return Query::Dual {
            lower: Bound::at_least(version.clone()),
            upper: Bound::below(version),
        };
    }

    match (lower, upper) {
        (Some(lower), Some(upper)) => Query::Dual { lower, upper },
        (Some(bound), None) | (None, Some(bound)) => Query::Single(bound),
        (None, None) => Query::any(),
    }
}
