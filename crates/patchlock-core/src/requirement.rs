//! Version requirements: one or more `(operator, version)` pairs that must all hold.
//! Written as `">= 1.2, < 2"`, `"~> 1.4.5"` or a bare version meaning `"= version"`.

use std::fmt;
use std::str::FromStr;

use pubgrub::Ranges;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PatchError, PatchResult};
use crate::version::Version;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// `~>`: at least the version, below its bump.
    Compatible,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Compatible => "~>",
        }
    }

    fn matches(self, candidate: &Version, bound: &Version) -> bool {
        match self {
            Op::Eq => candidate == bound,
            Op::Ne => candidate != bound,
            Op::Gt => candidate > bound,
            Op::Ge => candidate >= bound,
            Op::Lt => candidate < bound,
            Op::Le => candidate <= bound,
            Op::Compatible => candidate >= bound && bound.bump().map_or(true, |upper| *candidate < upper),
        }
    }
}

/// Longest symbols first so `>=` is not read as `>`.
const OPS: [(&str, Op); 7] = [
    ("~>", Op::Compatible),
    (">=", Op::Ge),
    ("<=", Op::Le),
    ("!=", Op::Ne),
    (">", Op::Gt),
    ("<", Op::Lt),
    ("=", Op::Eq),
];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Requirement {
    pairs: Vec<(Op, Version)>,
}

impl Requirement {
    pub fn parse(input: &str) -> PatchResult<Requirement> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(Requirement::any());
        }
        let mut pairs = Vec::new();
        for clause in text.split(',') {
            pairs.push(parse_clause(input, clause)?);
        }
        Ok(Requirement { pairs })
    }

    /// `>= 0`, satisfied by every version.
    pub fn any() -> Requirement {
        Requirement {
            pairs: vec![(Op::Ge, Version::from_segments(&[0]))],
        }
    }

    /// Both requirements at once.
    pub fn and(&self, other: &Requirement) -> Requirement {
        let mut pairs = self.pairs.clone();
        pairs.extend(other.pairs.iter().cloned());
        Requirement { pairs }
    }

    pub fn pairs(&self) -> &[(Op, Version)] {
        &self.pairs
    }

    pub fn is_compound(&self) -> bool {
        self.pairs.len() > 1
    }

    /// A single `= version` pin.
    pub fn is_exact(&self) -> bool {
        matches!(self.pairs.as_slice(), [(Op::Eq, _)])
    }

    pub fn is_compatible_release(&self) -> bool {
        self.pairs.iter().any(|(op, _)| *op == Op::Compatible)
    }

    pub fn satisfied_by(&self, version: &Version) -> bool {
        self.pairs.iter().all(|(op, bound)| op.matches(version, bound))
    }

    /// Versions named by the pairs, in written order.
    pub fn bound_versions(&self) -> impl Iterator<Item = &Version> {
        self.pairs.iter().map(|(_, v)| v)
    }

    /// Same set of versions expressed as solver ranges.
    pub fn to_ranges(&self) -> Ranges<Version> {
        self.pairs
            .iter()
            .fold(Ranges::full(), |acc, (op, v)| acc.intersection(&op_ranges(*op, v)))
    }
}

fn op_ranges(op: Op, v: &Version) -> Ranges<Version> {
    match op {
        Op::Eq => Ranges::singleton(v.clone()),
        Op::Ne => Ranges::singleton(v.clone()).complement(),
        Op::Gt => Ranges::strictly_higher_than(v.clone()),
        Op::Ge => Ranges::higher_than(v.clone()),
        Op::Lt => Ranges::strictly_lower_than(v.clone()),
        Op::Le => Ranges::lower_than(v.clone()),
        Op::Compatible => match v.bump() {
            Some(upper) => Ranges::between(v.clone(), upper),
            None => Ranges::higher_than(v.clone()),
        },
    }
}

fn parse_clause(input: &str, clause: &str) -> PatchResult<(Op, Version)> {
    let clause = clause.trim();
    if clause.is_empty() {
        return Err(PatchError::Requirement {
            input: input.to_string(),
            reason: "empty clause".to_string(),
        });
    }
    let (op, rest) = OPS
        .iter()
        .find_map(|(sym, op)| clause.strip_prefix(sym).map(|rest| (*op, rest)))
        .unwrap_or((Op::Eq, clause));
    let version = Version::parse(rest).map_err(|e| PatchError::Requirement {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    Ok((op, version))
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .pairs
            .iter()
            .map(|(op, v)| format!("{} {}", op.symbol(), v))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for Requirement {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}

impl Serialize for Requirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Requirement::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn req(s: &str) -> Requirement {
        Requirement::parse(s).unwrap()
    }

    #[test]
    fn compatible_release_bounds() {
        let r = req("~> 1.4.5");
        assert!(r.is_compatible_release());
        assert!(r.satisfied_by(&v("1.4.5")));
        assert!(r.satisfied_by(&v("1.4.99")));
        assert!(!r.satisfied_by(&v("1.5.0")));
        assert!(!r.satisfied_by(&v("1.4.4")));

        let r = req("~> 2.1");
        assert!(r.satisfied_by(&v("2.9.0")));
        assert!(!r.satisfied_by(&v("3.0")));
    }

    #[test]
    fn compound_requirements_are_anded() {
        let r = req(">= 1.2, < 2");
        assert!(r.is_compound());
        assert!(r.satisfied_by(&v("1.9.9")));
        assert!(!r.satisfied_by(&v("2.0.0")));
        assert!(!r.satisfied_by(&v("1.1")));
    }

    #[test]
    fn bare_version_is_exact_pin() {
        let r = req("1.7.8");
        assert!(r.is_exact());
        assert!(r.satisfied_by(&v("1.7.8.0")));
        assert!(!r.satisfied_by(&v("1.7.9")));
        assert!(req("= 1.7.8").is_exact());
        assert!(!req(">= 1.7.8").is_exact());
    }

    #[test]
    fn operators_and_whitespace() {
        assert!(req(">1.0").satisfied_by(&v("1.0.1")));
        assert!(!req("> 1.0").satisfied_by(&v("1.0")));
        assert!(req("<= 1.0").satisfied_by(&v("1.0")));
        assert!(req("!= 1.5").satisfied_by(&v("1.6")));
        assert!(!req("!= 1.5").satisfied_by(&v("1.5.0")));
        assert!(req("").satisfied_by(&v("0.0.1")));
    }

    #[test]
    fn ranges_agree_with_satisfied_by() {
        let candidates = ["0.9", "1.2", "1.4.5", "1.4.9", "1.5.0", "2.0.0", "2.0.1"];
        for text in ["~> 1.4.5", ">= 1.2, < 2", "!= 2.0.0", "= 1.5", "> 1.4.9", "<= 1.2"] {
            let r = req(text);
            let ranges = r.to_ranges();
            for c in candidates {
                assert_eq!(
                    ranges.contains(&v(c)),
                    r.satisfied_by(&v(c)),
                    "{text} vs {c}"
                );
            }
        }
    }

    #[test]
    fn compatible_release_at_segment_limit_is_open_ended() {
        let r = req("~> 18446744073709551615");
        let ranges = r.to_ranges();
        assert!(ranges.contains(&v("18446744073709551615")));
        assert!(ranges.contains(&v("18446744073709551615.7")));
        assert!(!ranges.contains(&v("2.0")));
        assert!(r.satisfied_by(&v("18446744073709551615.7")));
        assert!(!r.satisfied_by(&v("2.0")));

        let r = req("~> 1.18446744073709551615.0");
        assert!(r.to_ranges().contains(&v("1.18446744073709551615.4")));
        assert!(r.satisfied_by(&v("1.18446744073709551615.4")));
    }

    #[test]
    fn malformed_requirement_reports_input() {
        let err = Requirement::parse(">= 1.x$").unwrap_err();
        match err {
            PatchError::Requirement { input, .. } => assert_eq!(input, ">= 1.x$"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(Requirement::parse(">= 1.0,").is_err());
    }

    #[test]
    fn display_round_trips() {
        let r = req("~>1.4.5,>=1.5.2");
        assert_eq!(r.to_string(), "~> 1.4.5, >= 1.5.2");
        assert_eq!(req(&r.to_string()), r);
    }
}
