//! Version model: dot-separated numeric segments plus an optional suffix.
//!
//! Accepted forms: `2`, `1.7.8`, `3.2.22.2`, `1.0.0.beta.2`, `1.0.0-rc1`, `1.9.3-p550`.
//! A pre-release suffix sorts before the plain release, a `-pNNN` patch level sorts after it.
//! Missing trailing segments compare as zero, so `2.0` and `2.0.0` are the same version.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PatchError, PatchResult};

/// One identifier of a pre-release suffix. Alphabetic identifiers sort before numeric ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreIdent {
    Alpha(String),
    Num(u64),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Suffix {
    /// `1.0.0.beta.2`, `2.0.0-rc1`
    Pre(Vec<PreIdent>),
    /// `1.9.3-p550`
    PatchLevel(u64),
}

impl Suffix {
    fn rank(&self) -> u8 {
        match self {
            Suffix::Pre(_) => 0,
            Suffix::PatchLevel(_) => 2,
        }
    }
}

/// Immutable parsed version. Display returns the text it was parsed from.
#[derive(Clone, Debug)]
pub struct Version {
    segments: Vec<u64>,
    suffix: Option<Suffix>,
    text: String,
}

impl Version {
    pub fn parse(input: &str) -> PatchResult<Version> {
        let text = input.trim();
        let fail = |reason: String| PatchError::Version {
            input: input.to_string(),
            reason,
        };
        if text.is_empty() {
            return Err(fail("empty version".to_string()));
        }
        if let Some(c) = text
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
        {
            return Err(fail(format!("unexpected character '{}'", c)));
        }

        let (main, dashed) = match text.split_once('-') {
            Some((m, s)) => (m, Some(s)),
            None => (text, None),
        };

        let mut segments = Vec::new();
        let mut pre = Vec::new();
        for part in main.split('.') {
            if part.is_empty() {
                return Err(fail("empty segment".to_string()));
            }
            if pre.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                let n = part
                    .parse::<u64>()
                    .map_err(|e| fail(format!("segment '{}': {}", part, e)))?;
                segments.push(n);
            } else {
                pre.extend(split_ident(part));
            }
        }
        if segments.is_empty() {
            return Err(fail("version must start with a number".to_string()));
        }

        let suffix = match dashed {
            None if pre.is_empty() => None,
            None => Some(Suffix::Pre(pre)),
            Some(s) if s.is_empty() => return Err(fail("empty suffix".to_string())),
            Some(s) => {
                if !pre.is_empty() {
                    return Err(fail("pre-release given twice".to_string()));
                }
                match patch_level(s) {
                    Some(level) => Some(Suffix::PatchLevel(level)),
                    None => {
                        let mut idents = Vec::new();
                        for part in s.split(['.', '-']) {
                            if part.is_empty() {
                                return Err(fail("empty suffix identifier".to_string()));
                            }
                            idents.extend(split_ident(part));
                        }
                        Some(Suffix::Pre(idents))
                    }
                }
            }
        };

        Ok(Version {
            segments,
            suffix,
            text: text.to_string(),
        })
    }

    /// Numeric release segments as written (no zero padding).
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Segment at `idx`, zero when the version is shorter.
    pub fn segment(&self, idx: usize) -> u64 {
        self.segments.get(idx).copied().unwrap_or(0)
    }

    pub fn major(&self) -> u64 {
        self.segment(0)
    }

    pub fn minor(&self) -> u64 {
        self.segment(1)
    }

    pub fn suffix(&self) -> Option<&Suffix> {
        self.suffix.as_ref()
    }

    pub fn is_prerelease(&self) -> bool {
        matches!(self.suffix, Some(Suffix::Pre(_)))
    }

    /// True when every segment listed in `indices` is equal in both versions.
    pub fn segments_match(&self, other: &Version, indices: &[usize]) -> bool {
        indices.iter().all(|&i| self.segment(i) == other.segment(i))
    }

    /// Upper bound of a compatible-release requirement: drop the last segment
    /// (unless it is the only one) and increment the new last one. `1.2.3` -> `1.3`, `2` -> `3`.
    /// `None` when that segment is already `u64::MAX`: the line has no upper bound.
    pub fn bump(&self) -> Option<Version> {
        let mut segments = self.segments.clone();
        if segments.len() > 1 {
            segments.pop();
        }
        if let Some(last) = segments.last_mut() {
            *last = last.checked_add(1)?;
        }
        Some(Version::from_segments(&segments))
    }

    pub fn from_segments(segments: &[u64]) -> Version {
        let text = segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Version {
            segments: segments.to_vec(),
            suffix: None,
            text,
        }
    }

    /// Segments with trailing zeros removed; equal versions share this form.
    fn canonical_segments(&self) -> &[u64] {
        let end = self
            .segments
            .iter()
            .rposition(|&s| s != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.segments[..end]
    }
}

fn patch_level(s: &str) -> Option<u64> {
    let digits = s.strip_prefix('p')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Split `rc12` into `rc`, `12` so numeric parts compare numerically.
fn split_ident(part: &str) -> Vec<PreIdent> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;
    for c in part.chars() {
        let digit = c.is_ascii_digit();
        if !current.is_empty() && digit != in_digits {
            out.push(make_ident(&current, in_digits));
            current.clear();
        }
        in_digits = digit;
        current.push(c);
    }
    if !current.is_empty() {
        out.push(make_ident(&current, in_digits));
    }
    out
}

fn make_ident(s: &str, digits: bool) -> PreIdent {
    if digits {
        if let Ok(n) = s.parse::<u64>() {
            return PreIdent::Num(n);
        }
    }
    PreIdent::Alpha(s.to_ascii_lowercase())
}

fn cmp_suffix(a: Option<&Suffix>, b: Option<&Suffix>) -> Ordering {
    let rank = |s: Option<&Suffix>| s.map(Suffix::rank).unwrap_or(1);
    match (a, b) {
        (Some(Suffix::Pre(x)), Some(Suffix::Pre(y))) => x.cmp(y),
        (Some(Suffix::PatchLevel(x)), Some(Suffix::PatchLevel(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        cmp_suffix(self.suffix.as_ref(), other.suffix.as_ref())
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

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_segments().hash(state);
        self.suffix.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Version {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parses_plain_and_short_versions() {
        assert_eq!(v("1.7.8").segments(), &[1, 7, 8]);
        assert_eq!(v("2").segments(), &[2]);
        assert_eq!(v("3.2.22.2").segments(), &[3, 2, 22, 2]);
        assert_eq!(v(" 2.4 ").to_string(), "2.4");
    }

    #[test]
    fn trailing_zeros_do_not_change_identity() {
        assert_eq!(v("2"), v("2.0.0"));
        let mut set = std::collections::HashSet::new();
        set.insert(v("2.0"));
        assert!(set.contains(&v("2.0.0")));
    }

    #[test]
    fn prerelease_sorts_before_release_and_patch_level_after() {
        assert!(v("1.0.0.beta") < v("1.0.0"));
        assert!(v("1.0.0-rc1") < v("1.0.0-rc2"));
        assert!(v("1.0.0.beta.2") < v("1.0.0.beta.10"));
        assert!(v("1.0.0.alpha") < v("1.0.0.beta"));
        assert!(v("1.9.3") < v("1.9.3-p484"));
        assert!(v("1.9.3-p484") < v("1.9.3-p550"));
        assert!(v("1.9.3-p550") < v("1.9.4"));
        assert!(v("1.0.0.beta").is_prerelease());
        assert!(!v("1.9.3-p550").is_prerelease());
    }

    #[test]
    fn numeric_segments_compare_numerically() {
        assert!(v("1.7.9") < v("1.7.10"));
        assert!(v("3.2.2") < v("3.2.22.2"));
        assert!(v("0.9.0") < v("1.0.0"));
    }

    #[test]
    fn segments_match_pads_with_zero() {
        assert!(v("1.7").segments_match(&v("1.7.9"), &[0, 1]));
        assert!(!v("1.8.0").segments_match(&v("1.7.8"), &[0, 1]));
        assert!(v("1.8.0").segments_match(&v("1.7.8"), &[0]));
    }

    #[test]
    fn bump_drops_last_segment_and_increments() {
        assert_eq!(v("1.2.3").bump().unwrap().to_string(), "1.3");
        assert_eq!(v("1.2").bump().unwrap().to_string(), "2");
        assert_eq!(v("2").bump().unwrap().to_string(), "3");
        assert_eq!(v("1.2.3.beta").bump().unwrap().to_string(), "1.3");
        assert_eq!(v("18446744073709551615").bump(), None);
        assert_eq!(v("1.18446744073709551615.3").bump(), None);
        assert_eq!(v("18446744073709551615.2").bump(), None);
        assert_eq!(v("3.18446744073709551615").bump().unwrap().to_string(), "4");
    }

    #[test]
    fn malformed_versions_fail_fast() {
        for bad in ["", "abc", "1..2", "1.2.", "1.x$", "1.0-", "-1"] {
            let err = Version::parse(bad).unwrap_err();
            assert!(matches!(err, PatchError::Version { .. }), "{bad} should fail");
        }
    }

    #[test]
    fn serde_uses_original_text() {
        let json = serde_json::to_string(&v("1.9.3-p550")).unwrap();
        assert_eq!(json, "\"1.9.3-p550\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.9.3-p550"));
        assert!(serde_json::from_str::<Version>("\"nope\"").is_err());
    }
}
