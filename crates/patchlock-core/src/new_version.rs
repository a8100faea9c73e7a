use crate::version::Version;

/// Next version to move `old` to, given the versions that fix a vulnerability.
///
/// Returns `old` when it already is a patched version. Otherwise the smallest patched
/// version above `old` on the same major line; `None` when reaching one needs a major bump.
pub fn calc_new_version(old: &Version, patched: &[Version]) -> Option<Version> {
    if patched.contains(old) {
        return Some(old.clone());
    }
    patched
        .iter()
        .filter(|p| p.major() == old.major() && *p > old)
        .min()
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn next(old: &str, patched: &[&str]) -> Option<String> {
        let patched: Vec<Version> = patched.iter().map(|p| v(p)).collect();
        calc_new_version(&v(old), &patched).map(|n| n.to_string())
    }

    const RUBY_PATCHED: [&str; 2] = ["1.9.3-p550", "2.1.4"];

    #[test]
    fn moves_to_next_patched_release_on_same_major() {
        for old in ["1.7", "1.8", "1.9", "1.9.3-p484"] {
            assert_eq!(next(old, &RUBY_PATCHED).as_deref(), Some("1.9.3-p550"), "{old}");
        }
        for old in ["2", "2.0.0-p95", "2.1.2"] {
            assert_eq!(next(old, &RUBY_PATCHED).as_deref(), Some("2.1.4"), "{old}");
        }
    }

    #[test]
    fn already_patched_is_unchanged() {
        assert_eq!(next("2.1.4", &RUBY_PATCHED).as_deref(), Some("2.1.4"));
        assert_eq!(next("3.2.22.2", &["3.2.22.2"]).as_deref(), Some("3.2.22.2"));
    }

    #[test]
    fn longer_segments_compare_numerically() {
        assert_eq!(next("3.2.2", &["3.2.22.2"]).as_deref(), Some("3.2.22.2"));
    }

    #[test]
    fn never_crosses_a_major_line() {
        assert_eq!(next("2.4", &["3.1.1"]), None);
        assert_eq!(next("2.2", &RUBY_PATCHED), None);
    }
}
