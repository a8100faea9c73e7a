use crate::policy::UpdateTarget;

/// Merge vulnerable packages with the ones the user asked to update.
///
/// No explicit request yields an empty list, which callers read as "update everything".
/// Otherwise vulnerable entries survive only when requested (keeping their target), followed
/// by the remaining requested names without a target.
pub fn reconcile(vulnerable: &[UpdateTarget], requested: &[String]) -> Vec<UpdateTarget> {
    if requested.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<UpdateTarget> = Vec::new();
    for target in vulnerable {
        let name = target.name();
        if requested.iter().any(|r| r == name) && !out.iter().any(|t| t.name() == name) {
            out.push(target.clone());
        }
    }
    for name in requested {
        if !out.iter().any(|t| t.name() == name) {
            out.push(UpdateTarget::NameOnly(name.clone()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;

    fn names(targets: &[UpdateTarget]) -> Vec<&str> {
        targets.iter().map(|t| t.name()).collect()
    }

    fn foo() -> UpdateTarget {
        UpdateTarget::NameWithVersion("foo".to_string(), Version::parse("1.2.4").unwrap())
    }

    #[test]
    fn nothing_requested_means_everything() {
        assert!(reconcile(&[foo()], &[]).is_empty());
        assert!(reconcile(&[], &[]).is_empty());
    }

    #[test]
    fn unrequested_vulnerable_gems_are_dropped() {
        let out = reconcile(&[foo()], &["bar".to_string()]);
        assert_eq!(names(&out), vec!["bar"]);
        assert_eq!(out[0].version(), None);
    }

    #[test]
    fn requested_vulnerable_gem_keeps_its_target() {
        let out = reconcile(&[foo()], &["foo".to_string(), "bar".to_string()]);
        assert_eq!(names(&out), vec!["foo", "bar"]);
        assert_eq!(out[0], foo());
    }

    #[test]
    fn vulnerable_entries_come_first_and_duplicates_collapse() {
        let requested = vec!["bar".to_string(), "foo".to_string(), "bar".to_string()];
        let out = reconcile(&[foo()], &requested);
        assert_eq!(names(&out), vec!["foo", "bar"]);
    }

    #[test]
    fn no_vulnerable_gems_keeps_requests() {
        let out = reconcile(&[], &["bar".to_string()]);
        assert_eq!(names(&out), vec!["bar"]);
    }
}
