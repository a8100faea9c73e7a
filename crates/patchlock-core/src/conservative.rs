//! Conservative candidate lookup: wraps a raw [`CandidateSource`] and applies the
//! update policy to every list before the solver sees it.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::candidates::{filter_specs, sort_specs};
use crate::index::{CandidateSource, LockedSpecs, SpecGroup};
use crate::policy::UpdatePolicy;
use crate::utils;

/// Built fresh for each resolution run.
///
/// Results are memoized per package name. Every call hands out a clone of the memo
/// entry, so a caller that sorts or truncates its copy cannot change what the next
/// lookup returns.
pub struct ConservativeSearch<'a, S> {
    source: S,
    locked: &'a LockedSpecs,
    policy: &'a UpdatePolicy,
    memo: RefCell<HashMap<String, Vec<SpecGroup>>>,
}

impl<'a, S: CandidateSource> ConservativeSearch<'a, S> {
    pub fn new(source: S, locked: &'a LockedSpecs, policy: &'a UpdatePolicy) -> Self {
        Self {
            source,
            locked,
            policy,
            memo: RefCell::new(HashMap::new()),
        }
    }

    fn compute(&self, name: &str) -> Vec<SpecGroup> {
        let raw = self.source.search_for(name);
        let unlocking = self.policy.is_unlocking(name);
        let locked = self.locked.version_of(name);

        let result = if self.policy.strict {
            filter_specs(raw, name, unlocking, locked, self.policy)
        } else {
            sort_specs(raw, name, unlocking, locked, self.policy)
        };

        if utils::resolver_dump_enabled() {
            utils::log_debug(&dump(name, locked.map(|v| v.to_string()), &result));
        }
        result
    }
}

impl<'a, S: CandidateSource> CandidateSource for ConservativeSearch<'a, S> {
    fn search_for(&self, name: &str) -> Vec<SpecGroup> {
        if let Some(hit) = self.memo.borrow().get(name) {
            return hit.clone();
        }
        let result = self.compute(name);
        self.memo
            .borrow_mut()
            .insert(name.to_string(), result.clone());
        result
    }
}

/// `rack (locked 1.4.5): 1.5.2 [rack-test >= 0] | 1.4.7 []`
fn dump(name: &str, locked: Option<String>, result: &[SpecGroup]) -> String {
    if result.is_empty() {
        return format!(
            "{} (locked {}): no candidates left",
            name,
            locked.as_deref().unwrap_or("none")
        );
    }
    let entries: Vec<String> = result
        .iter()
        .map(|group| {
            let deps: Vec<String> = group
                .dependencies()
                .iter()
                .map(|(dep, req)| format!("{} {}", dep, req))
                .collect();
            format!("{} [{}]", group.version, deps.join(", "))
        })
        .collect();
    format!(
        "{} (locked {}): {}",
        name,
        locked.as_deref().unwrap_or("none"),
        entries.join(" | ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{LockedSpec, PackageIndex};
    use crate::policy::UpdateTarget;
    use crate::version::Version;
    use std::cell::Cell;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn index(name: &str, versions: &[&str]) -> PackageIndex {
        let mut index = PackageIndex::new();
        for ver in versions {
            index.add(name, v(ver), "ruby", vec![]);
        }
        index
    }

    fn listed(groups: &[SpecGroup]) -> Vec<String> {
        groups.iter().map(|g| g.version.to_string()).collect()
    }

    struct Counting<'a> {
        inner: &'a PackageIndex,
        calls: Cell<usize>,
    }

    impl CandidateSource for Counting<'_> {
        fn search_for(&self, name: &str) -> Vec<SpecGroup> {
            self.calls.set(self.calls.get() + 1);
            self.inner.search_for(name)
        }
    }

    #[test]
    fn mutating_a_result_does_not_leak_into_the_next_lookup() {
        let index = index("foo", &["1.7.8", "1.7.9", "1.8.0"]);
        let locked: LockedSpecs = vec![LockedSpec::new("foo", v("1.7.8"))].into_iter().collect();
        let policy = UpdatePolicy::new();
        let search = ConservativeSearch::new(&index, &locked, &policy);

        let mut first = search.search_for("foo");
        assert_eq!(listed(&first), vec!["1.8.0", "1.7.8", "1.7.9"]);
        first.retain(|g| g.version == v("1.7.8"));
        first.reverse();
        first.clear();

        let second = search.search_for("foo");
        assert_eq!(listed(&second), vec!["1.8.0", "1.7.8", "1.7.9"]);
    }

    #[test]
    fn repeated_lookups_hit_the_memo() {
        let raw = index("foo", &["1.7.8", "1.7.9"]);
        let counting = Counting {
            inner: &raw,
            calls: Cell::new(0),
        };
        let locked = LockedSpecs::new();
        let policy = UpdatePolicy::new();
        let search = ConservativeSearch::new(&counting, &locked, &policy);
        for _ in 0..3 {
            assert_eq!(search.search_for("foo").len(), 2);
        }
        assert_eq!(counting.calls.get(), 1);
    }

    #[test]
    fn strict_policy_filters_and_unlock_set_is_respected() {
        let index = index("foo", &["1.7.8", "1.7.9", "1.8.0"]);
        let locked: LockedSpecs = vec![LockedSpec::new("foo", v("1.7.8"))].into_iter().collect();

        let keep = UpdatePolicy::for_targets(vec![UpdateTarget::NameOnly("bar".to_string())])
            .with_strict(true);
        let search = ConservativeSearch::new(&index, &locked, &keep);
        assert_eq!(listed(&search.search_for("foo")), vec!["1.7.9", "1.7.8"]);

        let unlock = UpdatePolicy::for_targets(vec![UpdateTarget::NameOnly("foo".to_string())])
            .with_strict(true);
        let search = ConservativeSearch::new(&index, &locked, &unlock);
        assert_eq!(listed(&search.search_for("foo")), vec!["1.7.8", "1.7.9"]);
    }

    #[test]
    fn unlocked_new_dependency_keeps_index_order() {
        let index = index("fresh", &["0.1.0", "0.2.0"]);
        let locked = LockedSpecs::new();
        let policy = UpdatePolicy::new().with_strict(true);
        let search = ConservativeSearch::new(&index, &locked, &policy);
        assert_eq!(listed(&search.search_for("fresh")), vec!["0.1.0", "0.2.0"]);
        assert!(search.search_for("missing").is_empty());
    }

    #[test]
    fn dump_lists_versions_and_dependencies() {
        let mut index = PackageIndex::new();
        index.add(
            "rack",
            v("1.5.2"),
            "ruby",
            vec![crate::index::Dependency::new(
                "rack-test",
                crate::requirement::Requirement::any(),
            )],
        );
        let line = dump("rack", Some("1.4.5".to_string()), &index.search_for("rack"));
        assert_eq!(line, "rack (locked 1.4.5): 1.5.2 [rack-test >= 0]");
        assert_eq!(dump("rack", None, &[]), "rack (locked none): no candidates left");
    }
}
