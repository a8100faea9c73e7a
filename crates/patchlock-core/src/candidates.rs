//! Candidate filtering and ordering for one dependency.
//!
//! Every list here is least-preferred-first: the solver tries the last element first.
//! Both entry points take ownership of the candidate list and return a subset of it,
//! reordered; nothing outside the list is read or written.

use std::cmp::Ordering;

use crate::index::SpecGroup;
use crate::policy::UpdatePolicy;
use crate::utils;
use crate::version::Version;

/// Anything ordered by a single version: bare versions in tests, spec groups in the solver.
pub trait Versioned {
    fn version(&self) -> &Version;
}

impl Versioned for Version {
    fn version(&self) -> &Version {
        self
    }
}

impl Versioned for SpecGroup {
    fn version(&self) -> &Version {
        &self.version
    }
}

/// Strict mode: drop every candidate outside the segment window of the locked version
/// (or below it), then order the survivors like [`sort_specs`].
///
/// May return an empty list; the solver reports that as an unsatisfiable constraint.
pub fn filter_specs<T: Versioned>(
    specs: Vec<T>,
    name: &str,
    unlocking: bool,
    locked: Option<&Version>,
    policy: &UpdatePolicy,
) -> Vec<T> {
    let specs = match locked {
        Some(locked) => {
            let window: &[usize] = if policy.minor_allowed { &[0] } else { &[0, 1] };
            specs
                .into_iter()
                .filter(|s| {
                    let v = s.version();
                    v.segments_match(locked, window) && v >= locked
                })
                .collect()
        }
        None => specs,
    };
    sort_specs(specs, name, unlocking, locked, policy)
}

/// Non-strict mode: drop candidates below the locked version, sort the rest so that
/// conservative choices come last, then pin the locked (or target) version to the end.
///
/// Without a locked version the input is returned untouched.
pub fn sort_specs<T: Versioned>(
    specs: Vec<T>,
    name: &str,
    unlocking: bool,
    locked: Option<&Version>,
    policy: &UpdatePolicy,
) -> Vec<T> {
    let locked = match locked {
        Some(locked) => locked,
        None => return specs,
    };
    let target = policy.target_version_for(name);

    let mut result: Vec<T> = specs
        .into_iter()
        .filter(|s| s.version() >= locked)
        .collect();

    let oldest_first =
        (policy.prefer_minimal && !unlocking) || policy.is_patching_but_not_this_gem(name);

    result.sort_by(|a, b| {
        compare(
            a.version(),
            b.version(),
            locked,
            target,
            unlocking,
            oldest_first,
            policy,
        )
    });

    if unlocking {
        if let Some(target) = target {
            if policy.prefer_minimal || policy.is_patching_gem(name) {
                if !move_to_end(&mut result, target) {
                    utils::log_debug(&format!(
                        "target {} {} is not among the remaining candidates",
                        name, target
                    ));
                }
            }
        }
    } else {
        move_to_end(&mut result, locked);
    }
    result
}

/// Ascending order means "a is less preferred than b".
fn compare(
    a: &Version,
    b: &Version,
    locked: &Version,
    target: Option<&Version>,
    unlocking: bool,
    oldest_first: bool,
    policy: &UpdatePolicy,
) -> Ordering {
    if a.major() != b.major() {
        return b.cmp(a);
    }
    if !policy.minor_allowed && a.minor() != b.minor() {
        return b.cmp(a);
    }
    if oldest_first {
        return b.cmp(a);
    }
    if policy.prefer_minimal && unlocking {
        let pinned = |v: &Version| v == locked || target == Some(v);
        let cleared = target.map_or(true, |t| a >= t && b >= t);
        if !pinned(a) && !pinned(b) && cleared {
            return b.cmp(a);
        }
    }
    a.cmp(b)
}

/// Move the entry equal to `version` to the end. Returns false when it is absent.
pub fn move_to_end<T: Versioned>(specs: &mut Vec<T>, version: &Version) -> bool {
    match specs.iter().position(|s| s.version() == version) {
        Some(pos) => {
            let spec = specs.remove(pos);
            specs.push(spec);
            true
        }
        None => false,
    }
}
