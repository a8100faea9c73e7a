//! Update policy: which packages may move, how far, and in which order of preference.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// A package the caller wants updated, optionally with the version it must reach.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateTarget {
    NameOnly(String),
    NameWithVersion(String, Version),
}

impl UpdateTarget {
    pub fn name(&self) -> &str {
        match self {
            UpdateTarget::NameOnly(name) | UpdateTarget::NameWithVersion(name, _) => name,
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            UpdateTarget::NameOnly(_) => None,
            UpdateTarget::NameWithVersion(_, version) => Some(version),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnlockSet {
    All,
    Only(BTreeSet<String>),
}

/// Flags and targets for one resolution pass. Read-only once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Drop candidates outside the segment window instead of ranking them last.
    pub strict: bool,
    /// Window is `{major}` instead of `{major, minor}`.
    pub minor_allowed: bool,
    /// Prefer the smallest sufficient upgrade over the newest one.
    pub prefer_minimal: bool,
    /// Run driven by a vulnerability scan: everything may move, but only targets are pushed.
    pub patching: bool,
    targets: Vec<UpdateTarget>,
    unlock: UnlockSet,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            strict: false,
            minor_allowed: false,
            prefer_minimal: false,
            patching: false,
            targets: Vec::new(),
            unlock: UnlockSet::All,
        }
    }
}

impl UpdatePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unlock exactly the named targets. An empty list unlocks everything.
    pub fn for_targets(targets: Vec<UpdateTarget>) -> Self {
        let unlock = if targets.is_empty() {
            UnlockSet::All
        } else {
            UnlockSet::Only(targets.iter().map(|t| t.name().to_string()).collect())
        };
        Self {
            targets,
            unlock,
            ..Self::default()
        }
    }

    /// Patching mode: every package is unlocked, packages outside `targets` prefer their oldest
    /// remaining version and each target is pushed to its patched version.
    pub fn patching(targets: Vec<UpdateTarget>) -> Self {
        Self {
            patching: true,
            targets,
            unlock: UnlockSet::All,
            ..Self::default()
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_minor_allowed(mut self, minor_allowed: bool) -> Self {
        self.minor_allowed = minor_allowed;
        self
    }

    pub fn with_prefer_minimal(mut self, prefer_minimal: bool) -> Self {
        self.prefer_minimal = prefer_minimal;
        self
    }

    pub fn targets(&self) -> &[UpdateTarget] {
        &self.targets
    }

    pub fn unlocking_all(&self) -> bool {
        matches!(self.unlock, UnlockSet::All)
    }

    pub fn is_unlocking(&self, name: &str) -> bool {
        match &self.unlock {
            UnlockSet::All => true,
            UnlockSet::Only(names) => names.contains(name),
        }
    }

    pub fn target_for(&self, name: &str) -> Option<&UpdateTarget> {
        self.targets.iter().find(|t| t.name() == name)
    }

    pub fn target_version_for(&self, name: &str) -> Option<&Version> {
        self.target_for(name).and_then(UpdateTarget::version)
    }

    pub fn is_patching_gem(&self, name: &str) -> bool {
        self.patching && self.target_for(name).is_some()
    }

    pub fn is_patching_but_not_this_gem(&self, name: &str) -> bool {
        self.patching && self.target_for(name).is_none()
    }

    /// Short human description of the flags, used in failure messages.
    pub fn describe(&self) -> String {
        let mut parts = vec![if self.strict { "strict" } else { "non-strict" }];
        parts.push(if self.minor_allowed {
            "minor updates allowed"
        } else {
            "patch updates only"
        });
        if self.prefer_minimal {
            parts.push("prefer minimal");
        }
        if self.patching {
            parts.push("patching");
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn empty_target_list_unlocks_everything() {
        let policy = UpdatePolicy::for_targets(vec![]);
        assert!(policy.unlocking_all());
        assert!(policy.is_unlocking("anything"));
    }

    #[test]
    fn explicit_targets_limit_unlocking() {
        let policy = UpdatePolicy::for_targets(vec![
            UpdateTarget::NameWithVersion("rack".to_string(), v("1.4.6")),
            UpdateTarget::NameOnly("thor".to_string()),
        ]);
        assert!(policy.is_unlocking("rack"));
        assert!(policy.is_unlocking("thor"));
        assert!(!policy.is_unlocking("rails"));
        assert_eq!(policy.target_version_for("rack"), Some(&v("1.4.6")));
        assert_eq!(policy.target_version_for("thor"), None);
        assert_eq!(policy.target_version_for("rails"), None);
        assert!(!policy.is_patching_but_not_this_gem("rails"));
    }

    #[test]
    fn patching_mode_unlocks_all_but_tracks_targets() {
        let policy = UpdatePolicy::patching(vec![UpdateTarget::NameWithVersion(
            "foo".to_string(),
            v("1.7.8"),
        )]);
        assert!(policy.is_unlocking("bar"));
        assert!(policy.is_patching_gem("foo"));
        assert!(!policy.is_patching_but_not_this_gem("foo"));
        assert!(policy.is_patching_but_not_this_gem("bar"));
    }

    #[test]
    fn describe_lists_flags() {
        let policy = UpdatePolicy::new()
            .with_strict(true)
            .with_minor_allowed(true)
            .with_prefer_minimal(true);
        assert_eq!(policy.describe(), "strict, minor updates allowed, prefer minimal");
        assert_eq!(UpdatePolicy::new().describe(), "non-strict, patch updates only");
    }
}
