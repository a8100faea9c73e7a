//! Resolution through the PubGrub solver.
//!
//! The solver decides *which* assignment satisfies every requirement; the
//! conservative search decides in which order it tries candidates. Every lookup
//! the solver makes goes through [`ConservativeSearch`], so the policy applies to
//! direct and transitive dependencies alike.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::convert::Infallible;

use pubgrub::{
    DefaultStringReporter, Dependencies, DependencyConstraints, DependencyProvider,
    PackageResolutionStatistics, PubGrubError, Ranges, Reporter,
};
use serde::Serialize;

use crate::conservative::ConservativeSearch;
use crate::error::utils::resolution_error;
use crate::error::{PatchError, PatchResult};
use crate::index::{CandidateSource, LockedSpecs};
use crate::policy::UpdatePolicy;
use crate::requirement::Requirement;
use crate::utils;
use crate::version::Version;

/// Virtual package that depends on every top-level requirement.
const ROOT: &str = "<bundle>";

type VersionRange = Ranges<Version>;

struct BundleProvider<'a, S> {
    search: ConservativeSearch<'a, S>,
    root_version: Version,
    root_deps: DependencyConstraints<String, VersionRange>,
    /// Last package for which no admissible candidate was left.
    exhausted: RefCell<Option<String>>,
}

impl<'a, S: CandidateSource> DependencyProvider for BundleProvider<'a, S> {
    type P = String;
    type V = Version;
    type VS = VersionRange;
    type M = String;
    type Err = Infallible;
    type Priority = (u32, Reverse<usize>);

    fn prioritize(
        &self,
        package: &String,
        range: &VersionRange,
        package_statistics: &PackageResolutionStatistics,
    ) -> Self::Priority {
        if package == ROOT {
            return (u32::MAX, Reverse(0));
        }
        let count = self
            .search
            .search_for(package)
            .iter()
            .filter(|g| range.contains(&g.version))
            .count();
        if count == 0 {
            return (u32::MAX, Reverse(0));
        }
        // Conflicting packages first, then the ones with fewer choices
        (package_statistics.conflict_count(), Reverse(count))
    }

    fn choose_version(
        &self,
        package: &String,
        range: &VersionRange,
    ) -> Result<Option<Version>, Infallible> {
        if package == ROOT {
            if range.contains(&self.root_version) {
                return Ok(Some(self.root_version.clone()));
            }
            return Ok(None);
        }
        // Most preferred candidate is last.
        let mut candidates = self.search.search_for(package);
        candidates.retain(|g| range.contains(&g.version));
        match candidates.pop() {
            Some(group) => Ok(Some(group.version)),
            None => {
                *self.exhausted.borrow_mut() = Some(package.clone());
                Ok(None)
            }
        }
    }

    fn get_dependencies(
        &self,
        package: &String,
        version: &Version,
    ) -> Result<Dependencies<String, VersionRange, String>, Infallible> {
        if package == ROOT && version == &self.root_version {
            return Ok(Dependencies::Available(self.root_deps.clone()));
        }
        let group = self
            .search
            .search_for(package)
            .into_iter()
            .find(|g| &g.version == version);
        let group = match group {
            Some(group) => group,
            None => {
                return Ok(Dependencies::Unavailable(format!(
                    "Version {} not found for {}",
                    version, package
                )));
            }
        };

        let mut constraints: DependencyConstraints<String, VersionRange> =
            DependencyConstraints::default();
        for (name, requirement) in group.dependencies() {
            constraints.insert(name, requirement.to_ranges());
        }
        Ok(Dependencies::Available(constraints))
    }
}

/// Resolve `requirements` against `index`, ordering every candidate list by `policy`
/// relative to `locked`.
pub fn resolve<S: CandidateSource>(
    policy: &UpdatePolicy,
    locked: &LockedSpecs,
    index: S,
    requirements: &BTreeMap<String, Requirement>,
) -> PatchResult<ResolvedSpecSet> {
    let mut root_deps: DependencyConstraints<String, VersionRange> =
        DependencyConstraints::default();
    for (name, requirement) in requirements {
        root_deps.insert(name.clone(), requirement.to_ranges());
    }

    let provider = BundleProvider {
        search: ConservativeSearch::new(index, locked, policy),
        root_version: Version::from_segments(&[0]),
        root_deps,
        exhausted: RefCell::new(None),
    };

    utils::log_debug(&format!(
        "resolving {} requirements ({})",
        requirements.len(),
        policy.describe()
    ));

    let solution = pubgrub::resolve(&provider, ROOT.to_string(), provider.root_version.clone())
        .map_err(|e| {
            let exhausted = provider.exhausted.borrow().clone();
            convert_pubgrub_error(e, exhausted.as_deref(), policy)
        })?;

    let mut resolved = ResolvedSpecSet::default();
    for (name, version) in solution {
        if name == ROOT {
            continue;
        }
        let platforms = provider
            .search
            .search_for(&name)
            .into_iter()
            .find(|g| g.version == version)
            .map(|g| g.platforms())
            .unwrap_or_default();
        resolved.insert(ResolvedSpec {
            name,
            version,
            platforms,
        });
    }
    Ok(resolved)
}

fn convert_pubgrub_error<DP: DependencyProvider>(
    error: PubGrubError<DP>,
    exhausted: Option<&str>,
    policy: &UpdatePolicy,
) -> PatchError
where
    DP::P: std::fmt::Display,
    DP::VS: std::fmt::Display,
    DP::M: std::fmt::Display,
{
    let flags = policy.describe();
    match error {
        PubGrubError::NoSolution(mut derivation_tree) => {
            derivation_tree.collapse_no_versions();
            let report = DefaultStringReporter::report(&derivation_tree)
                .replace(&format!("{} 0", ROOT), "your bundle")
                .replace(ROOT, "your bundle");
            resolution_error(exhausted, Some(&flags), &report)
        }
        other => resolution_error(exhausted, Some(&flags), &other.to_string()),
    }
}

/// One package of a resolution result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedSpec {
    pub name: String,
    pub version: Version,
    pub platforms: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedSpecSet {
    specs: BTreeMap<String, ResolvedSpec>,
}

impl ResolvedSpecSet {
    pub fn insert(&mut self, spec: ResolvedSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedSpec> {
        self.specs.get(name)
    }

    pub fn version_of(&self, name: &str) -> Option<&Version> {
        self.specs.get(name).map(|s| &s.version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Per-package difference against the lock, sorted by name.
    pub fn changes(&self, locked: &LockedSpecs) -> Vec<VersionChange> {
        let mut changes: Vec<VersionChange> = self
            .iter()
            .map(|spec| {
                VersionChange::new(
                    &spec.name,
                    locked.version_of(&spec.name).cloned(),
                    Some(spec.version.clone()),
                )
            })
            .collect();
        for spec in locked.iter() {
            if self.get(&spec.name).is_none() {
                changes.push(VersionChange::new(&spec.name, Some(spec.version.clone()), None));
            }
        }
        changes.sort_by(|a, b| a.name.cmp(&b.name));
        changes
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Upgraded,
    Downgraded,
    Unchanged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    pub name: String,
    pub from: Option<Version>,
    pub to: Option<Version>,
    pub kind: ChangeKind,
}

impl VersionChange {
    pub fn new(name: &str, from: Option<Version>, to: Option<Version>) -> Self {
        let kind = match (&from, &to) {
            (None, _) => ChangeKind::Added,
            (_, None) => ChangeKind::Removed,
            (Some(a), Some(b)) if b > a => ChangeKind::Upgraded,
            (Some(a), Some(b)) if b < a => ChangeKind::Downgraded,
            _ => ChangeKind::Unchanged,
        };
        Self {
            name: name.to_string(),
            from,
            to,
            kind,
        }
    }
}
