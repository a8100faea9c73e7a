//! Security advisories: which locked packages are vulnerable and what to move them to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::index::LockedSpecs;
use crate::new_version::calc_new_version;
use crate::policy::UpdateTarget;
use crate::requirement::Requirement;
use crate::utils;
use crate::version::Version;

/// One published advisory against a package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub package: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub patched_versions: Vec<Requirement>,
}

impl Advisory {
    /// A version is affected unless it satisfies one of the patched requirements.
    pub fn affects(&self, version: &Version) -> bool {
        !self.patched_versions.iter().any(|r| r.satisfied_by(version))
    }
}

/// Patched versions of one package, one per `major.minor` line, ascending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VulnerablePackage {
    pub name: String,
    pub patched_versions: Vec<Version>,
}

/// A locked package that at least one advisory affects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VulnerableGem {
    pub name: String,
    pub locked: Version,
    /// `None` when every patched version is on a later major line.
    pub target: Option<Version>,
    pub patched_versions: Vec<Version>,
}

impl VulnerableGem {
    pub fn to_target(&self) -> UpdateTarget {
        match &self.target {
            Some(version) => UpdateTarget::NameWithVersion(self.name.clone(), version.clone()),
            None => UpdateTarget::NameOnly(self.name.clone()),
        }
    }
}

/// Fold every advisory of a package into one list of patched versions.
///
/// Requirement bounds are flattened (so `~> 1.4.5, >= 1.5.2` contributes both versions),
/// grouped by `major.minor` and only the highest of each group is kept.
pub fn consolidate(advisories: &[Advisory]) -> Vec<VulnerablePackage> {
    let mut by_package: BTreeMap<&str, Vec<&Advisory>> = BTreeMap::new();
    for advisory in advisories {
        by_package.entry(advisory.package.as_str()).or_default().push(advisory);
    }

    by_package
        .into_iter()
        .map(|(name, advisories)| {
            let mut lines: BTreeMap<(u64, u64), Version> = BTreeMap::new();
            let bounds = advisories
                .iter()
                .flat_map(|a| a.patched_versions.iter())
                .flat_map(|r| r.bound_versions());
            for version in bounds {
                let line = (version.major(), version.minor());
                match lines.get(&line) {
                    Some(existing) if existing >= version => {}
                    _ => {
                        lines.insert(line, version.clone());
                    }
                }
            }
            VulnerablePackage {
                name: name.to_string(),
                patched_versions: lines.into_values().collect(),
            }
        })
        .collect()
}

/// Locked packages affected by an advisory, with the version each should move to.
pub fn vulnerable_gems(advisories: &[Advisory], locked: &LockedSpecs) -> Vec<VulnerableGem> {
    consolidate(advisories)
        .into_iter()
        .filter_map(|package| {
            let current = locked.version_of(&package.name)?;
            let affected = advisories
                .iter()
                .filter(|a| a.package == package.name)
                .any(|a| a.affects(current));
            if !affected {
                return None;
            }
            let target = calc_new_version(current, &package.patched_versions);
            utils::log_debug(&format!(
                "Attempting {}: {} => {}",
                package.name,
                current,
                target
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "none".to_string())
            ));
            Some(VulnerableGem {
                name: package.name,
                locked: current.clone(),
                target,
                patched_versions: package.patched_versions,
            })
        })
        .collect()
}

/// Update targets for every vulnerable locked package.
pub fn vulnerable_targets(advisories: &[Advisory], locked: &LockedSpecs) -> Vec<UpdateTarget> {
    vulnerable_gems(advisories, locked)
        .iter()
        .map(VulnerableGem::to_target)
        .collect()
}
