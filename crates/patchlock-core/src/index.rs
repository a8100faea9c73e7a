//! Package index, locked specs and the candidate lookup contract the solver consumes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::requirement::Requirement;
use crate::version::Version;

pub const DEFAULT_PLATFORM: &str = "ruby";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub requirement: Requirement,
}

impl Dependency {
    pub fn new(name: &str, requirement: Requirement) -> Self {
        Self {
            name: name.to_string(),
            requirement,
        }
    }
}

/// One platform build of a version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub platform: String,
    pub dependencies: Vec<Dependency>,
}

/// All platform variants published for one version of a package.
/// Ordering and filtering only look at `version`; variants ride along untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecGroup {
    pub name: String,
    pub version: Version,
    pub variants: Vec<Variant>,
}

impl SpecGroup {
    pub fn new(name: &str, version: Version) -> Self {
        Self {
            name: name.to_string(),
            version,
            variants: Vec::new(),
        }
    }

    pub fn platforms(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.platform.clone()).collect()
    }

    /// Dependencies across every variant; requirements on the same name are combined.
    pub fn dependencies(&self) -> BTreeMap<String, Requirement> {
        let mut out: BTreeMap<String, Requirement> = BTreeMap::new();
        for variant in &self.variants {
            for dep in &variant.dependencies {
                let merged = match out.get(&dep.name) {
                    Some(existing) if existing != &dep.requirement => existing.and(&dep.requirement),
                    Some(existing) => existing.clone(),
                    None => dep.requirement.clone(),
                };
                out.insert(dep.name.clone(), merged);
            }
        }
        out
    }
}

/// Strategy the solver calls to list the versions of a package.
///
/// Lists are least-preferred-first: the solver tries the *last* element first and
/// walks towards the front. Implementations return owned vectors; the caller may
/// sort, retain or otherwise mutate what it receives, and no later call may observe that.
pub trait CandidateSource {
    fn search_for(&self, name: &str) -> Vec<SpecGroup>;
}

impl<T: CandidateSource + ?Sized> CandidateSource for &T {
    fn search_for(&self, name: &str) -> Vec<SpecGroup> {
        (**self).search_for(name)
    }
}

/// In-memory index of every published version, kept in ascending version order.
#[derive(Clone, Debug, Default)]
pub struct PackageIndex {
    packages: BTreeMap<String, Vec<SpecGroup>>,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one platform variant; variants of an existing version join its group.
    pub fn add(&mut self, name: &str, version: Version, platform: &str, dependencies: Vec<Dependency>) {
        let groups = self.packages.entry(name.to_string()).or_default();
        let variant = Variant {
            platform: platform.to_string(),
            dependencies,
        };
        match groups.binary_search_by(|g| g.version.cmp(&version)) {
            Ok(pos) => groups[pos].variants.push(variant),
            Err(pos) => {
                let mut group = SpecGroup::new(name, version);
                group.variants.push(variant);
                groups.insert(pos, group);
            }
        }
    }
}

impl CandidateSource for PackageIndex {
    fn search_for(&self, name: &str) -> Vec<SpecGroup> {
        self.packages.get(name).cloned().unwrap_or_default()
    }
}

/// Version currently recorded in the lock for one package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedSpec {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl LockedSpec {
    pub fn new(name: &str, version: Version) -> Self {
        Self {
            name: name.to_string(),
            version,
            platforms: vec![DEFAULT_PLATFORM.to_string()],
        }
    }
}

/// Baseline for a run; read-only while resolving.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LockedSpecs {
    specs: BTreeMap<String, LockedSpec>,
}

impl LockedSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: LockedSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&LockedSpec> {
        self.specs.get(name)
    }

    pub fn version_of(&self, name: &str) -> Option<&Version> {
        self.specs.get(name).map(|s| &s.version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockedSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<LockedSpec> for LockedSpecs {
    fn from_iter<I: IntoIterator<Item = LockedSpec>>(iter: I) -> Self {
        let mut specs = LockedSpecs::new();
        for spec in iter {
            specs.insert(spec);
        }
        specs
    }
}
