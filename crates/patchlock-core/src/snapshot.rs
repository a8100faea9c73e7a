//! Bundle snapshot: top-level requirements, the current lock, the package index and
//! known advisories in one JSON document.
//!
//! ```json
//! {
//!   "requirements": { "rails": "~> 3.2" },
//!   "locked": { "rails": "3.2.0", "nokogiri": { "version": "1.6.8", "platforms": ["ruby", "java"] } },
//!   "index": { "rails": [ { "version": "3.2.1", "dependencies": { "rack": "~> 1.4" } } ] },
//!   "advisories": [ { "package": "rack", "patched_versions": ["~> 1.4.6", ">= 1.5.2"] } ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::advisory::Advisory;
use crate::error::utils::{io_error, snapshot_error};
use crate::error::PatchResult;
use crate::index::{Dependency, LockedSpec, LockedSpecs, PackageIndex, DEFAULT_PLATFORM};
use crate::requirement::Requirement;
use crate::version::Version;

#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    /// Top-level requirements; every locked package with no constraint when the file has none.
    pub requirements: BTreeMap<String, Requirement>,
    pub locked: LockedSpecs,
    pub index: PackageIndex,
    pub advisories: Vec<Advisory>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    requirements: BTreeMap<String, String>,
    #[serde(default)]
    locked: BTreeMap<String, RawLocked>,
    #[serde(default)]
    index: BTreeMap<String, Vec<RawSpec>>,
    #[serde(default)]
    advisories: Vec<RawAdvisory>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLocked {
    Version(String),
    Full {
        version: String,
        #[serde(default)]
        platforms: Vec<String>,
    },
}

#[derive(Deserialize)]
struct RawSpec {
    version: String,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawAdvisory {
    package: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    patched_versions: Vec<String>,
}

fn version_at(field: &str, text: &str) -> PatchResult<Version> {
    Version::parse(text).map_err(|e| snapshot_error(field, e))
}

fn requirement_at(field: &str, text: &str) -> PatchResult<Requirement> {
    Requirement::parse(text).map_err(|e| snapshot_error(field, e))
}

pub fn parse_snapshot(text: &str) -> PatchResult<Snapshot> {
    let raw: RawSnapshot = serde_json::from_str(text).map_err(|e| snapshot_error("$", e))?;

    let mut requirements = BTreeMap::new();
    for (name, req) in &raw.requirements {
        requirements.insert(
            name.clone(),
            requirement_at(&format!("requirements.{}", name), req)?,
        );
    }

    let mut locked = LockedSpecs::new();
    for (name, entry) in &raw.locked {
        let field = format!("locked.{}", name);
        let spec = match entry {
            RawLocked::Version(version) => LockedSpec::new(name, version_at(&field, version)?),
            RawLocked::Full { version, platforms } => {
                let mut spec = LockedSpec::new(name, version_at(&format!("{}.version", field), version)?);
                if !platforms.is_empty() {
                    spec.platforms = platforms.clone();
                }
                spec
            }
        };
        locked.insert(spec);
    }

    let mut index = PackageIndex::new();
    for (name, specs) in &raw.index {
        for (i, spec) in specs.iter().enumerate() {
            let field = format!("index.{}[{}]", name, i);
            let version = version_at(&format!("{}.version", field), &spec.version)?;
            let mut dependencies = Vec::new();
            for (dep, req) in &spec.dependencies {
                let requirement = requirement_at(&format!("{}.dependencies.{}", field, dep), req)?;
                dependencies.push(Dependency::new(dep, requirement));
            }
            let platform = spec.platform.as_deref().unwrap_or(DEFAULT_PLATFORM);
            index.add(name, version, platform, dependencies);
        }
    }

    let mut advisories = Vec::new();
    for (i, adv) in raw.advisories.iter().enumerate() {
        let mut patched_versions = Vec::new();
        for (j, req) in adv.patched_versions.iter().enumerate() {
            patched_versions.push(requirement_at(
                &format!("advisories[{}].patched_versions[{}]", i, j),
                req,
            )?);
        }
        advisories.push(Advisory {
            package: adv.package.clone(),
            id: adv.id.clone(),
            patched_versions,
        });
    }

    if requirements.is_empty() {
        for spec in locked.iter() {
            requirements.insert(spec.name.clone(), Requirement::any());
        }
    }

    Ok(Snapshot {
        requirements,
        locked,
        index,
        advisories,
    })
}

pub fn load_snapshot(path: &Path) -> PatchResult<Snapshot> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| io_error("load_snapshot", Some(&path.display().to_string()), e))?;
    parse_snapshot(&text)
}
