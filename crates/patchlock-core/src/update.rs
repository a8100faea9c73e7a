//! Conservative update of a bundle snapshot: vulnerable gems and requested gems are
//! reconciled into one target list, turned into a policy and resolved.

use serde::Serialize;

use crate::advisory::{vulnerable_gems, VulnerableGem};
use crate::config::Flags;
use crate::error::PatchResult;
use crate::policy::{UpdatePolicy, UpdateTarget};
use crate::reconcile::reconcile;
use crate::snapshot::Snapshot;
use crate::solver::{resolve, ResolvedSpecSet, VersionChange};
use crate::utils;

pub const NO_VULNERABILITIES: &str = "No known vulnerabilities to update.";

#[derive(Clone, Debug)]
pub struct UpdatePlan {
    pub vulnerable: Vec<VulnerableGem>,
    pub targets: Vec<UpdateTarget>,
    /// `None` when there is nothing to resolve.
    pub policy: Option<UpdatePolicy>,
    pub warnings: Vec<String>,
    pub messages: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateReport {
    pub resolved: ResolvedSpecSet,
    pub changes: Vec<VersionChange>,
}

/// Decide what to unlock for `gems` (possibly empty) under `flags`.
pub fn plan_update(snapshot: &Snapshot, gems: &[String], flags: &Flags) -> UpdatePlan {
    let vulnerable = vulnerable_gems(&snapshot.advisories, &snapshot.locked);
    let vulnerable_targets: Vec<UpdateTarget> =
        vulnerable.iter().map(VulnerableGem::to_target).collect();

    let mut targets = reconcile(&vulnerable_targets, gems);
    let mut patching = false;
    if flags.vulnerable_only && targets.is_empty() {
        targets = vulnerable_targets;
        patching = true;
    }

    let mut warnings = Vec::new();
    let mut messages = Vec::new();
    for gem in &vulnerable {
        match &gem.target {
            Some(target) => messages.push(format!(
                "Attempting conservative update for vulnerable gem '{}': {} => {}",
                gem.name, gem.locked, target
            )),
            None => warnings.push(format!(
                "Could not attempt upgrade for {} from {} to any patched versions {}. Most often \
                 this is because a major version increment would be required and it's safer for \
                 a major version increase to be done manually.",
                gem.name,
                gem.locked,
                join(&gem.patched_versions)
            )),
        }
    }
    if messages.is_empty() {
        messages.push(NO_VULNERABILITIES.to_string());
    }

    let policy = if targets.is_empty() {
        if flags.vulnerable_only {
            None
        } else {
            messages.push("Updating all gems conservatively.".to_string());
            Some(UpdatePolicy::for_targets(Vec::new()))
        }
    } else {
        let names: Vec<&str> = targets.iter().map(UpdateTarget::name).collect();
        messages.push(format!("Updating '{}' conservatively.", names.join(" ")));
        Some(if patching {
            UpdatePolicy::patching(targets.clone())
        } else {
            UpdatePolicy::for_targets(targets.clone())
        })
    };

    let policy = policy.map(|p| {
        p.with_strict(flags.strict)
            .with_minor_allowed(flags.minor)
            .with_prefer_minimal(flags.minimal)
    });

    UpdatePlan {
        vulnerable,
        targets,
        policy,
        warnings,
        messages,
    }
}

/// Resolve the snapshot under the plan's policy. `Ok(None)` when the plan has nothing to do.
pub fn run_update(snapshot: &Snapshot, plan: &UpdatePlan) -> PatchResult<Option<UpdateReport>> {
    let policy = match &plan.policy {
        Some(policy) => policy,
        None => return Ok(None),
    };
    utils::log(&format!(
        "Resolving {} packages ({})",
        snapshot.requirements.len(),
        policy.describe()
    ));
    let resolved = resolve(policy, &snapshot.locked, &snapshot.index, &snapshot.requirements)?;
    let changes = resolved.changes(&snapshot.locked);
    Ok(Some(UpdateReport { resolved, changes }))
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
