//! Core library for patchlock: conservative version resolution over a locked bundle.
//! Used by the CLI binary; can be reused by other tools.

pub mod advisory;
pub mod candidates;
pub mod config;
pub mod conservative;
pub mod error;
pub mod index;
pub mod new_version;
pub mod policy;
pub mod reconcile;
pub mod requirement;
pub mod snapshot;
pub mod solver;
pub mod update;
pub mod utils;
pub mod version;


// Re-export main API for CLI
pub use advisory::{consolidate, vulnerable_gems, vulnerable_targets, Advisory, VulnerableGem};
pub use candidates::{filter_specs, sort_specs};
pub use config::{load_config, Config, Flags};
pub use conservative::ConservativeSearch;
pub use error::{PatchError, PatchResult};
pub use index::{CandidateSource, Dependency, LockedSpec, LockedSpecs, PackageIndex, SpecGroup};
pub use new_version::calc_new_version;
pub use policy::{UnlockSet, UpdatePolicy, UpdateTarget};
pub use reconcile::reconcile;
pub use requirement::Requirement;
pub use snapshot::{load_snapshot, parse_snapshot, Snapshot};
pub use solver::{resolve, ChangeKind, ResolvedSpec, ResolvedSpecSet, VersionChange};
pub use update::{plan_update, run_update, UpdatePlan, UpdateReport};
pub use utils::{log, log_error};
pub use version::Version;
