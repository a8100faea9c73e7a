//! Optional config from .patchlockrc or ~/.patchlockrc (JSON). CLI flags override it.

use std::path::Path;

use crate::error::utils::config_error;
use crate::error::PatchResult;
use crate::utils;

pub const CONFIG_FILE: &str = ".patchlockrc";

/// Optional config from file. CLI flags override these.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub strict: Option<bool>,
    pub minor: Option<bool>,
    pub minimal: Option<bool>,
    pub vulnerable_only: Option<bool>,
}

/// Effective switches for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    pub strict: bool,
    pub minor: bool,
    pub minimal: bool,
    pub vulnerable_only: bool,
}

impl Config {
    /// A flag given on the command line wins; otherwise the config value, otherwise off.
    pub fn merge_flags(&self, cli: &Flags) -> Flags {
        Flags {
            strict: cli.strict || self.strict.unwrap_or(false),
            minor: cli.minor || self.minor.unwrap_or(false),
            minimal: cli.minimal || self.minimal.unwrap_or(false),
            vulnerable_only: cli.vulnerable_only || self.vulnerable_only.unwrap_or(false),
        }
    }
}

/// Parse the JSON body of a config file. Unknown keys are ignored, wrongly typed ones are errors.
pub fn parse_config(text: &str) -> PatchResult<Config> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| config_error("parse_config", None, e))?;
    let mut cfg = Config::default();
    let fields: [(&str, &mut Option<bool>); 4] = [
        ("strict", &mut cfg.strict),
        ("minor", &mut cfg.minor),
        ("minimal", &mut cfg.minimal),
        ("vulnerableOnly", &mut cfg.vulnerable_only),
    ];
    for (key, slot) in fields {
        match value.get(key) {
            None | Some(serde_json::Value::Null) => {}
            Some(v) => match v.as_bool() {
                Some(b) => *slot = Some(b),
                None => return Err(config_error("parse_config", Some(key), "expected a boolean")),
            },
        }
    }
    Ok(cfg)
}

/// Load config from .patchlockrc in dir, then ~/.patchlockrc. Missing or invalid file = default.
pub fn load_config(dir: &Path) -> Config {
    let mut candidates = vec![dir.join(CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_FILE));
    }
    for path in &candidates {
        if path.is_file() {
            let parsed = std::fs::read_to_string(path)
                .map_err(|e| config_error("load_config", None, e))
                .and_then(|s| parse_config(&s));
            return match parsed {
                Ok(cfg) => cfg,
                Err(e) => {
                    utils::log_error(&format!("Ignoring {}: {}", path.display(), e));
                    Config::default()
                }
            };
        }
    }
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchError;

    #[test]
    fn reads_known_fields() {
        let cfg = parse_config(r#"{"strict": true, "minor": false, "vulnerableOnly": true, "other": 1}"#)
            .unwrap();
        assert_eq!(cfg.strict, Some(true));
        assert_eq!(cfg.minor, Some(false));
        assert_eq!(cfg.minimal, None);
        assert_eq!(cfg.vulnerable_only, Some(true));
    }

    #[test]
    fn wrong_type_names_the_field() {
        match parse_config(r#"{"minimal": "yes"}"#).unwrap_err() {
            PatchError::Config { field, .. } => assert_eq!(field.as_deref(), Some("minimal")),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(parse_config("not json").is_err());
    }

    #[test]
    fn cli_flags_override_config() {
        let cfg = Config {
            strict: Some(true),
            ..Config::default()
        };
        let merged = cfg.merge_flags(&Flags {
            minimal: true,
            ..Flags::default()
        });
        assert!(merged.strict);
        assert!(merged.minimal);
        assert!(!merged.minor);
    }

    #[test]
    fn project_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"minor": true}"#).unwrap();
        assert_eq!(load_config(dir.path()).minor, Some(true));
    }

    #[test]
    fn invalid_project_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{").unwrap();
        assert_eq!(load_config(dir.path()), Config::default());
    }
}
