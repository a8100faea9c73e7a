//! Thin CLI layer: parse args, styled output, and call into patchlock-core.
//! Crash-proof: panic caught and reported; all errors return Result.

use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use patchlock_core::{ChangeKind, Flags, UpdatePlan, UpdateReport, Version, VersionChange};

// ---- UI helpers (no-op when stdout isn't a TTY) ----

fn use_color() -> bool {
    std::io::stdout().is_terminal()
        && env::var("NO_COLOR").unwrap_or_default().is_empty()
}

fn success(msg: &str) {
    if use_color() {
        println!("{}", msg.green());
    } else {
        println!("{}", msg);
    }
}

fn error(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.red());
    } else {
        eprintln!("{}", msg);
    }
}

fn warning(msg: &str) {
    if use_color() {
        eprintln!("{}", msg.yellow());
    } else {
        eprintln!("{}", msg);
    }
}

fn info(msg: &str) {
    if use_color() {
        println!("{}", msg.cyan());
    } else {
        println!("{}", msg);
    }
}

fn dim(msg: &str) {
    if use_color() {
        println!("{}", msg.dimmed());
    } else {
        println!("{}", msg);
    }
}

fn snapshot_arg() -> Arg {
    Arg::new("snapshot")
        .required(true)
        .help("Bundle snapshot (JSON: requirements, locked, index, advisories)")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Machine-readable JSON output")
}

fn flag(name: &'static str, short: char, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn cli() -> Command {
    Command::new("patchlock")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Conservative dependency updates: smallest safe move from the current lock")
        .after_help(
            "Examples:\n  patchlock update bundle.json\n  patchlock update bundle.json rack --strict\n  patchlock update bundle.json -v -n\n  patchlock list bundle.json\n  patchlock next-version 1.9.3-p484 1.9.3-p550 2.1.4",
        )
        .subcommand(
            Command::new("update")
                .about("Resolve the bundle, moving only what the flags allow")
                .arg(snapshot_arg())
                .arg(
                    Arg::new("gems")
                        .required(false)
                        .num_args(0..)
                        .help("Gems to update; omit to update all gems conservatively"),
                )
                .arg(flag(
                    "strict",
                    's',
                    "Never move any gem past the latest patch (or minor if -m used)",
                ))
                .arg(flag("minor", 'm', "Prefer update to the latest minor.patch version"))
                .arg(flag(
                    "minimal",
                    'n',
                    "Prefer minimal version updates over most recent patch (or minor if -m used)",
                ))
                .arg(flag("vulnerable-gems-only", 'v', "Only update vulnerable gems"))
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List vulnerable gems and their target version; nothing is resolved")
                .arg(snapshot_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("next-version")
                .about("Smallest patched version above OLD on the same major line")
                .arg(Arg::new("old").required(true).help("Currently locked version"))
                .arg(
                    Arg::new("patched")
                        .required(true)
                        .num_args(1..)
                        .help("Patched versions"),
                ),
        )
}

fn run() -> Result<(), String> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("update", sub_m)) => cmd_update(sub_m),
        Some(("list", sub_m)) => cmd_list(sub_m),
        Some(("next-version", sub_m)) => cmd_next_version(sub_m),
        _ => {
            if use_color() {
                println!("{}", "patchlock".bright_cyan().bold());
                dim("Conservative dependency updates from the current lock.");
            } else {
                println!("patchlock: conservative dependency updates from the current lock");
            }
            dim("\nRun `patchlock --help` for details.");
            Ok(())
        }
    }
}

fn load(sub_m: &ArgMatches) -> Result<patchlock_core::Snapshot, String> {
    let path = sub_m
        .get_one::<String>("snapshot")
        .ok_or_else(|| "missing snapshot path".to_string())?;
    patchlock_core::load_snapshot(Path::new(path)).map_err(|e| e.to_string())
}

fn cmd_update(sub_m: &ArgMatches) -> Result<(), String> {
    let snapshot = load(sub_m)?;
    let gems: Vec<String> = sub_m
        .get_many::<String>("gems")
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default();
    let json_out = sub_m.get_flag("json");

    let cwd = env::current_dir().map_err(|e| e.to_string())?;
    let flags = patchlock_core::load_config(&cwd).merge_flags(&Flags {
        strict: sub_m.get_flag("strict"),
        minor: sub_m.get_flag("minor"),
        minimal: sub_m.get_flag("minimal"),
        vulnerable_only: sub_m.get_flag("vulnerable-gems-only"),
    });

    let plan = patchlock_core::plan_update(&snapshot, &gems, &flags);
    for w in &plan.warnings {
        warning(&format!("* {}", w));
    }
    if !json_out {
        for msg in &plan.messages {
            info(msg);
        }
    }

    let report = patchlock_core::run_update(&snapshot, &plan).map_err(|e| e.to_string())?;
    if json_out {
        println!("{}", update_json(&plan, report.as_ref()));
        return Ok(());
    }
    let report = match report {
        Some(report) => report,
        None => return Ok(()),
    };

    let moved: Vec<&VersionChange> = report
        .changes
        .iter()
        .filter(|c| c.kind != ChangeKind::Unchanged)
        .collect();
    if moved.is_empty() {
        dim("Bundle is already up to date.");
    }
    for change in moved {
        println!("{}", describe_change(change));
    }
    success(&format!("Resolved {} gems.", report.resolved.len()));
    Ok(())
}

fn describe_change(change: &VersionChange) -> String {
    let show = |v: &Option<Version>, missing: &str| {
        v.as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| missing.to_string())
    };
    format!(
        "{} {} -> {}",
        change.name,
        show(&change.from, "(new)"),
        show(&change.to, "(removed)")
    )
}

fn update_json(plan: &UpdatePlan, report: Option<&UpdateReport>) -> String {
    let status = if report.is_some() { "ok" } else { "skipped" };
    let value = serde_json::json!({
        "schemaVersion": "1",
        "command": "update",
        "status": status,
        "targets": plan.targets,
        "warnings": plan.warnings,
        "changes": report.map(|r| r.changes.clone()).unwrap_or_default(),
        "resolved": report.map(|r| &r.resolved),
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}

fn cmd_list(sub_m: &ArgMatches) -> Result<(), String> {
    let snapshot = load(sub_m)?;
    let gems = patchlock_core::vulnerable_gems(&snapshot.advisories, &snapshot.locked);

    if sub_m.get_flag("json") {
        let value = serde_json::json!({
            "schemaVersion": "1",
            "command": "list",
            "vulnerable": gems,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    if gems.is_empty() {
        info(patchlock_core::update::NO_VULNERABILITIES);
        return Ok(());
    }
    info("Detected vulnerabilities:");
    info("-------------------------");
    let mut lines: Vec<String> = gems
        .iter()
        .map(|g| {
            let patched: Vec<String> = g.patched_versions.iter().map(|v| v.to_string()).collect();
            let target = g
                .target
                .as_ref()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "none within major line".to_string());
            format!("{} {} => {} (patched: {})", g.name, g.locked, target, patched.join(", "))
        })
        .collect();
    lines.sort();
    lines.dedup();
    println!("{}", lines.join("\n"));
    Ok(())
}

fn cmd_next_version(sub_m: &ArgMatches) -> Result<(), String> {
    let old = sub_m
        .get_one::<String>("old")
        .ok_or_else(|| "missing old version".to_string())?;
    let old = Version::parse(old).map_err(|e| e.to_string())?;
    let mut patched = Vec::new();
    for p in sub_m.get_many::<String>("patched").into_iter().flatten() {
        patched.push(Version::parse(p).map_err(|e| e.to_string())?);
    }
    match patchlock_core::calc_new_version(&old, &patched) {
        Some(next) => {
            println!("{}", next);
            Ok(())
        }
        None => Err(format!("{}: no upgrade within major line", old)),
    }
}

fn main() {
    if !use_color() {
        colored::control::set_override(false);
    }

    let code = match std::panic::catch_unwind(run) {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            error(&e);
            1
        }
        Err(_) => {
            error("An unexpected error occurred. Please report this issue.");
            1
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn change_lines_mark_added_and_removed() {
        let v = |s: &str| Version::parse(s).unwrap();
        let up = VersionChange::new("rack", Some(v("1.4.5")), Some(v("1.4.6")));
        assert_eq!(describe_change(&up), "rack 1.4.5 -> 1.4.6");
        let added = VersionChange::new("baz", None, Some(v("0.2.0")));
        assert_eq!(describe_change(&added), "baz (new) -> 0.2.0");
        let removed = VersionChange::new("old", Some(v("1.0")), None);
        assert_eq!(describe_change(&removed), "old 1.0 -> (removed)");
    }
}
