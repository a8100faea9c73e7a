use std::env;

use chrono::Local;

fn log_level() -> String {
    env::var("PATCHLOCK_LOG")
        .map(|v| v.to_lowercase())
        .unwrap_or_default()
}

pub fn is_quiet() -> bool {
    if env::var("PATCHLOCK_QUIET").map(|v| v == "1" || v == "true").unwrap_or(false) {
        return true;
    }
    matches!(log_level().as_str(), "quiet" | "error")
}

/// Debug logging, also switched on by the resolver dump flag.
pub fn debug_enabled() -> bool {
    log_level() == "debug" || resolver_dump_enabled()
}

/// `PATCHLOCK_DEBUG_RESOLVER=1` prints every candidate list handed to the solver.
pub fn resolver_dump_enabled() -> bool {
    env::var("PATCHLOCK_DEBUG_RESOLVER")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}

fn stamp(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] {}", timestamp, message)
}

// Logs go to stderr so stdout stays parseable (--json).
pub fn log(message: &str) {
    if !is_quiet() {
        eprintln!("{}", stamp(message));
    }
}

pub fn log_error(message: &str) {
    eprintln!("{}", stamp(message));
}

pub fn log_debug(message: &str) {
    if debug_enabled() && !is_quiet() {
        eprintln!("{}", stamp(&format!("debug: {}", message)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_prefixes_timestamp() {
        let line = stamp("resolving");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] resolving"));
        // "[YYYY-mm-dd HH:MM:SS] "
        assert_eq!(line.find(']'), Some(20));
    }
}
