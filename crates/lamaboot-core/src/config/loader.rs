//! Environment variable loading helpers.
//!
//! Fallback chains live here so callers never repeat `or_else` ladders.

use std::env;
use std::path::Path;

/// Load `.env` from the current directory into the process environment.
/// Existing variables are never overridden. Runs at most once per process.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        load_dotenv_from_dir(&dir);
    });
}

/// Load `<dir>/.env` without overriding existing variables.
///
/// Must run before any child process is spawned; setup is single-threaded.
pub fn load_dotenv_from_dir(dir: &Path) {
    let Ok(content) = std::fs::read_to_string(dir.join(".env")) else {
        return;
    };
    for (key, value) in content.lines().filter_map(parse_dotenv_line) {
        if env::var(key).is_err() {
            env::set_var(key, value);
        }
    }
}

/// Parse one `KEY=value` line. Comments, blank lines and lines without `=`
/// yield `None`. Matching quotes around the value are stripped, and an inline
/// `#` comment is dropped when the value is unquoted.
pub fn parse_dotenv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let mut value = value.trim();
    if let Some(hash_pos) = value.find('#') {
        let before_hash = value[..hash_pos].trim_end();
        if !before_hash.contains('"') && !before_hash.contains('\'') {
            value = before_hash;
        }
    }
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }
    Some((key, value))
}

/// Read the primary variable or the first set alias; fall back to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Like `env_or` but returns `None` when unset (empty counts as unset).
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// Boolean variable: 0/false/no/off are false, anything else is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()));
    match v.as_deref() {
        Some(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        None => default,
    }
}
