//! Observability: tracing init and the step audit log.
//!
//! Uses config::ObservabilityConfig for LAMABOOT_QUIET, LOG_LEVEL, LOG_JSON and AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::error::{SetupError, Step};

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call once at process startup.
/// When LAMABOOT_QUIET=1 only WARN and above are logged.
pub fn init_tracing() {
    let cfg = crate::config::ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "lamaboot=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = crate::config::ObservabilityConfig::from_env()
        .audit_log
        .clone()?;
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Audit: a bootstrap step is about to run
pub fn audit_step_started(step: Step) {
    if let Some(path) = get_audit_path() {
        let record = json!({
            "ts": now(),
            "event": "step_started",
            "step": step,
        });
        append_jsonl(&path, &record);
    }
}

/// Audit: a bootstrap step finished; `outcome` is a short label such as
/// "created", "skipped" or "already_installed"
pub fn audit_step_completed(step: Step, outcome: &str, duration_ms: u64) {
    if let Some(path) = get_audit_path() {
        let record = json!({
            "ts": now(),
            "event": "step_completed",
            "step": step,
            "outcome": outcome,
            "duration_ms": duration_ms,
        });
        append_jsonl(&path, &record);
    }
}

/// Audit: a bootstrap step failed and the sequence stopped
pub fn audit_step_failed(err: &SetupError) {
    tracing::warn!(step = %err.step(), error = %err, "Bootstrap step failed");
    if let Some(path) = get_audit_path() {
        let record = json!({
            "ts": now(),
            "event": "step_failed",
            "step": err.step(),
            "error": err.to_string(),
            "exit_code": err.exit_code(),
        });
        append_jsonl(&path, &record);
    }
}

/// Audit: the remote installer is about to be executed
pub fn audit_installer_fetched(url: &str, sha256: &str, verified: bool) {
    if !verified {
        tracing::warn!(
            url = %url,
            sha256 = %sha256,
            "Running remote installer without a pinned checksum"
        );
    }
    if let Some(path) = get_audit_path() {
        let record = json!({
            "ts": now(),
            "event": "installer_fetched",
            "url": url,
            "sha256": sha256,
            "verified": verified,
        });
        append_jsonl(&path, &record);
    }
}
