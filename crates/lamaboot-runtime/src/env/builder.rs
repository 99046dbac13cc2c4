//! Build the isolated Python venv and resolve its RuntimePaths.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::process::{CommandRunner, CommandSpec};
use crate::runtime_resolver::RuntimePaths;
use crate::tool::ToolLocator;

/// Result of `ensure_environment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvBuild {
    pub paths: RuntimePaths,
    /// false when an existing venv was reused
    pub created: bool,
}

/// Pick the base interpreter: explicit override, else python3, else python.
pub fn find_base_python(override_python: Option<&str>, locator: &dyn ToolLocator) -> Result<PathBuf> {
    if let Some(p) = override_python {
        let candidate = PathBuf::from(p);
        if candidate.components().count() > 1 {
            if candidate.exists() {
                return Ok(candidate);
            }
            anyhow::bail!("Configured Python interpreter not found: {}", p);
        }
        return locator
            .locate(p)
            .with_context(|| format!("Configured Python interpreter `{}` not in PATH", p));
    }
    for name in ["python3", "python"] {
        if let Some(path) = locator.locate(name) {
            return Ok(path);
        }
    }
    anyhow::bail!("python3 or python not found in PATH")
}

/// Ensure a venv exists at `env_dir`, creating it with `<base_python> -m venv` if needed.
pub fn ensure_environment(
    env_dir: &Path,
    base_python: &Path,
    runner: &dyn CommandRunner,
) -> Result<EnvBuild> {
    if let Some(paths) = RuntimePaths::from_env_dir(env_dir) {
        crate::info_log!(env_dir = %env_dir.display(), "Reusing existing virtual environment");
        return Ok(EnvBuild {
            paths,
            created: false,
        });
    }

    if let Some(parent) = env_dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Create venv parent dir")?;
    }

    // Runs in the caller's cwd, the directory `env_dir` is relative to.
    let spec = CommandSpec::new(base_python)
        .arg("-m")
        .arg("venv")
        .arg(env_dir.to_string_lossy().to_string())
        .capture();
    crate::info_log!(command = %spec.display(), "Creating virtual environment");
    let out = runner.run(&spec).context("Create venv")?;
    if !out.success() {
        return Err(anyhow::Error::new(out.exit_error(&spec)).context(format!(
            "venv failed ({}): {}",
            out.describe(),
            out.stderr.trim()
        )));
    }

    let paths = RuntimePaths::from_env_dir(env_dir).with_context(|| {
        format!(
            "venv reported success but no interpreter exists under {}",
            env_dir.display()
        )
    })?;
    Ok(EnvBuild {
        paths,
        created: true,
    })
}
