//! Execution context of an isolated Python environment.
//!
//! `RuntimePaths` replaces `source venv/bin/activate`: instead of mutating the
//! bootstrapper's own environment, later steps receive this value and apply
//! the resolved variables to the child processes they spawn.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Paths of a created virtual environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Root of the venv
    pub env_dir: PathBuf,
    /// Interpreter inside the venv
    pub python: PathBuf,
    /// `bin` (unix) or `Scripts` (windows) directory
    pub bin_dir: PathBuf,
}

/// Interpreter plus the variables an activated shell would have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRuntime {
    pub interpreter: PathBuf,
    pub extra_env: Vec<(String, String)>,
    /// Variables activation unsets
    pub removed_env: Vec<String>,
}

impl RuntimePaths {
    /// Locate the interpreter of an existing venv. `None` if `env_dir` holds no venv.
    pub fn from_env_dir(env_dir: &Path) -> Option<Self> {
        let unix = env_dir.join("bin").join("python");
        if unix.exists() {
            return Some(Self {
                env_dir: env_dir.to_path_buf(),
                python: unix,
                bin_dir: env_dir.join("bin"),
            });
        }
        let windows = env_dir.join("Scripts").join("python.exe");
        if windows.exists() {
            return Some(Self {
                env_dir: env_dir.to_path_buf(),
                python: windows,
                bin_dir: env_dir.join("Scripts"),
            });
        }
        None
    }

    /// Resolve against the current process PATH.
    pub fn resolve(&self) -> ResolvedRuntime {
        self.resolve_with_path(std::env::var_os("PATH"))
    }

    /// Resolve with an explicit base PATH: the venv's bin dir goes first.
    pub fn resolve_with_path(&self, base_path: Option<OsString>) -> ResolvedRuntime {
        let mut dirs = vec![self.bin_dir.clone()];
        if let Some(ref p) = base_path {
            dirs.extend(std::env::split_paths(p));
        }
        let path = std::env::join_paths(&dirs)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| self.bin_dir.to_string_lossy().to_string());

        ResolvedRuntime {
            interpreter: self.python.clone(),
            extra_env: vec![
                (
                    "VIRTUAL_ENV".to_string(),
                    self.env_dir.to_string_lossy().to_string(),
                ),
                ("PATH".to_string(), path),
            ],
            removed_env: vec!["PYTHONHOME".to_string()],
        }
    }
}

impl ResolvedRuntime {
    /// Start a command on the venv interpreter with the activation variables applied.
    pub fn command(&self) -> crate::process::CommandSpec {
        let mut spec = crate::process::CommandSpec::new(&self.interpreter).envs(&self.extra_env);
        for key in &self.removed_env {
            spec = spec.env_remove(key.clone());
        }
        spec
    }
}
