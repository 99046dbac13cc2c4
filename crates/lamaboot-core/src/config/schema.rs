//! Typed configuration grouped by concern.
//!
//! Loaded from environment variables with shared fallback logic.

use super::env_keys::{handoff, observability as obv_keys, paths, python, tool};
use super::loader::{env_bool, env_optional, env_or};
use std::path::{Path, PathBuf};

pub const DEFAULT_TOOL: &str = "ollama";
pub const DEFAULT_INSTALLER_URL: &str = "https://ollama.com/install.sh";
pub const DEFAULT_VENV_DIR: &str = "venv";
pub const DEFAULT_MANIFEST: &str = "requirements.txt";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_INFO_FILE: &str = "example.txt";
pub const DEFAULT_ENTRY_POINT: &str = "src/datalama.py";

/// Every fixed name, path and URL the bootstrap sequence touches.
///
/// `project_dir` is always absolute; relative paths resolve against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub project_dir: PathBuf,
    /// Executable looked up on PATH (and installed when missing)
    pub tool: String,
    pub installer_url: String,
    /// Hex SHA-256 the fetched installer must match, if pinned
    pub installer_sha256: Option<String>,
    /// When false a missing tool is a hard failure and nothing is fetched
    pub allow_installer: bool,
    /// Base interpreter for `-m venv`; `None` probes python3 then python
    pub python: Option<String>,
    pub venv_dir: PathBuf,
    pub manifest: PathBuf,
    pub data_dir: PathBuf,
    pub info_file: String,
    pub entry_point: PathBuf,
    /// Model pulled through the tool right before handoff
    pub pull_model: Option<String>,
    pub skip_handoff: bool,
}

/// Command-line overrides; `None` keeps the env/default value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub project_dir: Option<PathBuf>,
    pub venv_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub entry_point: Option<PathBuf>,
    pub python: Option<String>,
    pub pull_model: Option<String>,
    pub no_install: bool,
    pub skip_handoff: bool,
}

impl BootstrapConfig {
    /// Defaults rooted at `project_dir`, ignoring the environment.
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: absolutize(project_dir.into()),
            tool: DEFAULT_TOOL.to_string(),
            installer_url: DEFAULT_INSTALLER_URL.to_string(),
            installer_sha256: None,
            allow_installer: true,
            python: None,
            venv_dir: PathBuf::from(DEFAULT_VENV_DIR),
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            info_file: DEFAULT_INFO_FILE.to_string(),
            entry_point: PathBuf::from(DEFAULT_ENTRY_POINT),
            pull_model: None,
            skip_handoff: false,
        }
    }

    /// Load from environment (and `.env`), falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_env_for(None)
    }

    /// Like `from_env`, with the project dir given up front (`--project-dir`).
    ///
    /// `.env` is read from the current directory, then from the project dir.
    /// Neither overrides a variable that is already set, so the process
    /// environment wins over the cwd file, which wins over the project file.
    pub fn from_env_for(project_dir: Option<PathBuf>) -> Self {
        super::loader::load_dotenv();
        let project_dir = project_dir
            .or_else(|| env_optional(paths::LAMABOOT_PROJECT_DIR, &[]).map(PathBuf::from))
            .map(absolutize)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        super::loader::load_dotenv_from_dir(&project_dir);

        Self {
            project_dir,
            tool: env_or(tool::LAMABOOT_TOOL, &[], || DEFAULT_TOOL.to_string()),
            installer_url: env_or(tool::LAMABOOT_INSTALLER_URL, &[], || {
                DEFAULT_INSTALLER_URL.to_string()
            }),
            installer_sha256: env_optional(tool::LAMABOOT_INSTALLER_SHA256, &[])
                .map(|s| s.to_lowercase()),
            allow_installer: env_bool(tool::LAMABOOT_ALLOW_INSTALLER, &[], true),
            python: env_optional(python::LAMABOOT_PYTHON, python::PYTHON_ALIASES),
            venv_dir: PathBuf::from(env_or(
                paths::LAMABOOT_VENV_DIR,
                paths::VENV_DIR_ALIASES,
                || DEFAULT_VENV_DIR.to_string(),
            )),
            manifest: PathBuf::from(env_or(paths::LAMABOOT_MANIFEST, &[], || {
                DEFAULT_MANIFEST.to_string()
            })),
            data_dir: PathBuf::from(env_or(
                paths::LAMABOOT_DATA_DIR,
                paths::DATA_DIR_ALIASES,
                || DEFAULT_DATA_DIR.to_string(),
            )),
            info_file: env_or(paths::LAMABOOT_INFO_FILE, &[], || {
                DEFAULT_INFO_FILE.to_string()
            }),
            entry_point: PathBuf::from(env_or(paths::LAMABOOT_ENTRY_POINT, &[], || {
                DEFAULT_ENTRY_POINT.to_string()
            })),
            pull_model: env_optional(tool::LAMABOOT_PULL_MODEL, &[]),
            skip_handoff: env_bool(handoff::LAMABOOT_SKIP_HANDOFF, &[], false),
        }
    }

    pub fn with_cli_overrides(mut self, cli: CliOverrides) -> Self {
        if let Some(dir) = cli.project_dir {
            self.project_dir = absolutize(dir);
        }
        if let Some(v) = cli.venv_dir {
            self.venv_dir = v;
        }
        if let Some(m) = cli.manifest {
            self.manifest = m;
        }
        if let Some(d) = cli.data_dir {
            self.data_dir = d;
        }
        if let Some(e) = cli.entry_point {
            self.entry_point = e;
        }
        if cli.python.is_some() {
            self.python = cli.python;
        }
        if cli.pull_model.is_some() {
            self.pull_model = cli.pull_model;
        }
        if cli.no_install {
            self.allow_installer = false;
        }
        self.skip_handoff |= cli.skip_handoff;
        self
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.project_dir.join(p)
        }
    }

    pub fn venv_path(&self) -> PathBuf {
        self.resolve(&self.venv_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(&self.manifest)
    }

    pub fn data_path(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    pub fn info_file_path(&self) -> PathBuf {
        self.data_path().join(&self.info_file)
    }

    pub fn entry_point_path(&self) -> PathBuf {
        self.resolve(&self.entry_point)
    }
}

/// Anchor a relative path at the current directory. Child processes run with
/// their own cwd, so paths handed to them must not depend on ours.
fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

/// Observability: quiet, log_level, log_json, audit_log
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::LAMABOOT_QUIET, &[], false),
                log_level: env_or(obv_keys::LAMABOOT_LOG_LEVEL, &[], || {
                    "lamaboot=info".to_string()
                }),
                log_json: env_bool(obv_keys::LAMABOOT_LOG_JSON, &[], false),
                audit_log: env_optional(obv_keys::LAMABOOT_AUDIT_LOG, &[]),
            }
        })
    }
}
