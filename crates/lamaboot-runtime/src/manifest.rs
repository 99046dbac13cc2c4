//! Dependency manifest (`requirements.txt`): parse, validate, install.
//!
//! Parsing only validates the file and counts requirements; installation is
//! delegated to `pip install -r` so pip's own option handling (`-r`, `-e`,
//! `--index-url`, ...) stays authoritative.

use anyhow::Context;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::process::CommandRunner;
use crate::runtime_resolver::RuntimePaths;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Dependency manifest not found: {0}")]
    Missing(PathBuf),

    #[error("Cannot read dependency manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed requirement on line {line}: '{content}' ({reason})")]
    Malformed {
        line: usize,
        content: String,
        reason: &'static str,
    },
}

/// One requirement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// 1-based line where the (possibly continued) entry starts
    pub line: usize,
    /// Project name, or the whole entry for URL / path requirements
    pub name: String,
    pub spec: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
    /// Lines starting with `-` (`-r other.txt`, `--index-url ...`)
    pub options: Vec<String>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty() && self.options.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { requirements: usize },
    /// Manifest declared nothing; pip was not invoked
    Empty,
}

impl InstallOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            InstallOutcome::Installed { .. } => "installed",
            InstallOutcome::Empty => "empty",
        }
    }
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[A-Za-z0-9._,\s-]*\])?\s*(?P<rest>.*)$",
        )
        .expect("valid requirement regex")
    })
}

const VERSION_OPERATORS: &[&str] = &["===", "==", ">=", "<=", "~=", "!=", "<", ">"];
const URL_PREFIXES: &[&str] = &[
    "git+", "hg+", "svn+", "bzr+", "http://", "https://", "file:", "./", "../", "/", "~",
];
const ARCHIVE_SUFFIXES: &[&str] = &[".whl", ".tar.gz", ".tar.bz2", ".zip"];

/// URL, VCS or local path entries (`.`, `./pkg`, `libs/pkg`, `dist/x.whl`).
/// Project names never start with `.` nor contain a path separator.
fn is_path_or_url(entry: &str) -> bool {
    if URL_PREFIXES.iter().any(|p| entry.starts_with(p)) {
        return true;
    }
    let head = entry
        .split(|c: char| c.is_whitespace() || c == ';')
        .next()
        .unwrap_or("");
    head.starts_with('.')
        || head.contains('/')
        || head.contains('\\')
        || ARCHIVE_SUFFIXES.iter().any(|s| head.ends_with(s))
}

/// Drop a trailing `#` comment. A `#` only starts a comment at line start or
/// after whitespace, so URL fragments like `#egg=` survive.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

fn check_version_clause(clause: &str) -> Result<(), &'static str> {
    let Some(op) = VERSION_OPERATORS.iter().find(|op| clause.starts_with(*op)) else {
        return Err("expected a version specifier, marker or URL");
    };
    let version = clause[op.len()..]
        .split(&[';', ','][..])
        .next()
        .unwrap_or("")
        .trim();
    if version.is_empty() {
        return Err("missing version after operator");
    }
    Ok(())
}

fn parse_requirement(line: usize, entry: &str) -> Result<Requirement, ManifestError> {
    if is_path_or_url(entry) {
        return Ok(Requirement {
            line,
            name: entry.to_string(),
            spec: entry.to_string(),
        });
    }
    let malformed = |reason| ManifestError::Malformed {
        line,
        content: entry.to_string(),
        reason,
    };
    let caps = name_re()
        .captures(entry)
        .ok_or_else(|| malformed("invalid project name"))?;
    let rest = caps.name("rest").map_or("", |m| m.as_str()).trim();

    // PEP 508 also allows `name (>=1.0)`.
    if let Some(inner) = rest.strip_prefix('(') {
        let close = inner
            .find(')')
            .ok_or_else(|| malformed("unclosed version parenthesis"))?;
        check_version_clause(inner[..close].trim()).map_err(malformed)?;
        let tail = inner[close + 1..].trim();
        if !tail.is_empty() && !tail.starts_with(';') {
            return Err(malformed("unexpected text after version"));
        }
    } else if !(rest.is_empty() || rest.starts_with(';') || rest.starts_with('@')) {
        check_version_clause(rest).map_err(malformed)?;
    }

    Ok(Requirement {
        line,
        name: caps["name"].to_string(),
        spec: entry.to_string(),
    })
}

/// Parse manifest text. Backslash continuations are joined, comments and blank
/// lines skipped.
pub fn parse_manifest(path: &Path, content: &str) -> Result<Manifest, ManifestError> {
    let mut requirements = Vec::new();
    let mut options = Vec::new();
    let mut pending = String::new();
    let mut pending_start = 0;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw);
        if pending.is_empty() {
            pending_start = line_no;
        }
        let trimmed = line.trim_end();
        if let Some(head) = trimmed.strip_suffix('\\') {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(trimmed);

        let entry = pending.trim().to_string();
        pending.clear();
        if entry.is_empty() {
            continue;
        }
        if entry.starts_with('-') {
            options.push(entry);
        } else {
            requirements.push(parse_requirement(pending_start, &entry)?);
        }
    }
    let tail = pending.trim();
    if !tail.is_empty() {
        if tail.starts_with('-') {
            options.push(tail.to_string());
        } else {
            requirements.push(parse_requirement(pending_start, tail)?);
        }
    }

    Ok(Manifest {
        path: path.to_path_buf(),
        requirements,
        options,
    })
}

pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.is_file() {
        return Err(ManifestError::Missing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(path, &content)
}

/// Install every manifest entry into the venv with `python -m pip install -r`.
pub fn install_dependencies(
    manifest: &Manifest,
    runtime: &RuntimePaths,
    runner: &dyn CommandRunner,
) -> anyhow::Result<InstallOutcome> {
    if manifest.is_empty() {
        crate::info_log!(manifest = %manifest.path.display(), "Manifest declares no packages");
        return Ok(InstallOutcome::Empty);
    }

    // pip runs next to the manifest so `./local` entries resolve; the `-r`
    // argument is then just the file name.
    let spec = runtime.resolve().command().args(["-m", "pip", "install", "-r"]);
    let spec = match (
        manifest.path.parent().filter(|p| p.is_dir()),
        manifest.path.file_name(),
    ) {
        (Some(dir), Some(name)) => spec.arg(name.to_string_lossy().to_string()).cwd(dir),
        _ => spec.arg(manifest.path.to_string_lossy().to_string()),
    };

    crate::info_log!(
        requirements = manifest.requirements.len(),
        command = %spec.display(),
        "Installing dependencies"
    );
    let out = runner.run(&spec).context("pip install")?;
    if !out.success() {
        return Err(anyhow::Error::new(out.exit_error(&spec))
            .context(format!("pip install failed ({})", out.describe())));
    }
    Ok(InstallOutcome::Installed {
        requirements: manifest.requirements.len(),
    })
}
