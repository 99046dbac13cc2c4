//! Runtime tool provisioning (Ollama by default).
//!
//! The tool is looked up on PATH first; only when it is missing is the remote
//! installer fetched and piped to `sh`. The fetched script is the trust
//! boundary: it can be pinned to a SHA-256, or fetching can be disabled.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::process::{CommandRunner, CommandSpec};

/// Upper bound on installer size; anything larger is not a shell script.
pub const MAX_INSTALLER_BYTES: u64 = 8 * 1024 * 1024;

/// Finds executables on PATH.
pub trait ToolLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// PATH lookup via the `which` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

/// Fetches installer scripts.
pub trait InstallerSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTPS fetch with ureq.
#[cfg(feature = "installer")]
pub struct HttpInstallerSource {
    agent: ureq::Agent,
}

#[cfg(feature = "installer")]
impl HttpInstallerSource {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(std::time::Duration::from_secs(10))
                .timeout_read(std::time::Duration::from_secs(60))
                .build(),
        }
    }
}

#[cfg(feature = "installer")]
impl Default for HttpInstallerSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "installer")]
impl InstallerSource for HttpInstallerSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        use std::io::Read;

        let response = self.agent.get(url).call().map_err(|e| match &e {
            ureq::Error::Status(code, _) => {
                anyhow::anyhow!("Installer download returned HTTP {}: {}", code, e)
            }
            ureq::Error::Transport(_) => {
                anyhow::anyhow!("Cannot reach installer at {} : {}", url, e)
            }
        })?;

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_INSTALLER_BYTES + 1)
            .read_to_end(&mut body)
            .context("Read installer body")?;
        if body.len() as u64 > MAX_INSTALLER_BYTES {
            anyhow::bail!("Installer at {} exceeds {} bytes", url, MAX_INSTALLER_BYTES);
        }
        Ok(body)
    }
}

/// Used when the crate is built without the `installer` feature.
#[cfg(not(feature = "installer"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpInstallerSource;

#[cfg(not(feature = "installer"))]
impl HttpInstallerSource {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(feature = "installer"))]
impl InstallerSource for HttpInstallerSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        anyhow::bail!(
            "Cannot fetch {}: built without the `installer` feature",
            url
        )
    }
}

/// How a missing tool may be installed.
#[derive(Debug, Clone)]
pub struct InstallPolicy<'a> {
    pub url: &'a str,
    /// Lowercase hex SHA-256 the installer must match
    pub expected_sha256: Option<&'a str>,
    pub allow_fetch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Found on PATH; nothing was fetched
    AlreadyInstalled { path: PathBuf },
    /// Installer ran successfully; `path` is `None` if the tool is still not
    /// on this process's PATH afterwards
    Installed {
        sha256: String,
        path: Option<PathBuf>,
    },
}

impl ToolOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ToolOutcome::AlreadyInstalled { .. } => "already_installed",
            ToolOutcome::Installed { .. } => "installed",
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

/// Ensure `name` is on PATH, installing it through the policy's installer otherwise.
pub fn ensure_tool(
    name: &str,
    policy: &InstallPolicy<'_>,
    locator: &dyn ToolLocator,
    source: &dyn InstallerSource,
    runner: &dyn CommandRunner,
) -> Result<ToolOutcome> {
    if let Some(path) = locator.locate(name) {
        crate::info_log!(tool = %name, path = %path.display(), "Tool already installed");
        return Ok(ToolOutcome::AlreadyInstalled { path });
    }

    if !policy.allow_fetch {
        anyhow::bail!(
            "`{}` is not on PATH and installer fetching is disabled; install it manually",
            name
        );
    }
    if !policy.url.starts_with("https://") {
        anyhow::bail!("Refusing to fetch installer over a non-HTTPS URL: {}", policy.url);
    }

    crate::info_log!(tool = %name, url = %policy.url, "Fetching installer");
    let script = source
        .fetch(policy.url)
        .with_context(|| format!("Fetch installer for `{}`", name))?;

    let digest = sha256_hex(&script);
    if let Some(expected) = policy.expected_sha256 {
        if !digest.eq_ignore_ascii_case(expected.trim()) {
            anyhow::bail!(
                "Installer checksum mismatch for {}: expected {}, got {}",
                policy.url,
                expected,
                digest
            );
        }
    }
    lamaboot_core::observability::audit_installer_fetched(
        policy.url,
        &digest,
        policy.expected_sha256.is_some(),
    );

    let spec = CommandSpec::new("sh").arg("-s").stdin(script);
    let out = runner.run(&spec).context("Run installer")?;
    if !out.success() {
        return Err(anyhow::Error::new(out.exit_error(&spec))
            .context(format!("Installer for `{}` failed ({})", name, out.describe())));
    }

    let path = locator.locate(name);
    if path.is_none() {
        tracing::warn!(tool = %name, "Installer finished but tool is still not on PATH");
    }
    Ok(ToolOutcome::Installed {
        sha256: digest,
        path,
    })
}
