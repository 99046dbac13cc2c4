//! Local host identity: hostname and OS kernel name.

use anyhow::Result;

/// Source of the two facts written into the seed file.
pub trait HostProbe {
    fn hostname(&self) -> Result<String>;
    /// Kernel / OS family name as `uname -s` reports it (e.g. "Linux", "Darwin").
    fn os_name(&self) -> Result<String>;
}

/// Reads identity from the running system via `gethostname(2)` / `uname(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

#[cfg(unix)]
impl HostProbe for SystemHost {
    fn hostname(&self) -> Result<String> {
        use anyhow::Context;
        let name = nix::unistd::gethostname().context("gethostname failed")?;
        Ok(name.to_string_lossy().trim().to_string())
    }

    fn os_name(&self) -> Result<String> {
        use anyhow::Context;
        let uts = nix::sys::utsname::uname().context("uname failed")?;
        Ok(uts.sysname().to_string_lossy().trim().to_string())
    }
}

#[cfg(not(unix))]
impl HostProbe for SystemHost {
    fn hostname(&self) -> Result<String> {
        std::env::var("COMPUTERNAME")
            .map_err(|_| anyhow::anyhow!("COMPUTERNAME is not set"))
    }

    fn os_name(&self) -> Result<String> {
        Ok(match std::env::consts::OS {
            "windows" => "Windows_NT".to_string(),
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_system_host_reports_non_empty_identity() {
        let host = SystemHost;
        assert!(!host.hostname().unwrap().is_empty());
        let os = host.os_name().unwrap();
        assert!(!os.is_empty());
        #[cfg(target_os = "linux")]
        assert_eq!(os, "Linux");
        #[cfg(target_os = "macos")]
        assert_eq!(os, "Darwin");
    }
}
