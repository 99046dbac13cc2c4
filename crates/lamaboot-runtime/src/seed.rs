//! Data directory seeding.
//!
//! The directory's existence is the only guard: when it exists nothing is
//! touched, when it is missing it is created, the host info file is written,
//! and the new tree gets `0o755`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::host::HostProbe;

pub const INFO_HEADER: &str = "# Local Information:";

/// rwx for owner, r-x for group and other.
pub const DATA_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created { dir: PathBuf, file: PathBuf },
    Skipped { dir: PathBuf },
}

impl SeedOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SeedOutcome::Created { .. } => "created",
            SeedOutcome::Skipped { .. } => "skipped",
        }
    }
}

/// The three-line info file body.
pub fn render_info(hostname: &str, os_name: &str) -> String {
    format!("{}\nHostname: {}\nOS: {}\n", INFO_HEADER, hostname, os_name)
}

/// Create and seed `data_dir` unless it already exists.
pub fn ensure_data_dir(
    data_dir: &Path,
    info_file: &str,
    host: &dyn HostProbe,
) -> Result<SeedOutcome> {
    if data_dir.exists() {
        crate::info_log!(data_dir = %data_dir.display(), "Data directory exists, skipping seed");
        return Ok(SeedOutcome::Skipped {
            dir: data_dir.to_path_buf(),
        });
    }

    // Probe before creating anything: a directory without its info file would
    // never be seeded on a later run.
    let hostname = host.hostname().context("Resolve local hostname")?;
    let os_name = host.os_name().context("Resolve OS name")?;

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Create data dir {}", data_dir.display()))?;
    let file = data_dir.join(info_file);
    std::fs::write(&file, render_info(&hostname, &os_name))
        .with_context(|| format!("Write {}", file.display()))?;
    grant_tree_permissions(data_dir, DATA_DIR_MODE)?;

    crate::info_log!(file = %file.display(), "Seeded data directory");
    Ok(SeedOutcome::Created {
        dir: data_dir.to_path_buf(),
        file,
    })
}

/// Apply `mode` to `root` and everything below it, like `chmod -R`.
/// Symlinks are neither followed nor changed.
#[cfg(unix)]
pub fn grant_tree_permissions(root: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("Walk {}", root.display()))?;
        if entry.path_is_symlink() {
            continue;
        }
        std::fs::set_permissions(entry.path(), std::fs::Permissions::from_mode(mode))
            .with_context(|| format!("chmod {:o} {}", mode, entry.path().display()))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn grant_tree_permissions(_root: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Host {
        name: &'static str,
        os: &'static str,
        fail: bool,
    }

    impl HostProbe for Host {
        fn hostname(&self) -> Result<String> {
            if self.fail {
                anyhow::bail!("gethostname failed");
            }
            Ok(self.name.to_string())
        }

        fn os_name(&self) -> Result<String> {
            Ok(self.os.to_string())
        }
    }

    const DEVBOX: Host = Host {
        name: "devbox",
        os: "Linux",
        fail: false,
    };

    #[test]
    fn test_render_info_exact() {
        assert_eq!(
            render_info("devbox", "Linux"),
            "# Local Information:\nHostname: devbox\nOS: Linux\n"
        );
    }

    #[test]
    fn test_creates_dir_with_single_file() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        let out = ensure_data_dir(&data, "example.txt", &DEVBOX).unwrap();
        assert_eq!(out.label(), "created");

        let entries: Vec<_> = std::fs::read_dir(&data).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let content = std::fs::read_to_string(data.join("example.txt")).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content, "# Local Information:\nHostname: devbox\nOS: Linux\n");
    }

    #[test]
    fn test_existing_dir_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("notes.md"), "mine").unwrap();

        let out = ensure_data_dir(&data, "example.txt", &DEVBOX).unwrap();
        assert_eq!(out, SeedOutcome::Skipped { dir: data.clone() });
        assert!(!data.join("example.txt").exists());
        assert_eq!(std::fs::read_to_string(data.join("notes.md")).unwrap(), "mine");
    }

    #[test]
    fn test_host_lookup_failure_creates_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        let host = Host {
            fail: true,
            ..DEVBOX
        };
        assert!(ensure_data_dir(&data, "example.txt", &host).is_err());
        assert!(!data.exists());
    }

    #[test]
    fn test_creates_missing_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("var").join("data");
        ensure_data_dir(&data, "example.txt", &DEVBOX).unwrap();
        assert!(data.join("example.txt").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_tree_gets_mode_755() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        ensure_data_dir(&data, "example.txt", &DEVBOX).unwrap();
        for p in [data.clone(), data.join("example.txt")] {
            let mode = std::fs::metadata(&p).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o755, "{}", p.display());
        }
    }
}
