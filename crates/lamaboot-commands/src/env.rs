//! Environment management: `lamaboot clean`.
//!
//! Removes the project's venv (and with `--data` the seeded data directory) so
//! the next `lamaboot setup` recreates them from scratch.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use lamaboot_core::config::BootstrapConfig;

/// A directory `clean` would remove, with its size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanTarget {
    pub label: &'static str,
    pub path: PathBuf,
    pub size: u64,
}

/// Existing directories to remove. Missing ones are skipped.
pub fn clean_targets(config: &BootstrapConfig, include_data: bool) -> Vec<CleanTarget> {
    let mut candidates = vec![("venv", config.venv_path())];
    if include_data {
        candidates.push(("data", config.data_path()));
    }
    candidates
        .into_iter()
        .filter(|(_, path)| path.is_dir())
        .map(|(label, path)| CleanTarget {
            label,
            size: dir_size(&path),
            path,
        })
        .collect()
}

/// Remove every target. Returns (removed, failed) counts.
pub fn remove_targets(targets: &[CleanTarget]) -> (usize, usize) {
    let mut removed = 0;
    let mut errors = 0;
    for target in targets {
        match fs::remove_dir_all(&target.path) {
            Ok(()) => {
                tracing::debug!(path = %target.path.display(), "Removed");
                removed += 1;
            }
            Err(e) => {
                eprintln!("  ✗ Failed to remove {}: {}", target.path.display(), e);
                errors += 1;
            }
        }
    }
    (removed, errors)
}

/// `lamaboot clean`
pub fn cmd_clean(config: &BootstrapConfig, dry_run: bool, force: bool, include_data: bool) -> Result<()> {
    let targets = clean_targets(config, include_data);
    if targets.is_empty() {
        eprintln!("Nothing to clean in {}", config.project_dir.display());
        return Ok(());
    }

    let total_size: u64 = targets.iter().map(|t| t.size).sum();
    eprintln!("🗂  Directories to remove in {}:", config.project_dir.display());
    eprintln!();
    for t in &targets {
        eprintln!("  • {}: {} ({})", t.label, t.path.display(), format_size(t.size));
    }
    eprintln!();
    eprintln!("Total: {}", format_size(total_size));

    if dry_run {
        eprintln!();
        eprintln!("(Dry run: nothing removed. Drop --dry-run to delete.)");
        return Ok(());
    }

    if !force {
        eprint!("\nRemove these directories? [y/N] ");
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let (removed, errors) = remove_targets(&targets);
    eprintln!();
    if errors == 0 {
        eprintln!("✓ Removed {} director(ies), freed {}", removed, format_size(total_size));
    } else {
        eprintln!("⚠ Removed {}/{} directories ({} errors)", removed, targets.len(), errors);
        anyhow::bail!("{} director(ies) could not be removed", errors);
    }
    Ok(())
}

/// Total size of a directory, recursively. Symlinks are not followed.
fn dir_size(path: &Path) -> u64 {
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
