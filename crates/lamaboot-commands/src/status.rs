//! `lamaboot status`: report what a setup run would find, without changing anything.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use lamaboot_core::config::BootstrapConfig;
use lamaboot_runtime::manifest;
use lamaboot_runtime::runtime_resolver::RuntimePaths;
use lamaboot_runtime::tool::{PathLocator, ToolLocator};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub project_dir: PathBuf,
    pub tool: ToolStatus,
    pub env: EnvStatus,
    pub manifest: ManifestStatus,
    pub data: DataStatus,
    pub entry_point: EntryPointStatus,
}

#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub name: String,
    /// `None` when not on PATH
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct EnvStatus {
    pub dir: PathBuf,
    pub python: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ManifestStatus {
    pub path: PathBuf,
    pub present: bool,
    pub requirements: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataStatus {
    pub dir: PathBuf,
    pub present: bool,
    pub info_file: PathBuf,
    pub info_file_present: bool,
}

#[derive(Debug, Serialize)]
pub struct EntryPointStatus {
    pub path: PathBuf,
    pub present: bool,
}

impl StatusReport {
    /// True when a setup run would only need to hand off.
    pub fn is_ready(&self) -> bool {
        self.tool.path.is_some()
            && self.env.python.is_some()
            && self.manifest.error.is_none()
            && self.data.info_file_present
            && self.entry_point.present
    }
}

pub fn collect_status(config: &BootstrapConfig, locator: &dyn ToolLocator) -> StatusReport {
    let env_dir = config.venv_path();
    let manifest_path = config.manifest_path();
    let (requirements, error) = if manifest_path.is_file() {
        match manifest::load_manifest(&manifest_path) {
            Ok(m) => (Some(m.requirements.len()), None),
            Err(e) => (None, Some(e.to_string())),
        }
    } else {
        (None, Some(format!("{} not found", manifest_path.display())))
    };
    let data_dir = config.data_path();
    let info_file = config.info_file_path();
    let entry_point = config.entry_point_path();

    StatusReport {
        project_dir: config.project_dir.clone(),
        tool: ToolStatus {
            name: config.tool.clone(),
            path: locator.locate(&config.tool),
        },
        env: EnvStatus {
            python: RuntimePaths::from_env_dir(&env_dir).map(|p| p.python),
            dir: env_dir,
        },
        manifest: ManifestStatus {
            present: manifest_path.is_file(),
            path: manifest_path,
            requirements,
            error,
        },
        data: DataStatus {
            present: data_dir.is_dir(),
            dir: data_dir,
            info_file_present: info_file.is_file(),
            info_file,
        },
        entry_point: EntryPointStatus {
            present: entry_point.is_file(),
            path: entry_point,
        },
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

/// `lamaboot status`
pub fn cmd_status(config: &BootstrapConfig, json: bool) -> Result<()> {
    let report = collect_status(config, &PathLocator);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📋 {}", report.project_dir.display());
    println!();
    match report.tool.path {
        Some(ref p) => println!("  {} {}: {}", mark(true), report.tool.name, p.display()),
        None => println!("  {} {}: not on PATH", mark(false), report.tool.name),
    }
    match report.env.python {
        Some(ref p) => println!("  {} venv: {}", mark(true), p.display()),
        None => println!("  {} venv: {} (not created)", mark(false), report.env.dir.display()),
    }
    match (&report.manifest.requirements, &report.manifest.error) {
        (Some(n), _) => println!(
            "  {} manifest: {} ({} requirement(s))",
            mark(true),
            report.manifest.path.display(),
            n
        ),
        (None, Some(e)) => println!("  {} manifest: {}", mark(false), e),
        (None, None) => println!("  {} manifest: {}", mark(false), report.manifest.path.display()),
    }
    if report.data.present {
        println!(
            "  {} data: {} (info file {})",
            mark(report.data.info_file_present),
            report.data.dir.display(),
            if report.data.info_file_present { "present" } else { "missing" }
        );
    } else {
        println!("  {} data: {} (not seeded)", mark(false), report.data.dir.display());
    }
    println!(
        "  {} entry point: {}",
        mark(report.entry_point.present),
        report.entry_point.path.display()
    );
    println!();
    if report.is_ready() {
        println!("Ready: `lamaboot setup` will only run the entry point.");
    } else {
        println!("Run `lamaboot setup` to complete the environment.");
    }
    Ok(())
}
