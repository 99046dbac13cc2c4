//! `lamaboot setup`: bootstrap the DataLama development environment.
//!
//! Flow (fail-fast, no rollback):
//!   1. Ensure the runtime tool (ollama) is on PATH, installing it if allowed
//!   2. Create or reuse the Python venv
//!   3. pip install the requirements manifest into the venv
//!   4. Create and seed the data directory, only if it does not exist yet
//!   5. Optionally pull the model, then run the entry point inside the venv
//!
//! The venv is never "activated" in this process: step 2 returns
//! `RuntimePaths` and steps 3 and 5 apply it to the children they spawn.

use std::path::PathBuf;
use std::time::Instant;

use lamaboot_core::config::BootstrapConfig;
use lamaboot_core::error::{SetupError, Step};
use lamaboot_core::observability;
use lamaboot_runtime::env::builder::{self, EnvBuild};
use lamaboot_runtime::handoff;
use lamaboot_runtime::host::{HostProbe, SystemHost};
use lamaboot_runtime::manifest::{self, InstallOutcome};
use lamaboot_runtime::process::{CommandRunner, SystemRunner};
use lamaboot_runtime::seed::{self, SeedOutcome};
use lamaboot_runtime::tool::{
    self, HttpInstallerSource, InstallPolicy, InstallerSource, PathLocator, ToolLocator,
    ToolOutcome,
};

/// What a completed run did at each step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub tool: ToolOutcome,
    pub env: EnvBuild,
    pub deps: InstallOutcome,
    pub seed: SeedOutcome,
    /// false when handoff was skipped
    pub handed_off: bool,
}

/// Runs the bootstrap sequence against injected side-effect providers.
pub struct Bootstrapper<'a> {
    config: &'a BootstrapConfig,
    locator: &'a dyn ToolLocator,
    installer: &'a dyn InstallerSource,
    runner: &'a dyn CommandRunner,
    host: &'a dyn HostProbe,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(
        config: &'a BootstrapConfig,
        locator: &'a dyn ToolLocator,
        installer: &'a dyn InstallerSource,
        runner: &'a dyn CommandRunner,
        host: &'a dyn HostProbe,
    ) -> Self {
        Self {
            config,
            locator,
            installer,
            runner,
            host,
        }
    }

    pub fn run(&self) -> Result<SetupReport, SetupError> {
        let cfg = self.config;

        eprintln!("🔍 {}: Checking for {}...", banner(Step::ToolCheck), cfg.tool);
        let tool = self.step(Step::ToolCheck, ToolOutcome::label, || {
            let policy = InstallPolicy {
                url: &cfg.installer_url,
                expected_sha256: cfg.installer_sha256.as_deref(),
                allow_fetch: cfg.allow_installer,
            };
            tool::ensure_tool(&cfg.tool, &policy, self.locator, self.installer, self.runner)
        })?;
        match tool {
            ToolOutcome::AlreadyInstalled { ref path } => {
                eprintln!("   ✅ {} already installed ({})", cfg.tool, path.display())
            }
            ToolOutcome::Installed { ref sha256, .. } => {
                eprintln!("   ✅ {} installed (installer sha256 {})", cfg.tool, sha256)
            }
        }

        let env_dir = cfg.venv_path();
        eprintln!(
            "📦 {}: Preparing virtual environment at {}...",
            banner(Step::EnvCreate),
            env_dir.display()
        );
        let env = self.step(
            Step::EnvCreate,
            |b: &EnvBuild| if b.created { "created" } else { "reused" },
            || {
                let python = builder::find_base_python(cfg.python.as_deref(), self.locator)?;
                builder::ensure_environment(&env_dir, &python, self.runner)
            },
        )?;
        eprintln!(
            "   ✅ {} ({})",
            if env.created { "Created" } else { "Reusing" },
            env.paths.python.display()
        );

        let manifest_path = cfg.manifest_path();
        eprintln!("📥 {}: Installing {}...", banner(Step::DepsInstall), manifest_path.display());
        let deps = self.step(Step::DepsInstall, InstallOutcome::label, || {
            let manifest = manifest::load_manifest(&manifest_path)?;
            manifest::install_dependencies(&manifest, &env.paths, self.runner)
        })?;
        match deps {
            InstallOutcome::Installed { requirements } => {
                eprintln!("   ✅ Installed {} requirement(s)", requirements)
            }
            InstallOutcome::Empty => eprintln!("   ✅ Manifest is empty, nothing to install"),
        }

        let data_dir = cfg.data_path();
        eprintln!("🗂  {}: Seeding data directory {}...", banner(Step::DataSeed), data_dir.display());
        let seed = self.step(Step::DataSeed, SeedOutcome::label, || {
            seed::ensure_data_dir(&data_dir, &cfg.info_file, self.host)
        })?;
        match seed {
            SeedOutcome::Created { ref file, .. } => eprintln!("   ✅ Wrote {}", file.display()),
            SeedOutcome::Skipped { .. } => eprintln!("   ⏭ Data directory exists, leaving it untouched"),
        }

        if cfg.skip_handoff {
            eprintln!("⏭ {}: Skipping handoff (--skip-handoff)", banner(Step::Handoff));
            return Ok(SetupReport {
                tool,
                env,
                deps,
                seed,
                handed_off: false,
            });
        }

        let entry_point = cfg.entry_point_path();
        eprintln!("🚀 {}: Running {}...", banner(Step::Handoff), entry_point.display());
        self.step(Step::Handoff, |_: &()| "exited", || {
            if let Some(ref model) = cfg.pull_model {
                let tool_path = match tool {
                    ToolOutcome::AlreadyInstalled { ref path } => path.clone(),
                    ToolOutcome::Installed { path: Some(ref path), .. } => path.clone(),
                    ToolOutcome::Installed { path: None, .. } => PathBuf::from(&cfg.tool),
                };
                handoff::pull_model(&tool_path, model, self.runner)?;
            }
            handoff::run_entry_point(&entry_point, &cfg.project_dir, &env.paths, self.runner)
        })?;

        Ok(SetupReport {
            tool,
            env,
            deps,
            seed,
            handed_off: true,
        })
    }

    /// Run one step with audit records; map its failure to the step's error kind.
    fn step<T>(
        &self,
        step: Step,
        label: impl Fn(&T) -> &'static str,
        run: impl FnOnce() -> anyhow::Result<T>,
    ) -> Result<T, SetupError> {
        observability::audit_step_started(step);
        let start = Instant::now();
        match run() {
            Ok(value) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(step = %step, outcome = label(&value), duration_ms, "Step completed");
                observability::audit_step_completed(step, label(&value), duration_ms);
                Ok(value)
            }
            Err(e) => {
                let err = SetupError::from_step(step, e);
                observability::audit_step_failed(&err);
                Err(err)
            }
        }
    }
}

/// "Step n/5"
fn banner(step: Step) -> String {
    format!("Step {}/{}", step.ordinal(), Step::ALL.len())
}

/// `lamaboot setup`
pub fn cmd_setup(config: &BootstrapConfig) -> Result<SetupReport, SetupError> {
    eprintln!("🚀 Bootstrapping {}", config.project_dir.display());
    eprintln!();

    let installer = HttpInstallerSource::new();
    let report = Bootstrapper::new(config, &PathLocator, &installer, &SystemRunner, &SystemHost)
        .run()?;

    println!("Setup done");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamaboot_runtime::process::{CommandSpec, RunOutcome};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::path::Path;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Installer,
        Venv,
        Pip,
        Pull,
        Entry,
    }

    fn classify(spec: &CommandSpec) -> Call {
        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["-s"] => Call::Installer,
            ["-m", "venv", ..] => Call::Venv,
            ["-m", "pip", ..] => Call::Pip,
            ["pull", ..] => Call::Pull,
            _ => Call::Entry,
        }
    }

    /// Records every child process; `python -m venv` materializes an interpreter.
    struct FakeRunner {
        calls: RefCell<Vec<(Call, CommandSpec)>>,
        fail: Option<(Call, i32)>,
    }

    impl FakeRunner {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail: None,
            }
        }

        fn failing(call: Call, code: i32) -> Self {
            Self {
                fail: Some((call, code)),
                ..Self::new()
            }
        }

        fn kinds(&self) -> Vec<Call> {
            self.calls.borrow().iter().map(|(c, _)| *c).collect()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, spec: &CommandSpec) -> anyhow::Result<RunOutcome> {
            let call = classify(spec);
            self.calls.borrow_mut().push((call, spec.clone()));
            if let Some((failing, code)) = self.fail {
                if failing == call {
                    return Ok(RunOutcome {
                        code: Some(code),
                        ..Default::default()
                    });
                }
            }
            if call == Call::Venv {
                let dir = PathBuf::from(spec.args.last().unwrap());
                std::fs::create_dir_all(dir.join("bin"))?;
                std::fs::write(dir.join("bin").join("python"), "")?;
            }
            Ok(RunOutcome {
                code: Some(0),
                ..Default::default()
            })
        }
    }

    struct FakeLocator(HashMap<&'static str, PathBuf>);

    impl FakeLocator {
        fn with_tool() -> Self {
            Self(HashMap::from([
                ("ollama", PathBuf::from("/usr/local/bin/ollama")),
                ("python3", PathBuf::from("/usr/bin/python3")),
            ]))
        }

        fn without_tool() -> Self {
            Self(HashMap::from([("python3", PathBuf::from("/usr/bin/python3"))]))
        }
    }

    impl ToolLocator for FakeLocator {
        fn locate(&self, name: &str) -> Option<PathBuf> {
            self.0.get(name).cloned()
        }
    }

    struct FakeInstaller {
        calls: Cell<usize>,
    }

    impl FakeInstaller {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl InstallerSource for FakeInstaller {
        fn fetch(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            Ok(b"#!/bin/sh\nexit 0\n".to_vec())
        }
    }

    struct FakeHost;

    impl HostProbe for FakeHost {
        fn hostname(&self) -> anyhow::Result<String> {
            Ok("devbox".to_string())
        }

        fn os_name(&self) -> anyhow::Result<String> {
            Ok("Linux".to_string())
        }
    }

    /// Project with a manifest and an entry point, nothing else.
    fn project() -> (tempfile::TempDir, BootstrapConfig) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("requirements.txt"),
            "llama-index-core\nllama-index-llms-ollama\n",
        )
        .unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src").join("datalama.py"), "print('ok')\n").unwrap();
        let cfg = BootstrapConfig::for_project(tmp.path());
        (tmp, cfg)
    }

    fn run(
        cfg: &BootstrapConfig,
        locator: &FakeLocator,
        installer: &FakeInstaller,
        runner: &FakeRunner,
    ) -> Result<SetupReport, SetupError> {
        Bootstrapper::new(cfg, locator, installer, runner, &FakeHost).run()
    }

    fn dir_count(path: &Path) -> usize {
        std::fs::read_dir(path)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .count()
    }

    #[test]
    fn test_fresh_project_runs_every_step_in_order() {
        let (tmp, cfg) = project();
        let runner = FakeRunner::new();
        let report = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap();

        assert!(report.env.created);
        assert_eq!(report.deps, InstallOutcome::Installed { requirements: 2 });
        assert!(matches!(report.seed, SeedOutcome::Created { .. }));
        assert!(report.handed_off);
        assert_eq!(runner.kinds(), vec![Call::Venv, Call::Pip, Call::Entry]);

        // src/, venv/, data/
        assert_eq!(dir_count(tmp.path()), 3);
        let data: Vec<_> = std::fs::read_dir(tmp.path().join("data")).unwrap().collect();
        assert_eq!(data.len(), 1);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("data").join("example.txt")).unwrap(),
            "# Local Information:\nHostname: devbox\nOS: Linux\n"
        );
    }

    #[test]
    fn test_later_steps_run_inside_the_venv() {
        let (tmp, cfg) = project();
        let runner = FakeRunner::new();
        run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap();

        let venv_python = tmp.path().join("venv").join("bin").join("python");
        for (call, spec) in runner.calls.borrow().iter() {
            match call {
                Call::Venv => assert_eq!(spec.program, PathBuf::from("/usr/bin/python3")),
                Call::Pip | Call::Entry => {
                    assert_eq!(spec.program, venv_python);
                    assert!(spec
                        .env
                        .iter()
                        .any(|(k, v)| k == "VIRTUAL_ENV" && Path::new(v) == tmp.path().join("venv")));
                }
                other => panic!("unexpected call {other:?}"),
            }
        }
    }

    #[test]
    fn test_rerun_preserves_seed_file_and_reuses_venv() {
        let (tmp, cfg) = project();
        run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &FakeRunner::new()).unwrap();
        let info = tmp.path().join("data").join("example.txt");
        std::fs::write(&info, "# Local Information:\nHostname: edited\nOS: Linux\n").unwrap();
        let before = std::fs::read(&info).unwrap();

        let runner = FakeRunner::new();
        let report = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap();
        assert!(!report.env.created);
        assert!(matches!(report.seed, SeedOutcome::Skipped { .. }));
        assert_eq!(std::fs::read(&info).unwrap(), before);
        assert_eq!(runner.kinds(), vec![Call::Pip, Call::Entry]);
    }

    #[test]
    fn test_missing_manifest_stops_before_seed() {
        let (tmp, cfg) = project();
        std::fs::remove_file(tmp.path().join("requirements.txt")).unwrap();
        let runner = FakeRunner::new();

        let err = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap_err();
        assert!(matches!(err, SetupError::DependencyInstall { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(!tmp.path().join("data").exists());
        assert!(!runner.kinds().contains(&Call::Entry));
    }

    #[test]
    fn test_malformed_manifest_is_dependency_failure() {
        let (tmp, cfg) = project();
        std::fs::write(tmp.path().join("requirements.txt"), "not a requirement\n").unwrap();
        let runner = FakeRunner::new();
        let err = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap_err();
        assert!(matches!(err, SetupError::DependencyInstall { .. }));
        assert_eq!(runner.kinds(), vec![Call::Venv]);
    }

    #[test]
    fn test_present_tool_skips_installer() {
        let (_tmp, cfg) = project();
        let installer = FakeInstaller::new();
        let runner = FakeRunner::new();
        let report = run(&cfg, &FakeLocator::with_tool(), &installer, &runner).unwrap();
        assert_eq!(report.tool.label(), "already_installed");
        assert_eq!(installer.calls.get(), 0);
        assert!(!runner.kinds().contains(&Call::Installer));
    }

    #[test]
    fn test_missing_tool_is_installed_first() {
        let (_tmp, cfg) = project();
        let installer = FakeInstaller::new();
        let runner = FakeRunner::new();
        let report = run(&cfg, &FakeLocator::without_tool(), &installer, &runner).unwrap();
        assert_eq!(report.tool.label(), "installed");
        assert_eq!(installer.calls.get(), 1);
        assert_eq!(runner.kinds()[0], Call::Installer);
    }

    #[test]
    fn test_injected_failures_prevent_handoff() {
        for (failing, code) in [(Call::Installer, 3), (Call::Venv, 1), (Call::Pip, 2)] {
            let (tmp, cfg) = project();
            let runner = FakeRunner::failing(failing, code);
            let err = run(&cfg, &FakeLocator::without_tool(), &FakeInstaller::new(), &runner)
                .unwrap_err();
            let expected = match failing {
                Call::Installer => Step::ToolCheck,
                Call::Venv => Step::EnvCreate,
                _ => Step::DepsInstall,
            };
            assert_eq!(err.step(), expected);
            assert_eq!(err.child_exit_code(), Some(code), "{failing:?}");
            assert_eq!(err.exit_code(), code, "{failing:?}");
            assert!(!runner.kinds().contains(&Call::Entry), "{failing:?}");
            assert!(!tmp.path().join("data").exists(), "{failing:?}");
        }
    }

    #[test]
    fn test_seed_failure_prevents_handoff() {
        let (tmp, mut cfg) = project();
        // A regular file where a parent directory is needed.
        std::fs::write(tmp.path().join("blocker"), "").unwrap();
        cfg.data_dir = PathBuf::from("blocker/data");
        let runner = FakeRunner::new();
        let err = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap_err();
        assert!(matches!(err, SetupError::DataSeed { .. }));
        assert!(!runner.kinds().contains(&Call::Entry));
    }

    #[test]
    fn test_installer_disabled_and_checksum_pinning() {
        let (_tmp, mut cfg) = project();
        cfg.allow_installer = false;
        let installer = FakeInstaller::new();
        let err = run(&cfg, &FakeLocator::without_tool(), &installer, &FakeRunner::new())
            .unwrap_err();
        assert!(matches!(err, SetupError::ToolInstall { .. }));
        assert_eq!(installer.calls.get(), 0);

        cfg.allow_installer = true;
        cfg.installer_sha256 = Some("deadbeef".into());
        let runner = FakeRunner::new();
        let err = run(&cfg, &FakeLocator::without_tool(), &installer, &runner).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(runner.kinds().is_empty());
    }

    #[test]
    fn test_downstream_exit_code_propagates() {
        let (_tmp, cfg) = project();
        let runner = FakeRunner::failing(Call::Entry, 42);
        let err = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap_err();
        assert!(matches!(
            err,
            SetupError::Handoff {
                exit_code: Some(42),
                ..
            }
        ));
        assert_eq!(err.exit_code(), 42);
    }

    #[test]
    fn test_pull_model_before_entry_point() {
        let (_tmp, mut cfg) = project();
        cfg.pull_model = Some("llama3.1".into());
        let runner = FakeRunner::new();
        run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap();
        assert_eq!(runner.kinds(), vec![Call::Venv, Call::Pip, Call::Pull, Call::Entry]);
        let calls = runner.calls.borrow();
        assert_eq!(calls[2].1.display(), "/usr/local/bin/ollama pull llama3.1");

        let failing = FakeRunner::failing(Call::Pull, 1);
        let err = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &failing)
            .unwrap_err();
        assert_eq!(err.step(), Step::Handoff);
        assert!(!failing.kinds().contains(&Call::Entry));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_project_dir_creates_env_inside_project() {
        use lamaboot_runtime::process::SystemRunner;
        use std::os::unix::fs::PermissionsExt;

        // `tempdir_in(".")` yields a path relative to the cwd.
        let tmp = tempfile::Builder::new().tempdir_in(".").unwrap();
        assert!(tmp.path().is_relative());
        let python = tmp.path().join("fake-python");
        std::fs::write(&python, "#!/bin/sh\nmkdir -p \"$3/bin\" && touch \"$3/bin/python\"\n").unwrap();
        std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

        let cfg = BootstrapConfig::for_project(tmp.path());
        let build = builder::ensure_environment(&cfg.venv_path(), &python, &SystemRunner).unwrap();
        assert!(build.created);
        assert!(tmp.path().join("venv").join("bin").join("python").is_file());
        assert!(!tmp.path().join(tmp.path()).exists());
    }

    #[test]
    fn test_banner_numbers_follow_step_order() {
        let banners: Vec<String> = Step::ALL.iter().map(|s| banner(*s)).collect();
        assert_eq!(banners.first().map(String::as_str), Some("Step 1/5"));
        assert_eq!(banner(Step::Handoff), "Step 5/5");
        assert_eq!(banner(Step::DepsInstall), "Step 3/5");
    }

    #[test]
    fn test_skip_handoff() {
        let (tmp, mut cfg) = project();
        cfg.skip_handoff = true;
        let runner = FakeRunner::new();
        let report = run(&cfg, &FakeLocator::with_tool(), &FakeInstaller::new(), &runner).unwrap();
        assert!(!report.handed_off);
        assert!(tmp.path().join("data").join("example.txt").is_file());
        assert_eq!(runner.kinds(), vec![Call::Venv, Call::Pip]);
    }
}
