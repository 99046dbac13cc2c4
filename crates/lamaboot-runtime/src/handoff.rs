//! Final handoff: optional model pull, then the downstream entry point.

use anyhow::{Context, Result};
use std::path::Path;

use crate::process::{CommandRunner, CommandSpec};
use crate::runtime_resolver::RuntimePaths;

/// `<tool> pull <model>` so the downstream program finds the model locally.
pub fn pull_model(tool: &Path, model: &str, runner: &dyn CommandRunner) -> Result<()> {
    let spec = CommandSpec::new(tool).arg("pull").arg(model);
    crate::info_log!(command = %spec.display(), "Pulling model");
    let out = runner.run(&spec).context("Pull model")?;
    if !out.success() {
        return Err(anyhow::Error::new(out.exit_error(&spec))
            .context(format!("Pull model {} failed ({})", model, out.describe())));
    }
    Ok(())
}

/// Run the entry point on the venv interpreter with no arguments, streaming
/// its output. A non-zero exit is returned as a `ChildExit` error.
pub fn run_entry_point(
    entry_point: &Path,
    project_dir: &Path,
    runtime: &RuntimePaths,
    runner: &dyn CommandRunner,
) -> Result<()> {
    if !entry_point.is_file() {
        anyhow::bail!("Entry point not found: {}", entry_point.display());
    }
    let spec = runtime
        .resolve()
        .command()
        .arg(entry_point.to_string_lossy().to_string())
        .cwd(project_dir);
    crate::info_log!(command = %spec.display(), "Handing off to downstream program");
    let out = runner
        .run(&spec)
        .with_context(|| format!("Start {}", entry_point.display()))?;
    if !out.success() {
        return Err(out.exit_error(&spec).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RunOutcome;
    use lamaboot_core::error::ChildExit;
    use std::cell::RefCell;
    use std::path::PathBuf;

    struct Runner {
        code: i32,
        seen: RefCell<Vec<CommandSpec>>,
    }

    impl CommandRunner for Runner {
        fn run(&self, spec: &CommandSpec) -> Result<RunOutcome> {
            self.seen.borrow_mut().push(spec.clone());
            Ok(RunOutcome {
                code: Some(self.code),
                ..Default::default()
            })
        }
    }

    fn runtime(root: &Path) -> RuntimePaths {
        RuntimePaths {
            env_dir: root.join("venv"),
            python: root.join("venv").join("bin").join("python"),
            bin_dir: root.join("venv").join("bin"),
        }
    }

    #[test]
    fn test_entry_point_runs_without_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = tmp.path().join("src").join("datalama.py");
        std::fs::create_dir_all(entry.parent().unwrap()).unwrap();
        std::fs::write(&entry, "print('hi')\n").unwrap();
        let runner = Runner {
            code: 0,
            seen: RefCell::new(Vec::new()),
        };

        run_entry_point(&entry, tmp.path(), &runtime(tmp.path()), &runner).unwrap();
        let seen = runner.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].program, tmp.path().join("venv/bin/python"));
        assert_eq!(seen[0].args, vec![entry.to_string_lossy().to_string()]);
        assert!(!seen[0].capture);
        assert_eq!(seen[0].cwd.as_deref(), Some(tmp.path()));
    }

    #[test]
    fn test_non_zero_exit_carries_code() {
        let tmp = tempfile::tempdir().unwrap();
        let entry = tmp.path().join("app.py");
        std::fs::write(&entry, "raise SystemExit(4)\n").unwrap();
        let runner = Runner {
            code: 4,
            seen: RefCell::new(Vec::new()),
        };
        let err = run_entry_point(&entry, tmp.path(), &runtime(tmp.path()), &runner).unwrap_err();
        let exit = err.downcast_ref::<ChildExit>().unwrap();
        assert_eq!(exit.code, Some(4));
        assert!(err.to_string().contains("exit code 4"));
    }

    #[test]
    fn test_missing_entry_point_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = Runner {
            code: 0,
            seen: RefCell::new(Vec::new()),
        };
        let err = run_entry_point(
            &tmp.path().join("src/datalama.py"),
            tmp.path(),
            &runtime(tmp.path()),
            &runner,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Entry point not found"));
        assert!(runner.seen.borrow().is_empty());
    }

    #[test]
    fn test_pull_model() {
        let runner = Runner {
            code: 0,
            seen: RefCell::new(Vec::new()),
        };
        pull_model(&PathBuf::from("ollama"), "llama3.1", &runner).unwrap();
        assert_eq!(runner.seen.borrow()[0].display(), "ollama pull llama3.1");

        let failing = Runner {
            code: 1,
            seen: RefCell::new(Vec::new()),
        };
        assert!(pull_model(Path::new("ollama"), "llama3.1", &failing).is_err());
    }
}
