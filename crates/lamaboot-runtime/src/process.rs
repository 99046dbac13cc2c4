//! Child process execution behind a trait, so bootstrap steps can be driven by
//! a fake runner in tests.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use lamaboot_core::error::ChildExit;

/// A fully described child process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables set on top of the inherited environment
    pub env: Vec<(String, String)>,
    /// Variables removed from the inherited environment
    pub env_remove: Vec<String>,
    /// Bytes written to the child's stdin, which is then closed.
    /// `None` inherits the parent's stdin.
    pub stdin: Option<Vec<u8>>,
    /// Capture stdout/stderr instead of streaming them to the terminal
    pub capture: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn envs(mut self, vars: &[(String, String)]) -> Self {
        self.env.extend(vars.iter().cloned());
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_remove.push(key.into());
        self
    }

    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Shell-like rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut s = self.program.to_string_lossy().to_string();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

/// Result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit code; `None` when terminated by a signal
    pub code: Option<i32>,
    /// Empty unless the command was captured
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code text for error messages ("exit code 2" / "terminated by signal").
    pub fn describe(&self) -> String {
        match self.code {
            Some(c) => format!("exit code {}", c),
            None => "terminated by signal".to_string(),
        }
    }

    /// Typed error for a non-zero exit of `spec`, carrying its exit code.
    pub fn exit_error(&self, spec: &CommandSpec) -> ChildExit {
        ChildExit {
            program: spec.display(),
            code: self.code,
            status: self.describe(),
        }
    }
}

/// Runs a child process to completion.
pub trait CommandRunner {
    /// `Err` only when the process could not be started or awaited; a
    /// non-zero exit is reported through `RunOutcome::code`.
    fn run(&self, spec: &CommandSpec) -> Result<RunOutcome>;
}

/// `std::process::Command` backed runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<RunOutcome> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(ref dir) = spec.cwd {
            cmd.current_dir(dir);
        }
        for key in &spec.env_remove {
            cmd.env_remove(key);
        }
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }
        cmd.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        if spec.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        tracing::debug!(command = %spec.display(), "Spawning child process");
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start `{}`", spec.display()))?;

        if let Some(ref input) = spec.stdin {
            // Dropping the handle closes the pipe so the child sees EOF.
            let mut stdin = child.stdin.take().context("Child stdin not available")?;
            // A child that exits without reading all input closes the pipe
            // early; its exit status is what gets reported then.
            if let Err(e) = stdin.write_all(input) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    drop(stdin);
                    let _ = child.wait();
                    return Err(e).with_context(|| format!("Write stdin of `{}`", spec.display()));
                }
                tracing::debug!(command = %spec.display(), "Child closed stdin early");
            }
        }

        let out = child
            .wait_with_output()
            .with_context(|| format!("Wait for `{}`", spec.display()))?;

        Ok(RunOutcome {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder_and_display() {
        let spec = CommandSpec::new("python3")
            .args(["-m", "venv"])
            .arg("/tmp/venv")
            .env_remove("PYTHONHOME")
            .capture();
        assert_eq!(spec.display(), "python3 -m venv /tmp/venv");
        assert_eq!(spec.env_remove, vec!["PYTHONHOME".to_string()]);
        assert!(spec.capture);
        assert!(spec.stdin.is_none());
    }

    #[test]
    fn test_run_outcome_describe() {
        let ok = RunOutcome {
            code: Some(0),
            ..Default::default()
        };
        assert!(ok.success());
        let sig = RunOutcome::default();
        assert!(!sig.success());
        assert_eq!(sig.describe(), "terminated by signal");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_pipes_stdin_and_captures() {
        let spec = CommandSpec::new("sh")
            .arg("-s")
            .stdin(b"echo hello; echo oops >&2; exit 3\n".to_vec())
            .capture();
        let out = SystemRunner.run(&spec).unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn test_child_ignoring_stdin_reports_its_exit_code() {
        // Larger than a pipe buffer, so the write outlives the child.
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("exit 5")
            .stdin(vec![b'#'; 4 * 1024 * 1024])
            .capture();
        let out = SystemRunner.run(&spec).unwrap();
        assert_eq!(out.code, Some(5));
    }

    #[test]
    fn test_exit_error_carries_code() {
        let spec = CommandSpec::new("pip").arg("install");
        let out = RunOutcome {
            code: Some(2),
            ..Default::default()
        };
        let err = out.exit_error(&spec);
        assert_eq!(err.code, Some(2));
        assert_eq!(err.to_string(), "pip install exited unsuccessfully (exit code 2)");
    }

    #[test]
    fn test_system_runner_missing_program_is_error() {
        let spec = CommandSpec::new("lamaboot-definitely-not-a-program").capture();
        let err = SystemRunner.run(&spec).unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
    }
}
