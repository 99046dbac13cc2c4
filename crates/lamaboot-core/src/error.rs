//! Bootstrap error taxonomy.
//!
//! Building blocks return `anyhow::Result`; the setup flow maps each step's
//! failure into exactly one `SetupError` variant and stops.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The five steps of the bootstrap sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ToolCheck,
    EnvCreate,
    DepsInstall,
    DataSeed,
    Handoff,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::ToolCheck,
        Step::EnvCreate,
        Step::DepsInstall,
        Step::DataSeed,
        Step::Handoff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::ToolCheck => "tool_check",
            Step::EnvCreate => "env_create",
            Step::DepsInstall => "deps_install",
            Step::DataSeed => "data_seed",
            Step::Handoff => "handoff",
        }
    }

    /// 1-based position, used in "Step n/5" banners.
    pub fn ordinal(self) -> usize {
        Step::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A child process started but did not exit cleanly.
///
/// Building blocks return this inside their `anyhow::Error` so the exit code
/// survives context wrapping and reaches `SetupError`.
#[derive(Debug, Error)]
#[error("{program} exited unsuccessfully ({status})")]
pub struct ChildExit {
    pub program: String,
    /// `None` when terminated by a signal
    pub code: Option<i32>,
    pub status: String,
}

/// Fatal bootstrap failure. Every variant aborts the sequence.
///
/// `exit_code` is the code of the child process the step ran, when one
/// exited non-zero.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Runtime tool install failed: {message}")]
    ToolInstall {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Isolated environment creation failed: {message}")]
    EnvCreation {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Dependency install failed: {message}")]
    DependencyInstall {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Data directory seeding failed: {message}")]
    DataSeed {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Handoff to downstream program failed: {message}")]
    Handoff {
        message: String,
        exit_code: Option<i32>,
    },
}

impl SetupError {
    /// Wrap a step failure, keeping the full context chain in the message and
    /// the exit code of a failed child process, if any.
    pub fn from_step(step: Step, err: anyhow::Error) -> Self {
        let exit_code = err.downcast_ref::<ChildExit>().and_then(|c| c.code);
        let message = format!("{err:#}");
        match step {
            Step::ToolCheck => SetupError::ToolInstall { message, exit_code },
            Step::EnvCreate => SetupError::EnvCreation { message, exit_code },
            Step::DepsInstall => SetupError::DependencyInstall { message, exit_code },
            Step::DataSeed => SetupError::DataSeed { message, exit_code },
            Step::Handoff => SetupError::Handoff { message, exit_code },
        }
    }

    pub fn step(&self) -> Step {
        match self {
            SetupError::ToolInstall { .. } => Step::ToolCheck,
            SetupError::EnvCreation { .. } => Step::EnvCreate,
            SetupError::DependencyInstall { .. } => Step::DepsInstall,
            SetupError::DataSeed { .. } => Step::DataSeed,
            SetupError::Handoff { .. } => Step::Handoff,
        }
    }

    /// Exit code of the failed child process, if the step ran one.
    pub fn child_exit_code(&self) -> Option<i32> {
        match self {
            SetupError::ToolInstall { exit_code, .. }
            | SetupError::EnvCreation { exit_code, .. }
            | SetupError::DependencyInstall { exit_code, .. }
            | SetupError::DataSeed { exit_code, .. }
            | SetupError::Handoff { exit_code, .. } => *exit_code,
        }
    }

    /// Process exit code: the failed child's own code when it exited
    /// non-zero, 1 otherwise. Never 0.
    pub fn exit_code(&self) -> i32 {
        match self.child_exit_code() {
            Some(code) if code != 0 => code,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_step_maps_each_step() {
        for step in Step::ALL {
            let err = SetupError::from_step(step, anyhow::anyhow!("boom"));
            assert_eq!(err.step(), step);
            assert_eq!(err.exit_code(), 1);
        }
    }

    #[test]
    fn test_from_step_keeps_context_chain() {
        let err = anyhow::anyhow!("No such file").context("Read requirements.txt");
        let setup = SetupError::from_step(Step::DepsInstall, err);
        let text = setup.to_string();
        assert!(text.contains("Read requirements.txt"));
        assert!(text.contains("No such file"));
    }

    #[test]
    fn test_handoff_exit_code_propagates() {
        let err = SetupError::Handoff {
            message: "exited with 3".into(),
            exit_code: Some(3),
        };
        assert_eq!(err.exit_code(), 3);
        let zero = SetupError::Handoff {
            message: "odd".into(),
            exit_code: Some(0),
        };
        assert_eq!(zero.exit_code(), 1);
    }

    #[test]
    fn test_child_exit_code_survives_context() {
        let err = anyhow::Error::new(ChildExit {
            program: "pip".into(),
            code: Some(2),
            status: "exit code 2".into(),
        })
        .context("pip install");
        let setup = SetupError::from_step(Step::DepsInstall, err);
        assert!(matches!(
            setup,
            SetupError::DependencyInstall {
                exit_code: Some(2),
                ..
            }
        ));
        assert_eq!(setup.exit_code(), 2);
        assert!(setup.to_string().contains("pip install"));
    }

    #[test]
    fn test_step_ordinals() {
        assert_eq!(Step::ToolCheck.ordinal(), 1);
        assert_eq!(Step::Handoff.ordinal(), 5);
        assert_eq!(Step::DataSeed.to_string(), "data_seed");
    }
}
