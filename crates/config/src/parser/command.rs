use modenv_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use which::which;

/// Executes the command of a `cmd:` value and returns its standard output
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<String>;
}

/// Runs commands through `sh -c`, blocking until they exit.
///
/// Trailing newlines are stripped from the output, matching `$(...)`.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner {
    working_dir: Option<PathBuf>,
}

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands from `dir` (usually the project directory)
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run(&self, command: &str) -> Result<String> {
        let sh = which("sh").map_err(|e| {
            Error::command_execution(command, format!("sh not found: {e}"), None)
        })?;

        let mut cmd = Command::new(sh);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .map_err(|e| Error::command_execution(command, e.to_string(), None))?;

        if !output.status.success() {
            return Err(Error::command_execution(
                command,
                format!("exited with status {:?}", output.status.code()),
                output.status.code(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches(['\n', '\r']).to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_captures_stdout_without_trailing_newline() {
        let runner = ShellCommandRunner::new();
        assert_eq!(runner.run("printf 'a\\nb\\n\\n'").unwrap(), "a\nb");
    }

    #[test]
    fn test_nonzero_exit_is_error() {
        let runner = ShellCommandRunner::new();
        let err = runner.run("exit 3").unwrap_err();
        assert!(matches!(
            err,
            Error::CommandExecution {
                exit_code: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn test_runs_in_working_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("marker"), "here").unwrap();
        let runner = ShellCommandRunner::in_dir(temp_dir.path());
        assert_eq!(runner.run("cat marker").unwrap(), "here");
    }
}
