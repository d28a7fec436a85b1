#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Throwaway data, runtime and module directories plus one project, so each
/// test runs the binary against its own state
pub struct Sandbox {
    temp: TempDir,
    pub project: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        for dir in ["data", "run", "modules", "config", "outside"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        fs::create_dir_all(&project).unwrap();
        Self { temp, project }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn modules(&self) -> PathBuf {
        self.temp.path().join("modules")
    }

    /// A directory without any configuration above it
    pub fn outside(&self) -> PathBuf {
        self.temp.path().join("outside")
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.project.join(".modenv");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_module(&self, name: &str, content: &str) -> PathBuf {
        let path = self.modules().join(format!("{name}.sh"));
        fs::write(&path, content).unwrap();
        path
    }

    /// `modenv` running in the project directory with isolated settings
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("modenv").unwrap();
        cmd.current_dir(&self.project)
            .env("XDG_CONFIG_HOME", self.temp.path().join("config"))
            .env("MODENV_DATA_DIR", self.temp.path().join("data"))
            .env("MODENV_RUNTIME_DIR", self.temp.path().join("run"))
            .env("MODENV_MODULE_PATH", self.modules())
            .env("MODENV_SESSION", "cli-test")
            .env("MODENV_VERIFY_SELF", "0")
            .env("NO_COLOR", "1")
            .env_remove("MODENV_DIR")
            .env_remove("MODENV_FILE")
            .env_remove("MODENV_LOG")
            .env_remove("MODENV_ALLOW_COMMANDS")
            .env_remove("MODENV_FAILURE_POLICY")
            .env_remove("GREETING");
        cmd
    }
}
