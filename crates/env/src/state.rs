use crate::diff::EnvDiff;
use crate::ledger::LoadedModulesLedger;
use modenv_config::Section;
use modenv_core::{Error, Result};
use modenv_utils::{read_optional, remove_if_exists, write_atomic_string, SessionPaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What one loaded module did, kept so a later process can undo it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Full name as recorded in the ledger
    pub name: String,
    pub diff: EnvDiff,
    /// Section the module was activated with, handed back on deactivation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
}

/// Serialized beside the ledger as `session.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub project_dir: PathBuf,
    pub config_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_digest: Option<String>,
    /// Project directory activated underneath this one through `chain = true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chained_parent: Option<PathBuf>,
    #[serde(default)]
    pub modules: Vec<ModuleRecord>,
}

impl SessionState {
    pub fn new(project_dir: impl Into<PathBuf>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            config_file: config_file.into(),
            config_digest: None,
            chained_parent: None,
            modules: Vec::new(),
        }
    }

    /// Add or replace the record of a module
    pub fn record(&mut self, record: ModuleRecord) {
        match self.modules.iter_mut().find(|m| m.name == record.name) {
            Some(existing) => *existing = record,
            None => self.modules.push(record),
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Session-temporary files of one project directory in one shell session
#[derive(Debug, Clone)]
pub struct Session {
    paths: SessionPaths,
    ledger: LoadedModulesLedger,
}

impl Session {
    pub fn open(runtime_dir: &Path, session_id: &str, project_dir: &Path) -> Self {
        let paths = SessionPaths::new(runtime_dir, session_id, project_dir);
        let ledger = LoadedModulesLedger::new(paths.ledger());
        Self { paths, ledger }
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn ledger(&self) -> &LoadedModulesLedger {
        &self.ledger
    }

    /// Anything left behind by an earlier activation
    pub fn is_stale(&self) -> bool {
        self.ledger.exists() || self.paths.state_file().is_file()
    }

    pub fn load_state(&self) -> Result<Option<SessionState>> {
        let path = self.paths.state_file();
        match read_optional(&path)? {
            Some(content) => {
                let state = serde_json::from_str(&content).map_err(|e| Error::Json {
                    message: format!("invalid session state '{}'", path.display()),
                    source: e,
                })?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    pub fn save_state(&self, state: &SessionState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;
        write_atomic_string(&self.paths.state_file(), &content)
    }

    /// Remove the ledger, the state file and the session directory
    pub fn clear(&self) -> Result<()> {
        self.ledger.clear()?;
        remove_if_exists(&self.paths.state_file())?;
        // Only succeeds once the directory is empty
        let _ = fs::remove_dir(self.paths.root());
        Ok(())
    }
}
