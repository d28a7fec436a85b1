//! Path utilities for modenv-specific file locations

use modenv_core::{LEDGER_FILENAME, MODENV_SESSION_VAR, SESSION_FILENAME};
use sha2::{Digest, Sha256};
use std::env;
use std::path::{Path, PathBuf};

/// Generate a hash for a directory path to create unique state directories
pub fn get_directory_hash(dir: &Path) -> String {
    let mut hasher = Sha256::new();

    // Use canonical path to handle symlinks consistently
    let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    hasher.update(canonical.to_string_lossy().as_bytes());

    // First 16 hex chars are plenty to tell project directories apart
    let full_hash = hex::encode(hasher.finalize());
    full_hash.chars().take(16).collect()
}

/// Identify the invoking shell session.
///
/// `MODENV_SESSION` wins when the hook exported it; otherwise the parent
/// process id (the shell that ran us) is used.
pub fn current_session_id() -> String {
    if let Ok(id) = env::var(MODENV_SESSION_VAR) {
        if !id.is_empty() {
            return id;
        }
    }
    parent_process_id()
}

#[cfg(unix)]
fn parent_process_id() -> String {
    // SAFETY: getppid has no preconditions and cannot fail
    let ppid = unsafe { libc::getppid() };
    ppid.to_string()
}

#[cfg(not(unix))]
fn parent_process_id() -> String {
    "default".to_string()
}

/// Files making up the session-temporary state of one project directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    root: PathBuf,
}

impl SessionPaths {
    /// `<runtime_dir>/sessions/<session>/<hash(project_dir)>`
    pub fn new(runtime_dir: &Path, session_id: &str, project_dir: &Path) -> Self {
        Self {
            root: runtime_dir
                .join("sessions")
                .join(session_id)
                .join(get_directory_hash(project_dir)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The loaded-modules ledger, one module name per line
    pub fn ledger(&self) -> PathBuf {
        self.root.join(LEDGER_FILENAME)
    }

    /// Serialized session state (recorded env effects, config digest)
    pub fn state_file(&self) -> PathBuf {
        self.root.join(SESSION_FILENAME)
    }
}
