//! Trust-on-first-use content digests
//!
//! Each trusted file gets a record holding its SHA-256 digest. Records live in
//! a parallel tree under the digest root: a file below a registered content
//! root `name -> /some/dir` is recorded at `<digest_root>/<name>/<relative>.sha256`,
//! any other file at `<digest_root>/files/<absolute path>.sha256`.

use modenv_core::{Error, Result, DIGEST_EXTENSION};
use modenv_utils::{read_optional, remove_if_exists, write_atomic_string};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Sub-directory of the digest root for files outside every content root
const UNROOTED_DIR: &str = "files";

/// Outcome of a successful verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// No record existed; the current digest is now trusted
    Bootstrapped,
    /// The current digest equals the recorded one
    Matched,
}

/// A directory of trusted content mirrored under the digest root
#[derive(Debug, Clone)]
struct TrustRoot {
    name: String,
    path: PathBuf,
}

/// Maps trusted file paths to their accepted content digests
#[derive(Debug, Clone)]
pub struct IntegrityStore {
    digest_root: PathBuf,
    roots: Vec<TrustRoot>,
}

impl IntegrityStore {
    pub fn new(digest_root: impl Into<PathBuf>) -> Self {
        Self {
            digest_root: digest_root.into(),
            roots: Vec::new(),
        }
    }

    /// Register a content root whose files are recorded under `<digest_root>/<name>`
    pub fn with_root(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = path.canonicalize().unwrap_or(path);
        self.roots.push(TrustRoot {
            name: name.into(),
            path,
        });
        self
    }

    pub fn digest_root(&self) -> &Path {
        &self.digest_root
    }

    /// Deterministic location of the trust record for `file`
    pub fn record_path(&self, file: &Path) -> PathBuf {
        let file = absolute(file);

        for root in &self.roots {
            if let Ok(relative) = file.strip_prefix(&root.path) {
                return with_digest_extension(self.digest_root.join(&root.name).join(relative));
            }
        }

        let mut record = self.digest_root.join(UNROOTED_DIR);
        for component in file.components() {
            if let Component::Normal(part) = component {
                record.push(part);
            }
        }
        with_digest_extension(record)
    }

    /// Verify `file` against its trust record.
    ///
    /// A missing record is first-run bootstrap: the current digest is stored
    /// and the file is accepted. A mismatch leaves the record untouched.
    pub fn verify(&self, file: &Path) -> Result<Verification> {
        let current = digest_file(file)?;
        let record = self.record_path(file);

        match self.read_record(&record)? {
            None => {
                write_atomic_string(&record, &format!("{current}\n"))?;
                tracing::info!(
                    file = %self.display_file(file).display(),
                    "trusting on first use"
                );
                Ok(Verification::Bootstrapped)
            }
            Some(stored) if stored == current => {
                tracing::debug!(file = %self.display_file(file).display(), "digest verified");
                Ok(Verification::Matched)
            }
            Some(_) => Err(Error::tampered(
                self.display_file(file),
                self.display_record(&record),
            )),
        }
    }

    /// Record the current digest of `file`, replacing any previous record
    pub fn trust(&self, file: &Path) -> Result<String> {
        let current = digest_file(file)?;
        write_atomic_string(&self.record_path(file), &format!("{current}\n"))?;
        Ok(current)
    }

    /// Drop the trust record of `file`; the next verification bootstraps again
    pub fn forget(&self, file: &Path) -> Result<bool> {
        remove_if_exists(&self.record_path(file))
    }

    /// The digest currently on record for `file`, if any
    pub fn stored_digest(&self, file: &Path) -> Result<Option<String>> {
        self.read_record(&self.record_path(file))
    }

    fn read_record(&self, record: &Path) -> Result<Option<String>> {
        Ok(read_optional(record)?.map(|content| content.trim().to_string()))
    }

    /// `file` relative to its content root, for readable diagnostics
    fn display_file(&self, file: &Path) -> PathBuf {
        let file = absolute(file);
        self.roots
            .iter()
            .find_map(|root| {
                file.strip_prefix(&root.path)
                    .ok()
                    .map(|relative| Path::new(&root.name).join(relative))
            })
            .unwrap_or(file)
    }

    fn display_record(&self, record: &Path) -> PathBuf {
        record
            .strip_prefix(&self.digest_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| record.to_path_buf())
    }
}

/// Hex-encoded SHA-256 of a file's content
pub fn digest_file(path: &Path) -> Result<String> {
    let content = fs::read(path).map_err(|e| Error::file_system(path, "read for digest", e))?;
    Ok(digest_bytes(&content))
}

/// Hex-encoded SHA-256 of a byte slice
pub fn digest_bytes(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn with_digest_extension(path: PathBuf) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(DIGEST_EXTENSION);
    path.with_file_name(name)
}
