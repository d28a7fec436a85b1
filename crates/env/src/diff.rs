use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A full set of environment variables
pub type EnvMap = HashMap<String, String>;

/// Shell bookkeeping that never counts as a module effect
const IGNORED_VARS: &[&str] = &[
    "PWD",
    "OLDPWD",
    "SHLVL",
    "_",
    "PS1",
    "PS2",
    "PS3",
    "PS4",
    "PROMPT_COMMAND",
    "BASH_REMATCH",
    "BASH_ARGV0",
    "RANDOM",
    "LINENO",
    "SECONDS",
    "COLUMNS",
    "LINES",
];

fn is_ignored(key: &str) -> bool {
    IGNORED_VARS.contains(&key) || key.starts_with("BASH_FUNC_")
}

/// Change to a set of environment variables.
///
/// Only touched keys are stored: a key present in `next` but not `prev` was
/// added, one present in `prev` but not `next` was removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvDiff {
    /// Values before the change
    pub prev: HashMap<String, String>,
    /// Values after the change
    pub next: HashMap<String, String>,
}

impl EnvDiff {
    pub fn new(prev: HashMap<String, String>, next: HashMap<String, String>) -> Self {
        Self { prev, next }
    }

    /// Compute the change that turns `before` into `after`
    pub fn between(before: &EnvMap, after: &EnvMap) -> Self {
        let mut diff = Self::default();

        for (key, value) in after {
            if is_ignored(key) {
                continue;
            }
            match before.get(key) {
                Some(old) if old == value => {}
                Some(old) => {
                    diff.prev.insert(key.clone(), old.clone());
                    diff.next.insert(key.clone(), value.clone());
                }
                None => {
                    diff.next.insert(key.clone(), value.clone());
                }
            }
        }

        for (key, value) in before {
            if !is_ignored(key) && !after.contains_key(key) {
                diff.prev.insert(key.clone(), value.clone());
            }
        }

        diff
    }

    /// Diff that sets `key` relative to `env`
    pub fn set(env: &EnvMap, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut after = env.clone();
        after.insert(key.into(), value.into());
        Self::between(env, &after)
    }

    /// Variables that were added or changed, sorted by name
    pub fn added_or_changed(&self) -> BTreeMap<&str, &str> {
        self.next
            .iter()
            .filter(|(key, value)| {
                !is_ignored(key) && self.prev.get(*key).map_or(true, |old| old != *value)
            })
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }

    /// Variables that were unset, sorted by name
    pub fn removed(&self) -> BTreeSet<&str> {
        self.prev
            .keys()
            .filter(|key| !is_ignored(key) && !self.next.contains_key(*key))
            .map(String::as_str)
            .collect()
    }

    /// Apply this diff to `env`
    pub fn apply(&self, env: &mut EnvMap) {
        for key in self.removed() {
            env.remove(key);
        }
        for (key, value) in self.added_or_changed() {
            env.insert(key.to_string(), value.to_string());
        }
    }

    /// Swap `prev` and `next`
    pub fn reverse(&self) -> Self {
        Self {
            prev: self.next.clone(),
            next: self.prev.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added_or_changed().is_empty() && self.removed().is_empty()
    }

    /// Diff equivalent to applying `self` and then `other`
    pub fn merge(&self, other: &Self) -> Self {
        let touched =
            |diff: &Self, key: &str| diff.prev.contains_key(key) || diff.next.contains_key(key);
        let keys: BTreeSet<&String> = self
            .prev
            .keys()
            .chain(self.next.keys())
            .chain(other.prev.keys())
            .chain(other.next.keys())
            .collect();

        let mut merged = Self::default();
        for key in keys {
            let before = if touched(self, key.as_str()) {
                self.prev.get(key)
            } else {
                other.prev.get(key)
            };
            let after = if touched(other, key.as_str()) {
                other.next.get(key)
            } else {
                self.next.get(key)
            };
            if before == after {
                continue;
            }
            if let Some(value) = before {
                merged.prev.insert(key.clone(), value.clone());
            }
            if let Some(value) = after {
                merged.next.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}
