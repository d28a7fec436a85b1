//! Shell integration for modenv
//!
//! Renders environment changes as code for the invoking shell to `eval`, and
//! prints the prompt hooks that call `modenv export <shell>` on every prompt.

pub mod bash;
pub mod fish;
pub mod zsh;

pub use bash::BashShell;
pub use fish::FishShell;
pub use zsh::ZshShell;

use modenv_core::DEFAULT_SHELL;
use modenv_env::EnvDiff;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    Unknown(String),
}

pub trait Shell {
    /// Prompt hook that runs `<program> export <shell>` and evaluates its output
    fn hook(&self, program: &str) -> String;

    fn export(&self, key: &str, value: &str) -> String;

    fn unset(&self, key: &str) -> String;

    fn escape(&self, s: &str) -> String;

    /// Shell code applying `diff`: unsets first, then exports, each sorted
    /// by name. Keys that are not valid identifiers are skipped.
    fn render(&self, diff: &EnvDiff) -> String {
        let unsets = diff.removed().into_iter().map(|key| (key, None));
        let exports = diff
            .added_or_changed()
            .into_iter()
            .map(|(key, value)| (key, Some(value)));

        let mut lines = Vec::new();
        for (key, value) in unsets.chain(exports) {
            if !is_valid_identifier(key) {
                tracing::warn!(key = %key, "skipping variable with an invalid name");
                continue;
            }
            lines.push(match value {
                Some(value) => self.export(key, value),
                None => self.unset(key),
            });
        }

        if lines.is_empty() {
            String::new()
        } else {
            lines.join("\n") + "\n"
        }
    }
}

impl ShellType {
    pub fn detect_from_arg(arg0: &str) -> Self {
        let shell_name = Path::new(arg0)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(arg0);

        let shell_name = shell_name.strip_prefix('-').unwrap_or(shell_name);

        Self::from_name(shell_name)
    }

    /// Shell named by `$SHELL`, bash when unset
    pub fn detect_from_env() -> Self {
        std::env::var("SHELL")
            .map(|shell| Self::detect_from_arg(&shell))
            .unwrap_or_else(|_| Self::from_name(DEFAULT_SHELL))
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "bash" => ShellType::Bash,
            "zsh" => ShellType::Zsh,
            "fish" => ShellType::Fish,
            _ => ShellType::Unknown(name.to_string()),
        }
    }

    pub fn as_shell(&self) -> Box<dyn Shell> {
        match self {
            ShellType::Bash => Box::new(BashShell),
            ShellType::Zsh => Box::new(ZshShell),
            ShellType::Fish => Box::new(FishShell),
            ShellType::Unknown(_) => Box::new(BashShell),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
            ShellType::Unknown(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ShellType::Unknown(_))
    }
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn escape_bash_like(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    if s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '/' | '.' | ':' | ',' | '-' | '+')
    }) {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len() + 10);
    result.push('\'');
    for c in s.chars() {
        if c == '\'' {
            result.push_str("'\"'\"'");
        } else {
            result.push(c);
        }
    }
    result.push('\'');
    result
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
