//! Shared domain types

use crate::constants::VARIANT_DELIMITER;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference to a pluggable module, optionally narrowed to one of its variants.
///
/// The base name locates the implementation; the full name (`base:variant`)
/// is what the ledger records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleRef {
    pub name: String,
    pub variant: Option<String>,
}

impl ModuleRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: None,
        }
    }

    pub fn with_variant(name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: Some(variant.into()),
        }
    }

    /// Split a raw `name` or `name:variant` string. Only the first delimiter
    /// separates the base name; an empty variant is treated as absent.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(VARIANT_DELIMITER) {
            Some((name, variant)) if !variant.is_empty() => Self::with_variant(name, variant),
            Some((name, _)) => Self::new(name),
            None => Self::new(raw),
        }
    }

    pub fn base(&self) -> &str {
        &self.name
    }

    pub fn is_variant(&self) -> bool {
        self.variant.is_some()
    }

    /// Full name including the variant discriminator
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}{}{}", self.name, VARIANT_DELIMITER, variant),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for ModuleRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Severity tag of a user-facing diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }

    /// ANSI colour code used when diagnostics go to a terminal
    pub fn ansi_color(&self) -> &'static str {
        match self {
            Severity::Debug => "\x1b[90m",
            Severity::Info => "\x1b[32m",
            Severity::Warning => "\x1b[33m",
            Severity::Error => "\x1b[31m",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
