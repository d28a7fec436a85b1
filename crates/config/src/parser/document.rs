use super::value::unescape_references;
use indexmap::IndexMap;
use modenv_core::{ModuleRef, DEFAULT_SECTION, MULTI_VALUE_SEPARATOR, VARIANT_KEY_JOINER};
use serde::{Deserialize, Serialize};

/// One `[name]` block of the configuration file.
///
/// Keys contributed by a `[name:variant]` header are stored as `variant,key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    name: String,
    values: IndexMap<String, String>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Raw stored value, with repeated values still joined by the separator
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Every value given for `key`, in source order
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|value| value.split(MULTI_VALUE_SEPARATOR).collect())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys that did not come from a variant header
    pub fn plain_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !k.contains(VARIANT_KEY_JOINER))
    }

    /// Entries of one variant with the `variant,` prefix removed
    pub fn variant_entries<'a>(&'a self, variant: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter().filter_map(move |(k, v)| {
            k.split_once(VARIANT_KEY_JOINER)
                .filter(|(prefix, _)| *prefix == variant)
                .map(|(_, key)| (key, v))
        })
    }

    /// Names of the variants that contributed keys, in first-seen order
    pub fn variants(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for key in self.values.keys() {
            if let Some((variant, _)) = key.split_once(VARIANT_KEY_JOINER) {
                if !seen.contains(&variant) {
                    seen.push(variant);
                }
            }
        }
        seen
    }

    /// Resolve deferred `$VAR` references of `value` against `lookup`.
    /// Unknown variables are left untouched.
    pub fn interpolate<F>(value: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let unescaped = unescape_references(value);
        shellexpand::env_with_context_no_errors(&unescaped, |var| lookup(var)).into_owned()
    }

    /// Store a value, appending to an existing one with the separator
    pub(crate) fn accumulate(&mut self, key: String, value: String) {
        match self.values.get_mut(&key) {
            Some(existing) => {
                existing.push_str(MULTI_VALUE_SEPARATOR);
                existing.push_str(&value);
            }
            None => {
                self.values.insert(key, value);
            }
        }
    }
}

/// Parsed configuration: sections keyed by base module name, plus every
/// header in the order it appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigDocument {
    sections: IndexMap<String, Section>,
    headers: Vec<ModuleRef>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    /// Every distinct header, variants included, in source order
    pub fn headers(&self) -> &[ModuleRef] {
        &self.headers
    }

    /// The reserved `[default]` section, if present
    pub fn options(&self) -> Option<&Section> {
        self.section(DEFAULT_SECTION)
    }

    /// Modules to load, in order.
    ///
    /// Variant headers and the `[default]` section are metadata, not modules:
    /// a variant contributes its base module once. `[default] modules = a,b`
    /// replaces the header order.
    pub fn module_refs(&self) -> Vec<ModuleRef> {
        if let Some(explicit) = self.options().and_then(|opts| opts.get("modules")) {
            let mut refs: Vec<ModuleRef> = Vec::new();
            for name in explicit
                .split(MULTI_VALUE_SEPARATOR)
                .flat_map(|part| part.split(','))
                .map(str::trim)
                .filter(|name| !name.is_empty() && *name != DEFAULT_SECTION)
            {
                let module = ModuleRef::parse(name);
                if !refs.contains(&module) {
                    refs.push(module);
                }
            }
            return refs;
        }

        let mut refs: Vec<ModuleRef> = Vec::new();
        for header in &self.headers {
            if header.base() == DEFAULT_SECTION {
                continue;
            }
            let module = ModuleRef::new(header.base());
            if !refs.contains(&module) {
                refs.push(module);
            }
        }
        refs
    }

    /// Whether `[default] chain = true` asks for the parent directory's
    /// environment to be layered underneath this one
    pub fn chain_upward(&self) -> bool {
        self.options()
            .and_then(|opts| opts.get("chain"))
            .map(|value| matches!(value.trim(), "true" | "yes" | "on" | "1"))
            .unwrap_or(false)
    }

    /// Make `header` current, creating its base section on first sight
    pub(crate) fn open(&mut self, header: ModuleRef) {
        self.sections
            .entry(header.base().to_string())
            .or_insert_with(|| Section::new(header.base()));
        if !self.headers.contains(&header) {
            self.headers.push(header);
        }
    }

    pub(crate) fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.get_mut(name)
    }
}
