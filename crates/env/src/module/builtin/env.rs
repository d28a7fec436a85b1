use crate::diff::{EnvDiff, EnvMap};
use crate::module::{Module, ModuleContext};
use modenv_config::Section;
use modenv_core::{Error, Result, MULTI_VALUE_SEPARATOR};

/// Key naming the variant whose keys are exported alongside the plain ones
const PROFILE_KEY: &str = "profile";

/// Exports the section's keys as environment variables.
///
/// ```text
/// [env]
/// profile=prod
/// GOBIN=$HOME/go/bin
///
/// [env:prod]
/// API_URL=https://api.example.com
/// ```
///
/// References are resolved in order, so a key may use one exported above it.
/// Repeated keys keep their last value.
#[derive(Debug, Default)]
pub struct EnvModule;

impl EnvModule {
    fn selected_variant(ctx: &ModuleContext<'_>) -> Option<String> {
        if let Some(variant) = &ctx.module.variant {
            return Some(variant.clone());
        }
        ctx.values(PROFILE_KEY)
            .last()
            .map(|profile| ctx.interpolate(profile.trim()))
            .filter(|profile| !profile.is_empty())
    }

    fn export(working: &mut EnvMap, key: &str, raw: &str) -> Result<()> {
        if !is_valid_name(key) {
            return Err(Error::configuration(format!(
                "'{key}' is not a valid environment variable name"
            )));
        }
        let last = raw.rsplit(MULTI_VALUE_SEPARATOR).next().unwrap_or(raw);
        let value = Section::interpolate(last, |var| working.get(var).cloned());
        working.insert(key.to_string(), value);
        Ok(())
    }
}

impl Module for EnvModule {
    fn name(&self) -> &str {
        "env"
    }

    fn activate(&self, ctx: &ModuleContext<'_>) -> Result<EnvDiff> {
        let Some(section) = ctx.section else {
            return Ok(EnvDiff::default());
        };

        let mut working = ctx.env.clone();
        for (key, raw) in section.plain_entries() {
            if key == PROFILE_KEY {
                continue;
            }
            Self::export(&mut working, key, raw)
                .map_err(|e| Error::activation(self.name(), e.to_string(), None))?;
        }

        if let Some(variant) = Self::selected_variant(ctx) {
            if !section.variants().contains(&variant.as_str()) {
                return Err(Error::activation(
                    self.name(),
                    format!("profile '{variant}' has no [env:{variant}] section"),
                    None,
                ));
            }
            for (key, raw) in section.variant_entries(&variant) {
                Self::export(&mut working, key, raw)
                    .map_err(|e| Error::activation(self.name(), e.to_string(), None))?;
            }
        }

        Ok(EnvDiff::between(ctx.env, &working))
    }
}

fn is_valid_name(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modenv_config::parse;
    use modenv_core::ModuleRef;
    use std::path::Path;

    fn activate(config: &str, module: ModuleRef, env: &EnvMap) -> Result<EnvDiff> {
        let doc = parse(config).unwrap();
        let ctx = ModuleContext {
            module: &module,
            section: doc.section("env"),
            project_dir: Path::new("/work"),
            env,
        };
        EnvModule.activate(&ctx)
    }

    #[test]
    fn test_exports_plain_keys_with_interpolation() {
        let mut env = EnvMap::new();
        env.insert("HOME".to_string(), "/home/dev".to_string());

        let diff = activate(
            "[env]\nGOPATH=$HOME/go\nGOBIN=${GOPATH}/bin\nMISSING=$NOPE\n",
            ModuleRef::new("env"),
            &env,
        )
        .unwrap();

        assert_eq!(diff.next.get("GOPATH").unwrap(), "/home/dev/go");
        assert_eq!(diff.next.get("GOBIN").unwrap(), "/home/dev/go/bin");
        assert_eq!(diff.next.get("MISSING").unwrap(), "$NOPE");
        assert!(!diff.next.contains_key("HOME"));
    }

    #[test]
    fn test_profile_selects_variant() {
        let config = "[env]\nprofile=prod\nAPP=demo\n[env:prod]\nURL=https://prod\n[env:dev]\nURL=http://localhost\n";
        let diff = activate(config, ModuleRef::new("env"), &EnvMap::new()).unwrap();
        assert_eq!(diff.next.get("URL").unwrap(), "https://prod");
        assert_eq!(diff.next.get("APP").unwrap(), "demo");
        assert!(!diff.next.contains_key("profile"));

        let diff = activate(config, ModuleRef::with_variant("env", "dev"), &EnvMap::new()).unwrap();
        assert_eq!(diff.next.get("URL").unwrap(), "http://localhost");
    }

    #[test]
    fn test_unknown_profile_is_activation_error() {
        let err = activate("[env]\nprofile=staging\n", ModuleRef::new("env"), &EnvMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::Activation { .. }));
    }

    #[test]
    fn test_invalid_name_is_activation_error() {
        let err = activate("[env]\n1BAD=x\n", ModuleRef::new("env"), &EnvMap::new()).unwrap_err();
        assert!(err.to_string().contains("1BAD"));
    }
}
