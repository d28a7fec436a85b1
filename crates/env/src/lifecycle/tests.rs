//! Lifecycle tests driven by in-memory modules

use super::*;
use crate::module::Module;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

type Log = Arc<Mutex<Vec<String>>>;

/// Exports `MOD_<NAME>=on` and logs every call
struct Recorder {
    name: &'static str,
    fails: bool,
    deactivates: bool,
    log: Log,
}

impl Module for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn activate(&self, ctx: &ModuleContext<'_>) -> Result<EnvDiff> {
        self.log
            .lock()
            .unwrap()
            .push(format!("activate:{}", self.name));
        if self.fails {
            return Err(Error::activation(self.name, "boom", Some(1)));
        }
        Ok(EnvDiff::set(
            ctx.env,
            format!("MOD_{}", self.name.to_uppercase()),
            "on",
        ))
    }

    fn has_deactivate(&self) -> bool {
        self.deactivates
    }

    fn deactivate(&self, _ctx: &ModuleContext<'_>) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("deactivate:{}", self.name));
        Ok(())
    }
}

struct Harness {
    temp: TempDir,
    log: Log,
}

impl Harness {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn settings(&self) -> Settings {
        Settings {
            data_dir: self.temp.path().join("data"),
            runtime_dir: self.temp.path().join("run"),
            module_path: Vec::new(),
            ..Settings::default()
        }
    }

    /// `(name, fails, has_deactivate)` for each registered module
    fn controller(&self, modules: &[(&'static str, bool, bool)]) -> LifecycleController {
        self.controller_with(self.settings(), modules)
    }

    fn controller_with(
        &self,
        settings: Settings,
        modules: &[(&'static str, bool, bool)],
    ) -> LifecycleController {
        let mut registry = ModuleRegistry::discover(&settings.module_path).unwrap();
        for &(name, fails, deactivates) in modules {
            registry.register(Arc::new(Recorder {
                name,
                fails,
                deactivates,
                log: self.log.clone(),
            }));
        }
        LifecycleController::new(settings, registry, "test-session")
    }

    fn project(&self, rel: &str, config: &str) -> PathBuf {
        let dir = self.temp.path().join("work").join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(".modenv"), config).unwrap();
        dir
    }

    fn calls(&self, prefix: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.strip_prefix(prefix).map(str::to_string))
            .collect()
    }

    fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Settings whose module path holds `<name>.sh` with `content`
    fn with_script(&self, name: &str, content: &str) -> (Settings, PathBuf) {
        let plugins = self.temp.path().join("plugins");
        fs::create_dir_all(&plugins).unwrap();
        let script = plugins.join(format!("{name}.sh"));
        fs::write(&script, content).unwrap();
        let settings = Settings {
            module_path: vec![plugins],
            ..self.settings()
        };
        (settings, script)
    }
}

/// Environment scripts need to find `touch` and friends
fn shell_env() -> EnvMap {
    std::env::vars().filter(|(key, _)| key == "PATH").collect()
}

fn applied(env: &EnvMap, outcome: &ActivationOutcome) -> EnvMap {
    let mut env = env.clone();
    outcome.diff.apply(&mut env);
    env
}

#[test]
fn test_successful_activation() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true), ("b", false, true)]);
    let project = h.project("ok", "[a]\n[b]\n");

    let outcome = controller.activate(&project, EnvMap::new());

    assert!(outcome.succeeded, "errors: {:?}", outcome.errors);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        outcome.transitions,
        vec![
            LifecycleState::Idle,
            LifecycleState::Verifying,
            LifecycleState::Parsing,
            LifecycleState::LoadingModules,
            LifecycleState::Succeeded,
            LifecycleState::Reset,
            LifecycleState::Idle,
        ]
    );
    assert_eq!(outcome.loaded, vec!["a", "b"]);

    let changes = outcome.diff.added_or_changed();
    assert_eq!(changes.get("MOD_A"), Some(&"on"));
    assert_eq!(changes.get("MOD_B"), Some(&"on"));
    assert_eq!(
        changes.get(MODENV_DIR_VAR).copied(),
        Some(project.display().to_string().as_str())
    );

    let session = controller.session(&project);
    assert_eq!(session.ledger().entries().unwrap(), vec!["a", "b"]);
    let state = session.load_state().unwrap().unwrap();
    assert_eq!(state.modules.len(), 2);
    assert!(state.config_digest.is_some());
}

#[test]
fn test_unwind_order_skips_failed_module() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true), ("b", false, true), ("c", true, true)]);
    let project = h.project("failing", "[a]\n[b]\n[c]\n");

    let outcome = controller.activate(&project, EnvMap::new());

    assert!(!outcome.succeeded);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(h.calls("activate:"), vec!["a", "b", "c"]);
    assert_eq!(h.calls("deactivate:"), vec!["b", "a"]);
    assert_eq!(outcome.unwound, vec!["b", "a"]);
    assert_eq!(
        outcome.transitions,
        vec![
            LifecycleState::Idle,
            LifecycleState::Verifying,
            LifecycleState::Parsing,
            LifecycleState::LoadingModules,
            LifecycleState::Unwinding,
            LifecycleState::Reset,
            LifecycleState::Idle,
        ]
    );
    assert!(matches!(outcome.errors.as_slice(), [Error::Activation { .. }]));

    // Nothing of a or b survives and the session is clean
    assert!(outcome.diff.is_empty());
    assert!(!controller.session(&project).is_stale());
}

#[test]
fn test_modules_without_deactivate_are_skipped() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, false), ("b", false, true), ("c", true, false)]);
    let project = h.project("skip", "[a]\n[b]\n[c]\n");

    let outcome = controller.activate(&project, EnvMap::new());
    assert_eq!(h.calls("deactivate:"), vec!["b"]);
    assert_eq!(outcome.unwound, vec!["b", "a"]);
    assert!(!outcome.diff.added_or_changed().contains_key("MOD_A"));
}

#[test]
fn test_best_effort_attempts_every_module() {
    let h = Harness::new();
    let controller = h.controller(&[("a", true, false), ("b", false, true)]);
    let project = h.project("best", "[a]\n[missing]\n[b]\n");

    let outcome = controller.activate(&project, EnvMap::new());
    assert_eq!(h.calls("activate:"), vec!["a", "b"]);
    assert_eq!(h.calls("deactivate:"), vec!["b"]);
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome
        .errors
        .iter()
        .any(|e| matches!(e, Error::ModuleNotFound { module, .. } if module == "missing")));
}

#[test]
fn test_fail_fast_stops_at_first_error() {
    let h = Harness::new();
    let settings = Settings {
        failure_policy: FailurePolicy::FailFast,
        ..h.settings()
    };
    let controller = h.controller_with(
        settings,
        &[("a", false, true), ("b", true, false), ("c", false, true)],
    );
    let project = h.project("fast", "[a]\n[b]\n[c]\n");

    let outcome = controller.activate(&project, EnvMap::new());
    assert!(!outcome.succeeded);
    assert_eq!(h.calls("activate:"), vec!["a", "b"]);
    assert_eq!(h.calls("deactivate:"), vec!["a"]);
}

#[test]
fn test_deactivate_reverts_activation() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true), ("b", false, true)]);
    let project = h.project("roundtrip", "[a]\n[b]\n");

    let mut shell = EnvMap::new();
    shell.insert("KEEP".to_string(), "1".to_string());
    let activated = controller.activate(&project, shell.clone());
    let active_env = applied(&shell, &activated);

    h.clear_log();
    let outcome = controller.deactivate(&project, active_env.clone());

    assert!(outcome.succeeded);
    assert_eq!(h.calls("deactivate:"), vec!["b", "a"]);
    assert_eq!(applied(&active_env, &outcome), shell);
    assert!(!controller.session(&project).is_stale());
    assert_eq!(
        outcome.transitions,
        vec![
            LifecycleState::Idle,
            LifecycleState::Unwinding,
            LifecycleState::Reset,
            LifecycleState::Idle,
        ]
    );
}

#[test]
fn test_stale_ledger_is_unwound_first() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true)]);
    let project = h.project("stale", "[a]\n");

    let first = controller.activate(&project, EnvMap::new());
    let env = applied(&EnvMap::new(), &first);

    h.clear_log();
    let second = controller.activate(&project, env);

    assert!(second.succeeded);
    assert_eq!(
        *h.log.lock().unwrap(),
        vec!["deactivate:a".to_string(), "activate:a".to_string()]
    );
    assert_eq!(second.unwound, vec!["a"]);
    assert_eq!(
        controller.session(&project).ledger().entries().unwrap(),
        vec!["a"]
    );
    assert!(second.diff.is_empty());
}

#[test]
fn test_parse_error_aborts_before_loading() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true)]);
    let project = h.project("broken", "orphan=1\n[a]\n");

    let outcome = controller.activate(&project, EnvMap::new());
    assert!(!outcome.succeeded);
    assert!(h.calls("activate:").is_empty());
    assert!(matches!(
        outcome.errors.as_slice(),
        [Error::NoActiveSection { line: 1, .. }]
    ));
    assert_eq!(
        outcome.transitions,
        vec![
            LifecycleState::Idle,
            LifecycleState::Verifying,
            LifecycleState::Parsing,
            LifecycleState::Aborted,
            LifecycleState::Reset,
            LifecycleState::Idle,
        ]
    );
}

#[test]
fn test_tampered_configuration_aborts() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true)]);
    let project = h.project("tamper", "[a]\n");

    assert!(controller.activate(&project, EnvMap::new()).succeeded);
    fs::write(project.join(".modenv"), "[a]\n[b]\n").unwrap();

    h.clear_log();
    let outcome = controller.activate(&project, EnvMap::new());
    assert!(!outcome.succeeded);
    assert!(h.calls("activate:").is_empty());
    assert!(matches!(outcome.errors.as_slice(), [Error::Tampered { .. }]));
    assert!(outcome.transitions.contains(&LifecycleState::Aborted));
    assert!(!outcome.transitions.contains(&LifecycleState::LoadingModules));

    controller.integrity().trust(&project.join(".modenv")).unwrap();
    assert!(!controller.activate(&project, EnvMap::new()).errors.iter().any(|e| e.is_fatal()));
}

#[test]
fn test_self_verification_gates_activation() {
    let h = Harness::new();
    let trusted = h.temp.path().join("modenv-bin");
    fs::write(&trusted, "v1").unwrap();
    let controller = h
        .controller(&[("a", false, true)])
        .with_trusted_files(vec![trusted.clone()]);
    let project = h.project("self", "[a]\n");

    assert!(controller.activate(&project, EnvMap::new()).succeeded);

    fs::write(&trusted, "v2").unwrap();
    h.clear_log();
    let outcome = controller.activate(&project, EnvMap::new());
    assert!(!outcome.succeeded);
    assert!(h.calls("activate:").is_empty());
    assert_eq!(
        outcome.transitions,
        vec![
            LifecycleState::Idle,
            LifecycleState::Verifying,
            LifecycleState::Aborted,
            LifecycleState::Reset,
            LifecycleState::Idle,
        ]
    );
    assert!(!outcome.diff.next.contains_key(MODENV_DIR_VAR));
}

#[test]
fn test_chain_upward_layers_parent_first() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true), ("b", false, true)]);
    let parent = h.project("parent", "[a]\n");
    let child = h.project("parent/child", "[default]\nchain=true\n[b]\n");

    let outcome = controller.activate(&child, EnvMap::new());
    assert!(outcome.succeeded, "errors: {:?}", outcome.errors);
    assert_eq!(outcome.loaded, vec!["a", "b"]);
    assert_eq!(
        outcome
            .transitions
            .iter()
            .filter(|s| **s == LifecycleState::Reset)
            .count(),
        1
    );
    assert_eq!(
        outcome.diff.next.get(MODENV_DIR_VAR).map(String::as_str),
        Some(child.display().to_string().as_str())
    );

    let env = applied(&EnvMap::new(), &outcome);
    h.clear_log();
    let outcome = controller.deactivate(&child, env);
    assert!(outcome.succeeded);
    assert_eq!(h.calls("deactivate:"), vec!["b", "a"]);
    assert!(!controller.session(&parent).is_stale());
    assert!(!controller.session(&child).is_stale());
}

#[test]
fn test_failing_child_unwinds_chained_parent() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true), ("c", true, false)]);
    h.project("up", "[a]\n");
    let child = h.project("up/down", "[default]\nchain=true\n[c]\n");

    let outcome = controller.activate(&child, EnvMap::new());
    assert!(!outcome.succeeded);
    assert_eq!(h.calls("deactivate:"), vec!["a"]);
    assert!(outcome.diff.is_empty());
}

#[test]
fn test_folders_end_to_end_is_idempotent() {
    let h = Harness::new();
    let controller = h.controller(&[]);
    let project = h.project("folders", "[folders]\nnew=tmp/a\nnew=tmp/b\n");

    let first = controller.activate(&project, EnvMap::new());
    assert!(first.succeeded, "errors: {:?}", first.errors);
    assert!(project.join("tmp/a").is_dir());
    assert!(project.join("tmp/b").is_dir());

    let stamp = fs::metadata(project.join("tmp")).unwrap().modified().unwrap();
    let second = controller.activate(&project, applied(&EnvMap::new(), &first));
    assert!(second.succeeded);
    assert_eq!(
        fs::metadata(project.join("tmp")).unwrap().modified().unwrap(),
        stamp
    );
}

#[cfg(unix)]
#[test]
fn test_tampered_deactivation_script_is_not_sourced() {
    let h = Harness::new();
    let (settings, script) = h.with_script("tool", "tool() { export TOOL=1; }\ndeactivate_tool() { :; }\n");
    let controller = h.controller_with(settings, &[]);
    let project = h.project("tool", "[tool]\n");

    let first = controller.activate(&project, shell_env());
    assert!(first.succeeded, "errors: {:?}", first.errors);
    let env = applied(&shell_env(), &first);
    assert_eq!(env.get("TOOL").map(String::as_str), Some("1"));

    fs::write(&script, "tool() { export TOOL=1; }\ndeactivate_tool() { touch sourced; }\n").unwrap();
    let outcome = controller.deactivate(&project, env);

    assert!(matches!(outcome.errors.as_slice(), [Error::Tampered { .. }]));
    assert!(!project.join("sourced").exists());
    assert!(outcome.diff.removed().contains("TOOL"));
    assert_eq!(outcome.unwound, vec!["tool"]);
    assert!(!controller.session(&project).is_stale());
}

#[cfg(unix)]
#[test]
fn test_tampered_script_on_stale_unwind_aborts_activation() {
    let h = Harness::new();
    let (settings, script) = h.with_script("tool", "tool() { export TOOL=1; }\ndeactivate_tool() { :; }\n");
    let controller = h.controller_with(settings, &[]);
    let project = h.project("stale-tool", "[tool]\n");

    let first = controller.activate(&project, shell_env());
    assert!(first.succeeded, "errors: {:?}", first.errors);
    let env = applied(&shell_env(), &first);

    fs::write(&script, "tool() { export TOOL=2; }\ndeactivate_tool() { touch sourced; }\n").unwrap();
    let outcome = controller.activate(&project, env);

    assert!(!outcome.succeeded);
    assert!(matches!(outcome.errors.as_slice(), [Error::Tampered { .. }]));
    assert!(!project.join("sourced").exists());
    assert!(!outcome.transitions.contains(&LifecycleState::Parsing));
    assert!(!outcome.diff.next.contains_key(MODENV_DIR_VAR));
    assert!(!controller.session(&project).is_stale());
}

#[cfg(unix)]
#[test]
fn test_tampered_script_after_loaded_module_unwinds_it() {
    let h = Harness::new();
    let (settings, script) = h.with_script("script", "script() { export SCRIPTED=1; }\n");
    let controller = h.controller_with(settings, &[("a", false, true)]);
    let project = h.project("mixed", "[a]\n[script]\n");

    let first = controller.activate(&project, shell_env());
    assert!(first.succeeded, "errors: {:?}", first.errors);
    let env = applied(&shell_env(), &first);
    assert!(controller.deactivate(&project, env).succeeded);
    assert!(!controller.session(&project).is_stale());

    fs::write(&script, "script() { export SCRIPTED=evil; }\n").unwrap();
    h.clear_log();
    let outcome = controller.activate(&project, shell_env());

    assert!(!outcome.succeeded);
    assert!(matches!(outcome.errors.as_slice(), [Error::Tampered { .. }]));
    assert_eq!(h.calls("activate:"), vec!["a"]);
    assert_eq!(h.calls("deactivate:"), vec!["a"]);
    assert!(outcome.diff.is_empty());
    assert!(!controller.session(&project).is_stale());
}

#[cfg(unix)]
#[test]
fn test_unsaved_module_effect_is_reverted() {
    let h = Harness::new();
    let controller = h.controller(&[("a", false, true), ("b", false, true)]);
    let project = h.project("unsaved", "[a]\n[b]\n");
    // A directory where the state file belongs makes every save fail
    fs::create_dir_all(controller.session(&project).root().join("session.json")).unwrap();

    let outcome = controller.activate(&project, EnvMap::new());

    assert!(!outcome.succeeded);
    assert!(matches!(outcome.errors.as_slice(), [Error::FileSystem { .. }]));
    assert_eq!(h.calls("activate:"), vec!["a"]);
    assert_eq!(h.calls("deactivate:"), vec!["a"]);
    assert!(outcome.diff.is_empty());
}
