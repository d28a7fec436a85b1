use predicates::prelude::*;
use std::fs;

mod common;
use common::Sandbox;

#[test]
fn test_hook_prints_prompt_function() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["hook", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_modenv_hook"))
        .stdout(predicate::str::contains("export bash"))
        .stdout(predicate::str::contains("PROMPT_COMMAND"));
}

#[test]
fn test_hook_rejects_unknown_shell() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["hook", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported shell 'tcsh'"));
}

#[test]
fn test_parse_json_dump() {
    let sandbox = Sandbox::new();
    sandbox.write_config("# project\n[env]\nGREETING=hello\n[folders]\nnew=build\n");

    sandbox
        .cmd()
        .args(["parse", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"GREETING\": \"hello\""))
        .stdout(predicate::str::contains("\"folders\""));
}

#[test]
fn test_parse_reports_key_outside_section() {
    let sandbox = Sandbox::new();
    sandbox.write_config("GREETING=hello\n");

    sandbox
        .cmd()
        .arg("parse")
        .assert()
        .failure()
        .stderr(predicate::str::contains("modenv: ERROR"))
        .stderr(predicate::str::contains("not inside a [section]"));
}

#[test]
fn test_activate_emits_exports_and_runs_modules() {
    let sandbox = Sandbox::new();
    sandbox.write_config("[folders]\nnew=build/cache\n\n[env]\nGREETING=hello\n");

    sandbox
        .cmd()
        .args(["activate", "--shell", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("export GREETING=hello"))
        .stdout(predicate::str::contains("export MODENV_DIR="));

    assert!(sandbox.project.join("build/cache").is_dir());
}

#[test]
fn test_activate_fails_for_unknown_module() {
    let sandbox = Sandbox::new();
    sandbox.write_config("[env]\nGREETING=hello\n[missing]\n");

    sandbox
        .cmd()
        .args(["activate", "--shell", "bash"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("MODENV_DIR").not())
        .stdout(predicate::str::contains("GREETING").not())
        .stderr(predicate::str::contains("module 'missing' was not found"));
}

#[test]
fn test_export_activates_then_deactivates_on_leave() {
    let sandbox = Sandbox::new();
    sandbox.write_config("[env]\nGREETING=hello\n");
    let project = fs::canonicalize(&sandbox.project).unwrap();

    sandbox
        .cmd()
        .args(["export", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("export GREETING=hello"));

    sandbox
        .cmd()
        .current_dir(sandbox.outside())
        .env("MODENV_DIR", &project)
        .env("GREETING", "hello")
        .args(["export", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unset GREETING"))
        .stdout(predicate::str::contains("unset MODENV_DIR"));
}

#[test]
fn test_export_is_silent_inside_active_project() {
    let sandbox = Sandbox::new();
    sandbox.write_config("[env]\nGREETING=hello\n");
    let project = fs::canonicalize(&sandbox.project).unwrap();

    sandbox
        .cmd()
        .env("MODENV_DIR", &project)
        .args(["export", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_verify_and_trust_flow() {
    let sandbox = Sandbox::new();
    let config = sandbox.write_config("[env]\nGREETING=hello\n");

    sandbox
        .cmd()
        .arg("verify")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("bootstrapped"));

    sandbox
        .cmd()
        .arg("verify")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok"));

    fs::write(&config, "[env]\nGREETING=changed\n").unwrap();
    sandbox
        .cmd()
        .arg("verify")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("has been modified since it was trusted"))
        .stderr(predicate::str::contains("modenv trust"));

    sandbox.cmd().arg("trust").arg(&config).assert().success();
    sandbox
        .cmd()
        .arg("verify")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok"));
}

#[test]
fn test_tampered_config_blocks_activation() {
    let sandbox = Sandbox::new();
    let config = sandbox.write_config("[env]\nGREETING=hello\n");
    sandbox.cmd().arg("trust").arg(&config).assert().success();
    fs::write(&config, "[env]\nGREETING=evil\n").unwrap();

    sandbox
        .cmd()
        .args(["activate", "--shell", "zsh"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("GREETING").not());
}

#[test]
fn test_modules_lists_builtins_and_scripts() {
    let sandbox = Sandbox::new();
    let script = sandbox.write_module("marker", "marker() { export MARKED=yes; }\n");

    sandbox
        .cmd()
        .arg("modules")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("marker\t{}", script.display())))
        .stdout(predicate::str::contains("folders\tbuiltin"))
        .stdout(predicate::str::contains("path\tbuiltin"))
        .stdout(predicate::str::contains("env\tbuiltin"));
}

#[cfg(unix)]
#[test]
fn test_script_module_is_activated_and_reverted() {
    let sandbox = Sandbox::new();
    sandbox.write_module(
        "marker",
        "marker() { export MARKED=\"$MODENV_CFG_VALUE\"; }\ndeactivate_marker() { :; }\n",
    );
    sandbox.write_config("[marker]\nvalue=yes\n");

    sandbox
        .cmd()
        .args(["activate", "--shell", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("export MARKED=yes"))
        .stdout(predicate::str::contains("MODENV_CFG").not());

    sandbox
        .cmd()
        .env("MARKED", "yes")
        .args(["deactivate", "--shell", "bash"])
        .arg(fs::canonicalize(&sandbox.project).unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("unset MARKED"));
}

#[cfg(unix)]
#[test]
fn test_parse_refuses_tampered_config_before_running_commands() {
    let sandbox = Sandbox::new();
    let config = sandbox.write_config("[env]\nA=cmd:touch ran\n");
    sandbox.cmd().arg("trust").arg(&config).assert().success();
    fs::write(&config, "[env]\nA=cmd:touch ran\nB=1\n").unwrap();

    sandbox
        .cmd()
        .args(["parse", "--allow-commands"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has been modified since it was trusted"));

    assert!(!sandbox.project.join("ran").exists());
}
