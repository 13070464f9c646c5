use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

#[test]
fn help_lists_config_flag() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("--config"))
        .stdout(contains("./config.ini"))
        .stdout(contains("--log-level").not());
}

#[test]
fn log_level_flag_is_not_accepted() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cli-template"));
    cmd.arg("--log-level")
        .arg("debug")
        .assert()
        .code(2)
        .stderr(contains("unexpected argument '--log-level'"));
}
