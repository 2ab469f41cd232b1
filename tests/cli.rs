use assert_cmd::Command;

#[test]
fn help_lists_timer_flags() {
    let output = Command::cargo_bin("ringside")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    for flag in ["--round", "--rest", "--warning-window", "--sound", "--config", "--no-save"] {
        assert!(text.contains(flag), "help is missing {flag}");
    }
}

#[test]
fn version_matches_package() {
    Command::cargo_bin("ringside")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(format!("ringside {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn bad_round_is_rejected_before_the_tui() {
    Command::cargo_bin("ringside")
        .unwrap()
        .args(["--round", "1:99"])
        .assert()
        .failure();
}

#[test]
fn unknown_sound_mode_is_rejected() {
    Command::cargo_bin("ringside")
        .unwrap()
        .args(["--sound", "kazoo"])
        .assert()
        .failure();
}
