use std::{path::PathBuf, process::Command};

fn demo(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(file)
}

#[test]
fn scripted_skirmish_prints_the_battle_log() {
    let output = Command::new(env!("CARGO_BIN_EXE_tactics"))
        .arg("--level")
        .arg(demo("skirmish.txt"))
        .arg("--config")
        .arg(demo("tactics.toml"))
        .arg("--script")
        .arg(demo("skirmish.script"))
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run tactics binary");

    assert!(output.status.success(), "tactics exited with {}", output.status);
    let stdout = String::from_utf8(output.stdout).expect("utf-8 log");
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "-- player turn --",
            "Character_Player#0 0:0->3:0",
            "Character_Player#2 0:2->3:2",
            "-- enemy turn --",
            "Character_Enemy#1 4:1->4:0",
            "Character_Enemy#1 dealt 4 dmg to Character_Player#0!",
            "-- player turn --",
            "Character_Player#0 dealt 4 dmg to Character_Enemy#1!",
            "Character_Player#2 3:2->4:1",
            "Character_Player#2 dealt 4 dmg to Character_Enemy#1!",
            "-- enemy turn --",
            "Character_Enemy#1 dealt 4 dmg to Character_Player#0!",
            "-- player turn --",
            "Character_Player#0 dealt 4 dmg to Character_Enemy#1!",
            "Character_Enemy#1 was destroyed at 4:0",
            "Player wins!",
        ]
    );
}

#[test]
fn malformed_script_line_fails_with_its_line_number() {
    let script = std::env::temp_dir().join("tactics-malformed.script");
    std::fs::write(&script, "click 0 0\njump\n").expect("write script");

    let output = Command::new(env!("CARGO_BIN_EXE_tactics"))
        .arg("--level")
        .arg(demo("skirmish.txt"))
        .arg("--script")
        .arg(&script)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run tactics binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("script line 2"), "stderr was: {stderr}");
}
