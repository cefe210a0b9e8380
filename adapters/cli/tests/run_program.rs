use std::{fs, process::Command};

#[test]
fn runs_a_program_and_prints_the_final_grid() {
    let dir = std::env::temp_dir().join(format!("orca-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let program = dir.join("adder.orca");
    fs::write(&program, "1A2\n...\n").expect("write program");

    let output = Command::new(env!("CARGO_BIN_EXE_orca"))
        .arg(&program)
        .args(["--frames", "1"])
        .output()
        .expect("run orca");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1A2\n.3.\n");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_files_are_reported() {
    let output = Command::new(env!("CARGO_BIN_EXE_orca"))
        .arg("does-not-exist.orca")
        .output()
        .expect("run orca");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}
