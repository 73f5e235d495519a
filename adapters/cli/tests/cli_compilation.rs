use std::process::Command;

fn cargo(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO"));
    let _ = command.current_dir(env!("CARGO_MANIFEST_DIR")).args(args);
    command
}

#[test]
fn cli_compiles_without_warnings() {
    let status = cargo(&["check", "--quiet", "--bin", "skirmish"])
        .status()
        .expect("failed to invoke cargo check for skirmish CLI binary");

    assert!(status.success(), "cargo check --bin skirmish should succeed");
}

#[test]
fn bundled_scenario_runs_to_completion() {
    let output = cargo(&[
        "run",
        "--quiet",
        "--bin",
        "skirmish",
        "--",
        "scenarios/skirmish.ron",
        "--ticks",
        "60",
    ])
    .output()
    .expect("failed to invoke the skirmish CLI binary");

    assert!(output.status.success(), "skirmish should exit cleanly");
    let summary = String::from_utf8_lossy(&output.stdout);
    assert_eq!(summary.lines().count(), 4, "one line per unit:\n{summary}");
    assert!(summary.lines().all(|line| line.starts_with("unit ")));
}
