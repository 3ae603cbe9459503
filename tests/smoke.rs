use assert_cmd::Command;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("signal-ranker").expect("binary exists");
    cmd.arg("--help").assert().success();
}

#[test]
fn signal_subcommand_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cases.csv");
    std::fs::write(
        &input,
        "case_id,drug,reaction,event_date,serious\n\
         1,alpha,rash,2024-01-02,N\n\
         2,alpha,rash,2024-02-02,N\n\
         3,beta,hepatitis,2024-03-02,Y\n\
         4,beta,rash,2024-03-05,N\n",
    )
    .unwrap();
    let outputs = dir.path().join("outputs");

    Command::cargo_bin("signal-ranker")
        .unwrap()
        .current_dir(dir.path())
        .env("DATA_DIR", dir.path())
        .env("OUTPUTS_DIR", &outputs)
        .env_remove("ENGINE_CONFIG")
        .args(["signal", "--input"])
        .arg(&input)
        .assert()
        .success();
    assert!(outputs.join("signals.json").exists());
    assert!(outputs.join("signals.csv").exists());

    Command::cargo_bin("signal-ranker")
        .unwrap()
        .current_dir(dir.path())
        .env("OUTPUTS_DIR", &outputs)
        .args(["rank", "--limit", "2"])
        .assert()
        .success();
}
