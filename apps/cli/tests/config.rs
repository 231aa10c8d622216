use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn config_set_persists_and_drives_later_commands() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let config = workspace.path().join("conf").join("settings.json");
    let config_arg = config.to_str().unwrap();

    Command::cargo_bin("als2mid-cli")?
        .args([
            "--config",
            config_arg,
            "config",
            "set",
            "--project-extension",
            "alp",
            "--max-attempts",
            "0",
            "--log-tail-lines",
            "250",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved"));

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config)?)?;
    assert_eq!(saved["scan"]["project_extension"], ".alp");
    assert_eq!(saved["retry"]["max_attempts"], 1);
    assert_eq!(saved["log_tail_lines"], 250);

    let output = Command::cargo_bin("als2mid-cli")?
        .args(["--config", config_arg, "config", "show"])
        .output()?;
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(shown, saved);

    Command::cargo_bin("als2mid-cli")?
        .args(["--config", config_arg, "plan", "C:\\Packs\\Loop.ALP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Output: C:/Packs/Loop.mid"));
    Ok(())
}

#[test]
fn config_show_reports_malformed_file() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let config = workspace.path().join("settings.json");
    fs::write(&config, "{ broken")?;

    Command::cargo_bin("als2mid-cli")?
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse settings"));
    Ok(())
}
