use assert_cmd::Command; // Bring Command into scope
use predicates::prelude::*; // Bring predicate traits into scope

fn abacus() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("abacus")?;
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn test_ping_command() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .arg("--ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("pong"));
    Ok(())
}

#[test]
fn test_no_args_lists_plugins() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered plugins:"))
        .stdout(predicate::str::contains("pong").not());
    Ok(())
}

#[test]
fn test_plugin_list_shows_active_plugins() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["plugin", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bmi v0.1.0 (Body Mass Index) [Active]"))
        .stdout(predicate::str::contains("gcs v0.1.0 (Glasgow Coma Scale) [Active]"));
    Ok(())
}

#[test]
fn test_plugin_check_reports_missing_presentation() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["plugin", "check", "bmi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plugin ships no presentation component"))
        .stdout(predicate::str::contains("'bmi' is compatible (1 warning(s))"));

    abacus()?
        .args(["plugin", "check", "gcs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'gcs' is compatible (0 warning(s))"));
    Ok(())
}

#[test]
fn test_plugin_check_unknown_plugin_fails() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["plugin", "check", "apgar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("apgar"));
    Ok(())
}

#[test]
fn test_run_bmi() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["run", "bmi", "--input", "weight=70", "--input", "height=175"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Body Mass Index"))
        .stdout(predicate::str::contains("Result: 22.9 kg/m²"))
        .stdout(predicate::str::contains("Band: Normal"));
    Ok(())
}

#[test]
fn test_run_uses_requested_locale() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["run", "bmi", "-i", "weight=70", "-i", "height=175", "--locale", "de"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Body-Mass-Index"))
        .stdout(predicate::str::contains("Gewicht: 70"));
    Ok(())
}

#[test]
fn test_run_gcs_intubated() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["run", "gcs", "-i", "intubated=true", "-i", "motor=5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Result: GCS 10"))
        .stdout(predicate::str::contains("notation: E4 VT M5"))
        .stdout(predicate::str::contains("Verbal response:").not());
    Ok(())
}

#[test]
fn test_run_out_of_range_input_fails_with_field_error() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["run", "bmi", "-i", "height=10"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("(!) Height must be between 30 and 272"))
        .stderr(predicate::str::contains("Please correct the highlighted fields."));
    Ok(())
}

#[test]
fn test_run_unknown_field_fails() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["run", "bmi", "-i", "age=40"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'bmi' has no field 'age'"));
    Ok(())
}

#[test]
fn test_config_set_persists_across_runs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let data_dir = dir.path().to_str().ok_or("non-utf8 temp path")?;

    abacus()?
        .args(["--data-dir", data_dir, "config", "set", "bmi", "decimals", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"settings: {"decimals":1} -> {"decimals":2}"#));

    abacus()?
        .args(["--data-dir", data_dir, "config", "show", "bmi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("template:    bmi"))
        .stdout(predicate::str::contains("decimals = 2"));

    abacus()?
        .args(["--data-dir", data_dir, "config", "history", "bmi"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"cli settings: {"decimals":1} -> {"decimals":2}"#));
    Ok(())
}

#[test]
fn test_config_set_rejects_schema_violation() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["config", "set", "bmi", "decimals", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration for 'bmi'"));
    Ok(())
}

#[test]
fn test_config_export_formats() -> Result<(), Box<dyn std::error::Error>> {
    abacus()?
        .args(["config", "export", "gcs"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""plugin_id": "gcs""#));

    abacus()?
        .args(["config", "export", "gcs", "--format", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plugin_id: gcs"));

    abacus()?
        .args(["config", "export", "gcs", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported format 'xml'"));
    Ok(())
}
