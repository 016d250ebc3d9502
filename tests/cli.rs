use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;
use zip::write::FileOptions;

fn stager() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("stager")?;
    // Keep the developer's environment out of the run.
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("STAGER_") {
            cmd.env_remove(&key);
        }
    }
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn test_cli_run_stages_archives_and_prints_summary() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Setup: a drop folder with one archive of five text files
    let root = tempdir()?;
    let drops = root.path().join("drops");
    let out = root.path().join("Extracted");
    fs::create_dir_all(&drops)?;

    let mut zw = zip::ZipWriter::new(File::create(drops.join("Report.zip"))?);
    for name in ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"] {
        zw.start_file(name, FileOptions::default())?;
        writeln!(zw, "row for {name}")?;
    }
    zw.finish()?;

    // 2. Config file carries the load target, flags carry the rest
    let config = root.path().join("stager.toml");
    fs::write(
        &config,
        "database = \"Inventory_2023\"\n\
         primary_server = \"sql01\"\n\
         deployed_server = \"ssis01\"\n\
         template_path = '\\SSISDB\\Inventory\\Load.dtsx'\n",
    )?;

    let mut cmd = stager()?;
    cmd.arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--source")
        .arg(&drops)
        .arg("--output")
        .arg(&out)
        .arg("--files-per-dir")
        .arg("2")
        .arg("--batch-date")
        .arg("2024-06-01")
        .arg("--skip-preflight")
        .arg("--json");
    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("\"batch_folders\": 3")
                .and(predicate::str::contains("\"scripts\": 3"))
                .and(predicate::str::contains("\"script_lines\": 5")),
        );

    // 3. Verify the staged tree
    let last = out.join("Report").join("2024-06-01_003");
    assert!(last.join("e.txt").exists());
    let script = fs::read_to_string(last.join("DJ.bat"))?;
    assert_eq!(script.lines().count(), 1);
    assert!(script.contains("/server \"ssis01\""));
    assert!(script.contains("'dbo.e'"));

    Ok(())
}

#[test]
fn test_cli_extract_missing_source_logs_one_error() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;

    let mut cmd = stager()?;
    cmd.arg("extract")
        .arg("--source")
        .arg(root.path().join("missing"))
        .arg("--output")
        .arg(root.path().join("out"));
    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::function(|err: &str| {
            err.matches("source folder does not exist").count() == 1
        }));

    Ok(())
}

#[test]
fn test_cli_split_missing_folder_logs_one_error() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;

    let mut cmd = stager()?;
    cmd.arg("split").arg(root.path().join("missing"));
    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::function(|err: &str| {
            err.matches("folder does not exist").count() == 1
        }));

    Ok(())
}

#[test]
fn test_cli_script_missing_folder_logs_one_error() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let missing = root.path().join("missing");

    let mut cmd = stager()?;
    cmd.arg("script")
        .arg(&missing)
        .arg("--database")
        .arg("Inventory_2023")
        .arg("--server")
        .arg("sql01")
        .arg("--deployed-server")
        .arg("ssis01")
        .arg("--template")
        .arg("Load.dtsx");
    cmd.assert()
        .success()
        .stderr(predicate::function(|err: &str| {
            err.matches("folder does not exist").count() == 1
        }));
    assert!(!missing.exists());

    Ok(())
}

#[test]
fn test_cli_split_then_script_with_dry_run_sql() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let folder = root.path().join("Inventory");
    fs::create_dir_all(&folder)?;
    for name in ["x.txt", "y.txt", "z.txt"] {
        fs::write(folder.join(name), name)?;
    }

    let mut cmd = stager()?;
    cmd.arg("split")
        .arg(&folder)
        .arg("--files-per-dir")
        .arg("3")
        .arg("--batch-date")
        .arg("2024-06-01");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2024-06-01_001"));

    let batch = folder.join("2024-06-01_001");
    let mut cmd = stager()?;
    cmd.arg("script")
        .arg(&batch)
        .arg("--database")
        .arg("Inventory_2023")
        .arg("--server")
        .arg("sql01")
        .arg("--deployed-server")
        .arg("ssis01")
        .arg("--template")
        .arg("Load.dtsx")
        .arg("--dry-run-sql");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("create_InventoryTbl"));

    let script = fs::read_to_string(batch.join("DJ.bat"))?;
    assert_eq!(script.lines().count(), 3);

    Ok(())
}

#[test]
fn test_cli_rejects_incomplete_configuration() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;

    let mut cmd = stager()?;
    cmd.arg("run")
        .arg("--source")
        .arg(root.path())
        .arg("--output")
        .arg(root.path().join("out"));
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("database is required"));

    Ok(())
}
