use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::error::Error;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary
fn camcal_cmd() -> Command {
    let mut cmd = Command::cargo_bin("camcal").expect("Failed to find camcal binary");
    cmd.env_remove("CAMCAL_CONFIG").env("NO_COLOR", "1");
    cmd
}

fn write_config(dir: &Path, root: &Path) -> Result<std::path::PathBuf, Box<dyn Error>> {
    let config = dir.join("pipeline.toml");
    fs::write(
        &config,
        format!(
            r#"path = "{}"
pipeline_videos_raw = "raw"
pipeline_calibration = "calib"
calibration_prefix = "calib-"
cam_regex = "cam([A-Z])"
"#,
            root.display().to_string().replace('\\', "/")
        ),
    )?;
    Ok(config)
}

fn touch(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path.parent().ok_or("no parent")?)?;
    fs::write(path, b"dummy content")?;
    Ok(())
}

#[test]
fn test_missing_required_key_fails_with_message() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("pipeline.toml");
    fs::write(&config, "path = \"/data\"\npipeline_videos_raw = \"raw\"\n")?;

    camcal_cmd()
        .arg("calibrate")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("pipeline_calibration"));
    Ok(())
}

#[test]
fn test_non_existent_config_fails() -> Result<(), Box<dyn Error>> {
    camcal_cmd()
        .arg("plan")
        .arg("--config")
        .arg("surely/this/does/not/exist/pipeline.toml")
        .assert()
        .failure()
        .stderr(contains("Failed to load configuration"));
    Ok(())
}

#[test]
fn test_plan_lists_cameras_per_session() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("data");
    touch(&root.join("s1/raw/calib-camA-1.avi"))?;
    touch(&root.join("s1/raw/calib-camA-2.avi"))?;
    touch(&root.join("s1/raw/calib-camB-1.avi"))?;
    touch(&root.join("s1/calib/intrinsics_B.toml"))?;
    let config = write_config(dir.path(), &root)?;

    camcal_cmd()
        .arg("plan")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(contains("camera A: 2 video(s), pending"))
        .stdout(contains("camera B: 1 video(s), calibrated (existing)"));
    Ok(())
}

#[test]
fn test_path_flag_overrides_config_root() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let other = dir.path().join("other");
    touch(&other.join("s9/raw/calib-camQ-1.avi"))?;
    let config = write_config(dir.path(), &dir.path().join("missing-root"))?;

    camcal_cmd()
        .arg("plan")
        .arg("--config")
        .arg(&config)
        .arg("--path")
        .arg(&other)
        .assert()
        .success()
        .stdout(contains("camera Q"));
    Ok(())
}

#[test]
fn test_calibrate_with_everything_done_succeeds() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("data");
    touch(&root.join("s1/raw/calib-camA-1.avi"))?;
    touch(&root.join("s1/calib/intrinsics_A.toml"))?;
    let config = write_config(dir.path(), &root)?;

    camcal_cmd()
        .arg("calibrate")
        .arg("--config")
        .arg(&config)
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"calibrated-existing\""))
        .stdout(contains("\"camera\": \"A\""));

    // The existing file is left untouched
    assert_eq!(fs::read(root.join("s1/calib/intrinsics_A.toml"))?, b"dummy content");
    Ok(())
}

#[test]
fn test_calibrate_failure_leaves_no_intrinsics_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("data");
    touch(&root.join("s1/raw/calib-camA-1.avi"))?;
    let config = write_config(dir.path(), &root)?;

    camcal_cmd()
        .arg("calibrate")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("Error:"));

    assert!(!root.join("s1/calib/intrinsics_A.toml").exists());
    Ok(())
}

#[test]
fn test_log_file_is_written() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("data");
    fs::create_dir_all(root.join("s1"))?;
    let config = write_config(dir.path(), &root)?;
    let log_file = dir.path().join("logs/camcal.log");

    camcal_cmd()
        .arg("calibrate")
        .arg("--config")
        .arg(&config)
        .arg("--log-file")
        .arg(&log_file)
        .assert()
        .success();

    let contents = fs::read_to_string(&log_file)?;
    assert!(predicate::str::contains("0 to calibrate").eval(&contents), "{contents}");
    Ok(())
}

#[test]
fn test_invalid_subcommand_fails() -> Result<(), Box<dyn Error>> {
    camcal_cmd()
        .arg("encode")
        .assert()
        .failure()
        .stderr(contains("unrecognized subcommand"));
    Ok(())
}
