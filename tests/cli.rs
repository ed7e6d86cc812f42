use assert_cmd::Command;
use predicates::prelude::*;

fn drive_scribe() -> Command {
    let mut cmd = Command::cargo_bin("drive-scribe").unwrap();
    cmd.env_remove("GOOGLE_OAUTH_ACCESS_TOKEN")
        .env_remove("GOOGLE_OAUTH_TOKEN");
    cmd
}

#[test]
fn help_lists_download_command() {
    drive_scribe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download"));
}

#[test]
fn download_requires_a_source() {
    drive_scribe()
        .arg("download")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn unparseable_file_id_fails_before_auth() {
    let dir = tempfile::tempdir().unwrap();
    drive_scribe()
        .current_dir(dir.path())
        .args(["download", "--file-id", "not a valid id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse"));
}

#[test]
fn missing_token_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    drive_scribe()
        .current_dir(dir.path())
        .args(["download", "--file-id", "ABCDEFGHIJ1234", "--token"])
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("token file not found"));
}
