use assert_cmd::Command;

/// A `bedrock-cli` invocation isolated from the developer's `.env` and
/// `config/` directory.
fn cli(workdir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bedrock-cli").unwrap();
    cmd.current_dir(workdir.path())
        .env("BEDROCK_CONFIG_DIR", workdir.path())
        .env("BEDROCK_ENV", "local")
        .env_remove("BEDROCK_DATABASE__URI")
        .env_remove("RUST_LOG");
    cmd
}

fn stderr_of(cmd: &mut Command) -> String {
    let output = cmd.assert().failure().get_output().clone();
    String::from_utf8(output.stderr).unwrap()
}

#[test]
fn help_lists_subcommands() {
    let workdir = tempfile::tempdir().unwrap();
    let output = cli(&workdir).arg("--help").assert().success().get_output().clone();
    let stdout = String::from_utf8(output.stdout).unwrap();

    for command in ["bootstrap", "status", "serve"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn invalid_configuration_is_reported_before_connecting() {
    let workdir = tempfile::tempdir().unwrap();
    let stderr = stderr_of(
        cli(&workdir)
            .env("BEDROCK_DATABASE__URI", "http://localhost:27017")
            .arg("bootstrap"),
    );

    assert!(stderr.contains("failed to load Bedrock settings"));
    assert!(stderr.contains("database.uri must be a valid URI"));
}

#[test]
fn empty_username_is_rejected() {
    let workdir = tempfile::tempdir().unwrap();
    let stderr = stderr_of(cli(&workdir).args(["bootstrap", "--username", ""]));

    assert!(stderr.contains("invalid bootstrap plan: username must not be empty"));
}

#[test]
fn unknown_environment_is_rejected() {
    let workdir = tempfile::tempdir().unwrap();
    let stderr = stderr_of(cli(&workdir).env("BEDROCK_ENV", "qa").arg("status"));

    assert!(stderr.contains("unsupported environment 'qa'"));
}

/// Settings pointing at a port nothing listens on, failing fast.
fn unreachable(cmd: &mut Command) -> &mut Command {
    cmd.env("BEDROCK_DATABASE__URI", "mongodb://127.0.0.1:1")
        .env("BEDROCK_DATABASE__CONNECT_TIMEOUT_MS", "300")
}

#[test]
fn bootstrap_against_unreachable_server_fails_without_confirmation() {
    let workdir = tempfile::tempdir().unwrap();
    let output = unreachable(&mut cli(&workdir))
        .arg("bootstrap")
        .assert()
        .failure()
        .get_output()
        .clone();

    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("database bootstrap failed"));
    assert!(stderr.contains("connection error"));
}

#[test]
fn status_against_unreachable_server_fails_without_report() {
    let workdir = tempfile::tempdir().unwrap();
    let output = unreachable(&mut cli(&workdir))
        .arg("status")
        .assert()
        .failure()
        .get_output()
        .clone();

    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to read bootstrap status"));
    assert!(stderr.contains("connection error"));
}
