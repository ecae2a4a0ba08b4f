use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use candy_core::pleasantry::Plain;
use candy_core::{PriceTable, TransactionProcessor};
use candy_net::{CredentialPaths, CredentialSet, ServerSettings, VendingServer};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};

const USAGE: &str = "Usage: candy-client -k CANDY_TYPE -c CANDY_COUNT -m MONEY";

fn client() -> Command {
    Command::new(cargo_bin!("candy-client"))
}

#[test]
fn test_no_arguments_prints_usage() {
    client()
        .assert()
        .failure()
        .stderr(predicate::str::contains(USAGE));
}

#[test]
fn test_invalid_arguments_print_usage() {
    let cases: &[&[&str]] = &[
        &["-k", "CE", "-c", "3"],
        &["-k", "CE", "-c", "0", "-m", "50"],
        &["-k", "CE", "-c", "-1", "-m", "50"],
        &["-k", "CE", "-c", "3", "-m", "0"],
        &["-k", "", "-c", "3", "-m", "50"],
        &["-k", "CE", "-c", "three", "-m", "50"],
        &["-k", "CE", "-c", "3", "-m", "50", "--bogus"],
    ];

    for args in cases {
        client()
            .args(*args)
            .assert()
            .code(2)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains(USAGE));
    }
}

#[test]
fn test_missing_credentials_fail_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("candy.toml");
    std::fs::write(
        &config,
        r#"
        [client]
        server_addr = "127.0.0.1:1"

        [client.credentials]
        ca_cert = "/nonexistent/ca-cert.pem"
        cert = "/nonexistent/client-cert.pem"
        key = "/nonexistent/client-key.pem"
        "#,
    )
    .unwrap();

    client()
        .args(["-k", "CE", "-c", "3", "-m", "50", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load client credentials"))
        .stderr(predicate::str::contains("/nonexistent/ca-cert.pem"));
}

#[test]
fn test_server_section_does_not_block_client() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("candy.toml");
    std::fs::write(
        &config,
        r#"
        [server]
        bind_addr = ""
        handshake_timeout_secs = 0

        [client.credentials]
        ca_cert = "/nonexistent/ca-cert.pem"
        cert = "/nonexistent/client-cert.pem"
        key = "/nonexistent/client-key.pem"
        "#,
    )
    .unwrap();

    // Gets past configuration and stops at the client's own credentials
    client()
        .args(["-k", "CE", "-c", "3", "-m", "50", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load client credentials"));
}

#[test]
fn test_bad_server_override_is_config_error() {
    client()
        .args(["-k", "CE", "-c", "3", "-m", "50", "--server", "no-port-here"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid client configuration"));
}

#[test]
fn test_missing_config_file_fails() {
    client()
        .args(["-k", "CE", "-c", "3", "-m", "50", "--config", "/nonexistent/candy.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load configuration"));
}

// =============================================================================
// Against a live server
// =============================================================================

fn write_material(dir: &Path) -> (CredentialPaths, CredentialPaths) {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca = ca_params.self_signed(&ca_key).unwrap();
    std::fs::write(dir.join("ca-cert.pem"), ca.pem()).unwrap();

    let issue = |name: &str, sans: Vec<String>| {
        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(sans)
            .unwrap()
            .signed_by(&key, &ca, &ca_key)
            .unwrap();
        std::fs::write(dir.join(format!("{}-cert.pem", name)), cert.pem()).unwrap();
        std::fs::write(dir.join(format!("{}-key.pem", name)), key.serialize_pem()).unwrap();
        CredentialPaths {
            ca_cert: dir.join("ca-cert.pem"),
            cert: dir.join(format!("{}-cert.pem", name)),
            key: dir.join(format!("{}-key.pem", name)),
        }
    };

    let server = issue("server", vec!["localhost".into(), "127.0.0.1".into()]);
    let client = issue("client", vec!["candy-client".into()]);
    (server, client)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_purchase_against_live_server() {
    let dir = tempfile::tempdir().unwrap();
    let (server_paths, client_paths) = write_material(dir.path());

    let settings = ServerSettings {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        ..ServerSettings::default()
    };
    let handle = VendingServer::new(
        settings,
        Arc::new(CredentialSet::load(&server_paths).unwrap()),
        TransactionProcessor::new(PriceTable::default(), Arc::new(Plain)),
    )
    .start()
    .await
    .unwrap();

    let config = dir.path().join("candy.toml");
    std::fs::write(
        &config,
        format!(
            "[client.credentials]\nca_cert = {:?}\ncert = {:?}\nkey = {:?}\n",
            client_paths.ca_cert.display().to_string(),
            client_paths.cert.display().to_string(),
            client_paths.key.display().to_string(),
        ),
    )
    .unwrap();
    let server = format!("127.0.0.1:{}", handle.local_addr().port());

    let run = |args: &'static [&'static str]| {
        let mut cmd = client();
        cmd.args(args)
            .arg("--server")
            .arg(&server)
            .arg("--config")
            .arg(&config);
        tokio::task::spawn_blocking(move || cmd.output().unwrap())
    };

    // Scenario A
    run(&["-k", "CE", "-c", "3", "-m", "50"])
        .await
        .unwrap()
        .assert()
        .success()
        .stdout(predicate::str::contains("Thank you!"))
        .stdout(predicate::str::contains("Change: 20"));

    // Business rejections are decided orders, so they exit 0
    run(&["-k", "AA", "-c", "2", "-m", "20"])
        .await
        .unwrap()
        .assert()
        .success()
        .stdout(predicate::str::contains("You need 10 more money!"));

    run(&["-k", "ZZ", "-c", "1", "-m", "100"])
        .await
        .unwrap()
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid candy type"));

    handle.shutdown().await;
}
