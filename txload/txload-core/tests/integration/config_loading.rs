use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use txload_core::application::RunSettings;
use txload_core::domain::{Backoff, Role};
use txload_core::foundation::ErrorCode;
use txload_core::infrastructure::config::{load_config, load_config_from_file};

const TOML_CONFIG: &str = r#"
transactions_per_node = 1000
outputs_per_transaction = 100
worker_count = 8
receiver_address_base = "1ReceiverBase"
receiver_key_identifier = "1ReceiverKey"

[[nodes]]
ip = "10.0.0.1"
port = "5500"
id = "node-funder"
signature = "sig-a"
address_base = "1FunderBase"
key_identifier = "1FunderKey"

[[nodes]]
ip = "10.0.0.2"
port = "5500"
id = "node-b"
signature = "sig-b"
address_base = "1BBase"
key_identifier = "1BKey"

[funding]
settle_delay_secs = 5

[dispatch]
sign_backoff_millis = 250
"#;

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().expect("env lock")
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn test_config_loading_when_toml_file_then_sections_and_defaults_merge() {
    let _guard = lock_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let config = load_config(&write(dir.path(), "txload.toml", TOML_CONFIG)).expect("load config");

    assert_eq!(config.nodes.len(), 2);
    assert_eq!(config.transactions_per_node, 1000);
    assert_eq!(config.worker_count, 8);
    assert_eq!(config.funding.settle_delay_secs, 5);
    assert_eq!(config.funding.max_attempts, 12);
    assert_eq!(config.preparation.cooldown_secs, 60);

    let participants = config.participants();
    assert_eq!(participants[0].role, Role::Funder);
    assert_eq!(participants[1].role, Role::Participant);
    assert_eq!(participants[1].address(), "1BBaselal1BKey");
    assert_eq!(participants[0].endpoint.to_string(), "10.0.0.1:5500");

    let settings = RunSettings::from_config(&config);
    assert_eq!(settings.outputs_per_batch, 100);
    assert_eq!(settings.stabilization.settle_delay, Duration::from_secs(5));
    assert_eq!(settings.dispatch.worker_count, 8);
    assert_eq!(settings.dispatch.sign_policy.backoff, Backoff::Fixed(Duration::from_millis(250)));
    assert_eq!(settings.receiver.address(), "1ReceiverBaselal1ReceiverKey");
}

#[test]
fn test_config_loading_when_json_file_with_legacy_worker_key_then_worker_count_taken() {
    let _guard = lock_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let json = r#"{
        "nodes": [{ "ip": "127.0.0.1", "port": "5500", "id": "n1", "signature": "s", "address_base": "b", "key_identifier": "k" }],
        "transactions_per_node": 10,
        "outputs_per_transaction": 5,
        "goroutine_count": 3,
        "receiver_address_base": "rb",
        "receiver_key_identifier": "rk"
    }"#;
    let config = load_config(&write(dir.path(), "txload.json", json)).expect("load config");
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.nodes[0].id, "n1");
}

#[test]
fn test_config_loading_when_env_overrides_then_env_wins() {
    let _guard = lock_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write(dir.path(), "txload.toml", TOML_CONFIG);

    env::set_var("TXLOAD_WORKER_COUNT", "32");
    env::set_var("TXLOAD_DISPATCH__SIGN_ATTEMPTS", "9");
    let loaded = load_config(&path);
    env::remove_var("TXLOAD_WORKER_COUNT");
    env::remove_var("TXLOAD_DISPATCH__SIGN_ATTEMPTS");

    let config = loaded.expect("load config");
    assert_eq!(config.worker_count, 32);
    assert_eq!(config.dispatch.sign_attempts, 9);
    assert_eq!(config.dispatch.sign_backoff_millis, 250);
}

#[test]
fn test_config_loading_when_values_invalid_then_every_problem_reported() {
    let _guard = lock_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let toml = r#"
transactions_per_node = 5
outputs_per_transaction = 10
worker_count = 0

[[nodes]]
ip = ""
port = "5500"
id = "n1"
address_base = "b"
key_identifier = "k"
"#;
    let path = write(dir.path(), "bad.toml", toml);

    let err = load_config(&path).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigError);
    let message = err.to_string();
    assert!(message.contains("nodes[0].ip"), "{message}");
    assert!(message.contains("worker_count"), "{message}");
    assert!(message.contains("receiver_address_base"), "{message}");

    let unchecked = load_config_from_file(&path).expect("unvalidated load");
    assert_eq!(unchecked.validate().map_err(|errors| errors.len()), Err(3));
}

#[test]
fn test_config_loading_when_file_malformed_then_config_error() {
    let _guard = lock_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write(dir.path(), "broken.toml", "transactions_per_node = \"many\"");
    let err = load_config_from_file(&path).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigError);
}

#[test]
fn test_config_loading_when_batch_larger_than_target_then_accepted() {
    let _guard = lock_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write(dir.path(), "txload.toml", &TOML_CONFIG.replace("outputs_per_transaction = 100", "outputs_per_transaction = 5000"));

    let config = load_config(&path).expect("load config");
    assert_eq!(config.outputs_per_transaction, 5000);
    assert_eq!(config.transactions_per_node / config.outputs_per_transaction, 0);
}
