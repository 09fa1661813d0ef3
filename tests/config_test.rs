//! Configuration loading from TOML files.

use carton::config::{load_config, load_config_or_default};
use std::io::Write;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_full_config() {
    let file = write_config(
        r#"
        [processor]
        max_concurrent = 8
        queue_capacity = 128
        dry_run = true

        [defaults]
        provider = "docker"
        image = "ubuntu-24.04"
        region = "eu-west"

        [defaults.compute]
        cpushare = "2"
        memory = "2048"
        swap = "512"
        hdd = "40"
        "#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.processor.max_concurrent, 8);
    assert_eq!(config.processor.queue_capacity, 128);
    assert!(config.processor.dry_run);
    assert_eq!(config.defaults.provider, "docker");
    assert_eq!(config.defaults.region.as_deref(), Some("eu-west"));
    assert_eq!(config.defaults.compute.hdd, "40");
}

#[test]
fn invalid_values_rejected() {
    let file = write_config("[processor]\nqueue_capacity = 0\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("queue_capacity"), "got: {err:#}");
}

#[test]
fn malformed_toml_names_file() {
    let file = write_config("[processor\nmax_concurrent = 2\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn explicit_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("carton.toml");
    assert!(load_config_or_default(Some(&missing)).is_err());
}
