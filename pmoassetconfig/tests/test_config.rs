use pmoassetconfig::Config;
use std::time::Duration;

#[test]
fn test_load_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::load(temp_dir.path().to_str().unwrap()).unwrap();

    assert!(temp_dir.path().join("config.yaml").exists());
    assert_eq!(config.config_dir(), temp_dir.path());
}

#[test]
fn test_load_merges_user_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        temp_dir.path().join("config.yaml"),
        "cache:\n  download_timeout_secs: 5\n",
    )
    .unwrap();

    let config = Config::load(temp_dir.path().to_str().unwrap()).unwrap();
    assert_eq!(config.get_download_timeout(), Duration::from_secs(5));
    assert_eq!(config.get_namespace_dir("html"), "html");
}

#[test]
fn test_setters_are_persisted() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dir = temp_dir.path().to_str().unwrap();

    let config = Config::load(dir).unwrap();
    config.set_download_timeout(Duration::from_secs(30)).unwrap();
    config.set_namespace_dir("images", "pictures").unwrap();

    let reloaded = Config::load(dir).unwrap();
    assert_eq!(reloaded.get_download_timeout(), Duration::from_secs(30));
    assert_eq!(reloaded.get_namespace_dir("images"), "pictures");
}

#[test]
fn test_cache_root_is_relative_to_config_dir() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::from_yaml_str("cache:\n  root: assets\n", temp_dir.path()).unwrap();

    let root = config.get_cache_root().unwrap();
    assert_eq!(root, temp_dir.path().join("assets"));
    assert!(root.is_dir());
}

#[test]
fn test_init_logging_only_once() {
    let config = Config::from_yaml_str("log:\n  min_level: debug\n", "/tmp").unwrap();

    assert!(pmoassetconfig::logging::init_logging(&config));
    assert!(!pmoassetconfig::logging::init_logging(&config));
    tracing::debug!("logging initialised");
}
