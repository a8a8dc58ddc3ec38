use pmoassets::{AssetCaches, AssetNamespace};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DisplayState {
    shown: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NormalizedHtml {
    body: String,
    font_urls: Vec<String>,
}

fn create_test_caches() -> (TempDir, AssetCaches) {
    let temp_dir = tempfile::tempdir().unwrap();
    let caches = AssetCaches::open(temp_dir.path().join("cache_assets")).unwrap();
    (temp_dir, caches)
}

#[test]
fn test_namespaces_are_isolated() {
    let (temp_dir, caches) = create_test_caches();
    let key = "https://example.com/shared-name";

    caches.store(AssetNamespace::Images).write(key, b"image").unwrap();

    assert!(caches.store(AssetNamespace::Images).has(key));
    assert!(!caches.store(AssetNamespace::Fonts).has(key));

    for ns in AssetNamespace::ALL {
        assert_eq!(
            caches.store(ns).dir(),
            temp_dir.path().join("cache_assets").join(ns.key())
        );
    }
}

#[test]
fn test_typed_cache_survives_reopen() {
    let (temp_dir, caches) = create_test_caches();
    let state = DisplayState {
        shown: vec!["campaign-1".into()],
    };

    let cache = caches.typed_cache::<DisplayState>("display_state.json").unwrap();
    assert!(cache.set(state.clone()));
    drop(caches);

    let reopened = AssetCaches::open(temp_dir.path().join("cache_assets")).unwrap();
    let cache = reopened
        .typed_cache::<DisplayState>("display_state.json")
        .unwrap();
    assert_eq!(cache.get(), Some(state));
}

#[test]
fn test_typed_cache_rejects_path_names() {
    let (_temp_dir, caches) = create_test_caches();
    assert!(caches.typed_cache::<DisplayState>("../escape.json").is_err());
}

#[test]
fn test_concurrent_updates_are_not_lost() {
    let (_temp_dir, caches) = create_test_caches();
    let cache = Arc::new(caches.typed_cache::<DisplayState>("shown.json").unwrap());

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                cache.update(|state| {
                    let mut state = state.unwrap_or(DisplayState { shown: vec![] });
                    state.shown.push(format!("campaign-{i}"));
                    state
                });
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(cache.get().unwrap().shown.len(), 8);
}

#[test]
fn test_validated_cache_survives_reopen() {
    let (temp_dir, caches) = create_test_caches();
    let template = "<html><body><p style='x'>Promo</p></body></html>";
    let normalized = NormalizedHtml {
        body: "<p>Promo</p>".into(),
        font_urls: vec!["https://example.com/Inter.woff2".into()],
    };

    let cache = caches.validated_cache::<NormalizedHtml>("html").unwrap();
    assert!(cache.set("campaign-1", template, &normalized));
    drop(cache);
    drop(caches);

    let reopened = AssetCaches::open(temp_dir.path().join("cache_assets")).unwrap();
    let cache = reopened.validated_cache::<NormalizedHtml>("html").unwrap();
    assert_eq!(cache.get("campaign-1", template), Some(normalized));
    assert_eq!(cache.get("campaign-1", "<html>changed</html>"), None);
}

#[test]
fn test_validated_caches_share_preferences() {
    let (_temp_dir, caches) = create_test_caches();
    let html = caches.validated_cache::<String>("html").unwrap();
    let css = caches.validated_cache::<String>("css").unwrap();

    assert!(html.set("same-id", "origin", &"html artifact".to_string()));
    assert!(css.set("same-id", "origin", &"css artifact".to_string()));

    assert_eq!(html.get("same-id", "origin").as_deref(), Some("html artifact"));
    assert_eq!(css.get("same-id", "origin").as_deref(), Some("css artifact"));
    assert_eq!(html.purge_orphans(), 0);
    assert_eq!(caches.preferences().count().unwrap(), 4);
}
