use super::*;
use chrono::{TimeZone, Utc};
use std::thread;
use tempfile::TempDir;

fn create_test_document(path: &str, content: &str, embedding: Vec<f32>) -> Document {
    let modified = Utc
        .with_ymd_and_hms(2024, 3, 14, 15, 9, 26)
        .single()
        .expect("valid timestamp");
    Document::new(path, content, modified).with_embedding(embedding)
}

fn create_test_cache() -> (VectorCache, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let cache = VectorCache::new(temp_dir.path().join("cache").join("embeddings-cache.json"));
    (cache, temp_dir)
}

#[test]
fn store_then_get_returns_document() {
    let (cache, _temp_dir) = create_test_cache();
    let doc = create_test_document("guide/intro.md", "# Intro", vec![0.1, 0.2, 0.3]);

    cache.store(doc.clone());

    let stored = cache.get("guide/intro.md").expect("document should be stored");
    assert_eq!(*stored, doc);
    assert!(cache.get("missing.md").is_none());
}

#[test]
fn store_overwrites_same_path() {
    let (cache, _temp_dir) = create_test_cache();
    let first = create_test_document("a.md", "first", vec![1.0, 0.0]);
    let second = create_test_document("a.md", "second", vec![0.0, 1.0]);

    cache.store(first);
    cache.store(second.clone());

    assert_eq!(cache.len(), 1);
    assert_eq!(*cache.get("a.md").expect("document exists"), second);
}

#[test]
fn list_returns_every_document() {
    let (cache, _temp_dir) = create_test_cache();
    for name in ["a.md", "b.md", "c.md"] {
        cache.store(create_test_document(name, name, vec![1.0]));
    }

    let mut paths: Vec<String> = cache.list().iter().map(|d| d.path.clone()).collect();
    paths.sort();
    assert_eq!(paths, vec!["a.md", "b.md", "c.md"]);
}

#[test]
fn loaded_flag_lifecycle() {
    let (cache, _temp_dir) = create_test_cache();
    assert!(!cache.is_loaded());

    cache.store(create_test_document("a.md", "a", vec![1.0]));
    assert!(!cache.is_loaded());

    cache.set_loaded();
    assert!(cache.is_loaded());

    cache.clear();
    assert!(cache.list().is_empty());
    assert!(cache.is_empty());
    assert!(!cache.is_loaded());
}

#[test]
fn snapshot_round_trip() {
    let (cache, temp_dir) = create_test_cache();
    let docs = vec![
        create_test_document("a.md", "alpha", vec![0.25, -0.5, 1.0]),
        create_test_document("nested/b.md", "beta ünïcödé", vec![1e-7, 3.5]),
        create_test_document("c.md", "gamma", Vec::new()),
    ];
    for doc in &docs {
        cache.store(doc.clone());
    }

    cache.save_to_disk().expect("snapshot should save");
    assert!(
        temp_dir
            .path()
            .join("cache")
            .join("embeddings-cache.json")
            .exists()
    );

    let restored = VectorCache::new(cache.snapshot_path());
    let count = restored.load_from_disk().expect("snapshot should load");
    assert_eq!(count, 3);
    assert!(!restored.is_loaded(), "loading never marks the cache ready");

    for doc in &docs {
        let loaded = restored.get(&doc.path).expect("document restored");
        assert_eq!(loaded.path, doc.path);
        assert_eq!(loaded.content, doc.content);
        assert_eq!(loaded.embedding, doc.embedding);
        assert_eq!(loaded.modified, doc.modified);
    }
}

#[test]
fn snapshot_format_is_object_keyed_by_path() {
    let (cache, _temp_dir) = create_test_cache();
    cache.store(create_test_document("docs/a.md", "alpha", vec![1.0, 2.0]));
    cache.save_to_disk().expect("snapshot should save");

    let raw = fs::read_to_string(cache.snapshot_path()).expect("snapshot readable");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("snapshot is json");
    let entry = &value["docs/a.md"];
    assert_eq!(entry["path"], "docs/a.md");
    assert_eq!(entry["content"], "alpha");
    assert_eq!(entry["embedding"], serde_json::json!([1.0, 2.0]));
    assert_eq!(entry["modified"], "2024-03-14T15:09:26Z");
}

#[test]
fn load_missing_snapshot_is_not_an_error() {
    let (cache, _temp_dir) = create_test_cache();
    assert_eq!(cache.load_from_disk().expect("missing file is fine"), 0);
    assert!(cache.is_empty());
}

#[test]
fn load_corrupt_snapshot_reports_persistence_error() {
    let (cache, _temp_dir) = create_test_cache();
    let parent = cache.snapshot_path().parent().expect("has parent");
    fs::create_dir_all(parent).expect("create cache dir");
    fs::write(cache.snapshot_path(), b"{not json").expect("write corrupt file");

    let result = cache.load_from_disk();
    assert!(matches!(result, Err(RagError::Persistence(_))));
    assert!(cache.is_empty());
}

#[test]
fn remove_snapshot() {
    let (cache, _temp_dir) = create_test_cache();
    assert!(!cache.remove_snapshot().expect("nothing to remove"));

    cache.store(create_test_document("a.md", "a", vec![1.0]));
    cache.save_to_disk().expect("snapshot should save");
    assert!(cache.remove_snapshot().expect("snapshot removed"));
    assert!(!cache.snapshot_path().exists());
}

#[test]
fn concurrent_readers_and_writers() {
    let (cache, _temp_dir) = create_test_cache();
    let cache = Arc::new(cache);

    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..50 {
                    cache.store(create_test_document(
                        &format!("w{writer}/doc{i}.md"),
                        "content",
                        vec![i as f32],
                    ));
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..50 {
                    let listed = cache.list();
                    assert!(listed.len() <= 200);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("thread should not panic");
    }

    assert_eq!(cache.len(), 200);
}
