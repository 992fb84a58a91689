mod helpers;

use helpers::audio_generator::generate_sine_wav;
use pcm_session::engine::metadata::{LoftyStore, MetadataStore, TagError, TagValue};
use tempfile::TempDir;

#[test]
fn track_number_and_title_survive_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tagged.wav");
    generate_sine_wav(&path, 44_100, 2, 200, 440.0, 0.25).unwrap();

    let mut store = LoftyStore::open(&path).unwrap();
    store.set_text("trkn", "3/12").unwrap();
    store.set_text("title", "Unreal Superhero 3").unwrap();
    assert_eq!(store.get("tracknumber"), Some(TagValue::from("3/12")));
    store.save().unwrap();

    let reopened = LoftyStore::open(&path).unwrap();
    assert_eq!(reopened.get("trkn"), Some(TagValue::from("3/12")));
    assert_eq!(
        reopened.get("©nam").as_ref().and_then(TagValue::as_text),
        Some("Unreal Superhero 3")
    );
    assert!(reopened.keys().contains(&"trkn".to_string()));
}

#[test]
fn track_without_total_and_removal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("single.wav");
    generate_sine_wav(&path, 44_100, 1, 100, 220.0, 0.25).unwrap();

    let mut store = LoftyStore::open(&path).unwrap();
    store.set_text("trkn", "7").unwrap();
    assert_eq!(store.get("trkn"), Some(TagValue::from("7")));

    store.remove("trkn");
    assert!(!store.contains("trkn"));
}

#[test]
fn malformed_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.wav");
    generate_sine_wav(&path, 44_100, 1, 100, 220.0, 0.25).unwrap();

    let mut store = LoftyStore::open(&path).unwrap();
    assert!(matches!(
        store.set_text("trkn", "three"),
        Err(TagError::InvalidValue { .. })
    ));
    assert!(matches!(
        store.set_text("tmpo", "fast"),
        Err(TagError::InvalidValue { .. })
    ));
}

#[test]
fn unreadable_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("junk.m4a");
    std::fs::write(&path, b"definitely not audio").unwrap();
    assert!(matches!(LoftyStore::open(&path), Err(TagError::Read(_))));
}
