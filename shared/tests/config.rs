mod common;

use std::collections::BTreeSet;
use std::fs;

use blackout_shared::config::{load_config, save_config};
use blackout_shared::{AppConfig, JsonSettingsStore, SettingsStore};
use common::keys;
use tempfile::tempdir;

#[test]
fn absent_selection_round_trips_as_absent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut store = JsonSettingsStore::open(&path);
    store.save_selection(&None);

    let reopened = JsonSettingsStore::open(&path);
    assert_eq!(reopened.load_selection(), None);
    assert!(fs::read_to_string(&path)
        .unwrap()
        .contains("\"selected_monitors\": null"));
}

#[test]
fn empty_selection_round_trips_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut store = JsonSettingsStore::open(&path);
    store.save_selection(&Some(BTreeSet::new()));

    let reopened = JsonSettingsStore::open(&path);
    assert_eq!(reopened.load_selection(), Some(BTreeSet::new()));
}

#[test]
fn settings_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut store = JsonSettingsStore::open(&path);
    store.save_selection(&keys(&["DEL40F4:1", "BOUNDS:0,0,1920,1080"]));
    store.save_opacity(65);
    store.save_click_through(true);

    let reopened = JsonSettingsStore::open(&path);
    assert_eq!(
        reopened.load_selection(),
        keys(&["BOUNDS:0,0,1920,1080", "DEL40F4:1"])
    );
    assert_eq!(reopened.load_opacity(), 65);
    assert!(reopened.load_click_through());
}

#[test]
fn missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let config = load_config(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.opacity, 100);
}

#[test]
fn corrupt_file_opens_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(load_config(&path).is_err());
    let store = JsonSettingsStore::open(&path);
    assert_eq!(store.config(), &AppConfig::default());
}

#[test]
fn partial_file_fills_defaults_and_clamps_opacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "opacity": 250 }"#).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.opacity, 100);
    assert_eq!(config.selected_monitors, None);
    assert!(!config.click_through);
}

#[test]
fn out_of_range_opacity_keeps_the_saved_selection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "selected_monitors": ["DEL40F4:1"], "opacity": 300 }"#).unwrap();

    let store = JsonSettingsStore::open(&path);
    assert_eq!(store.load_selection(), keys(&["DEL40F4:1"]));
    assert_eq!(store.load_opacity(), 100);

    fs::write(&path, r#"{ "selected_monitors": [], "opacity": -20 }"#).unwrap();
    let store = JsonSettingsStore::open(&path);
    assert_eq!(store.load_selection(), Some(BTreeSet::new()));
    assert_eq!(store.load_opacity(), 0);
}

#[test]
fn save_opacity_clamps_out_of_range_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut store = JsonSettingsStore::open(&path);
    store.save_opacity(-5);
    assert_eq!(store.load_opacity(), 0);

    store.save_opacity(300);
    save_config(&path, store.config()).unwrap();
    assert_eq!(load_config(&path).unwrap().opacity, 100);
}
