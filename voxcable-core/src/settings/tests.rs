use crate::settings::manager::SettingsManager;
use crate::settings::Settings;
use crate::tts::types::BackendKind;
use tempfile::TempDir;

#[test]
fn defaults_match_virtual_cable_setup() {
    let settings = Settings::default();

    assert_eq!(settings.audio.device_name, "CABLE Input");
    assert_eq!(settings.tts.default_backend, BackendKind::NetworkNeural);
    assert_eq!(settings.tts.edge.voice, "zh-TW-HsiaoChenNeural");
    assert_eq!(settings.tts.edge.rate_percent, 10);
    assert_eq!(settings.tts.espeak.rate_wpm, 175);
}

#[test]
fn from_path_writes_default_file_on_first_run() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");

    let manager = SettingsManager::from_path(settings_path.clone()).unwrap();

    assert!(settings_path.exists());
    assert_eq!(manager.settings().audio.device_name, "CABLE Input");
}

#[test]
fn partial_file_fills_in_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, "[audio]\ndevice_name = \"Speakers\"\n").unwrap();

    let manager = SettingsManager::from_path(settings_path).unwrap();
    let settings = manager.settings();

    assert_eq!(settings.audio.device_name, "Speakers");
    assert_eq!(settings.tts.espeak.rate_wpm, 175);
}

#[test]
fn corrupt_file_is_backed_up_and_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, "this is not toml {{{{").unwrap();

    let manager = SettingsManager::from_path(settings_path.clone()).unwrap();

    assert!(settings_path.with_extension("toml.backup").exists());
    assert_eq!(manager.settings().audio.device_name, "CABLE Input");
}

#[test]
fn update_setting_changes_memory_not_disk() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");

    let manager = SettingsManager::from_path(settings_path.clone()).unwrap();
    manager.update_setting(|s| s.audio.device_name = "Line 1".to_string());

    assert_eq!(manager.settings().audio.device_name, "Line 1");
    let on_disk = std::fs::read_to_string(&settings_path).unwrap();
    assert!(on_disk.contains("CABLE Input"));
}

#[test]
fn backend_kind_round_trips_through_toml() {
    let mut settings = Settings::default();
    settings.tts.default_backend = BackendKind::LocalOffline;

    let serialized = toml::to_string_pretty(&settings).unwrap();
    assert!(serialized.contains("local-offline"));

    let reloaded: Settings = toml::from_str(&serialized).unwrap();
    assert_eq!(reloaded.tts.default_backend, BackendKind::LocalOffline);
}
