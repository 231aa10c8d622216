use std::fs;
use std::path::Path;

use als2mid_core::{CandidateSource, SaveReason, Verdict};
use als2mid_host::{latest_live_dir, LocateRequest, Locator, LocatorSettings, SettingsStore};
use tempfile::tempdir;

fn utf16le(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(text.encode_utf16().flat_map(|unit| unit.to_le_bytes()));
    bytes
}

fn install_live(root: &Path, version: &str, log: &str, prefs: &[u8]) {
    let prefs_dir = root.join(format!("Live {version}")).join("Preferences");
    fs::create_dir_all(&prefs_dir).expect("create prefs dir");
    fs::write(prefs_dir.join("Log.txt"), log).expect("write log");
    fs::write(prefs_dir.join("Preferences.cfg"), prefs).expect("write prefs");
}

#[test]
fn newest_install_is_used_and_saved_template_resolves_from_prefs() {
    let temp = tempdir().expect("tempdir");
    install_live(
        temp.path(),
        "11.3.13",
        "info: Loading \"C:\\Old\\Stale.als\"\n",
        b"",
    );
    // Chronological order: preferences written, then the template opened.
    let log = concat!(
        "2024-05-01T09:59:00: info: Default App: End SavePrefs\n",
        "2024-05-01T10:00:00: info: Loading document \"C:\\ProgramData\\Ableton\\Live 12\\Resources\\Builtin\\Templates\\DefaultLiveSet.als\"\n",
        "2024-05-01T10:00:01: info: SavePrefs requested\n",
    );
    let prefs = utf16le("\u{1}RecentDocsList\u{0}\u{5}FileRef\u{9}D:\\Sets\\Night Drive.als\u{0}");
    install_live(temp.path(), "12.0.5", log, &prefs);

    let paths = latest_live_dir(temp.path()).expect("find install");
    assert_eq!(paths.version, "12.0.5");

    let resolution = Locator::default()
        .locate(&LocateRequest::for_live(&paths))
        .expect("locate");
    let candidate = resolution.verdict.candidate().expect("ready");
    assert_eq!(candidate.path(), "D:/Sets/Night Drive.als");
    assert_eq!(candidate.source(), CandidateSource::Prefs);
    assert_eq!(
        resolution.export.expect("export plan").output,
        "D:/Sets/Night Drive.mid"
    );
}

#[test]
fn template_below_marker_in_tail_requires_save() {
    let temp = tempdir().expect("tempdir");
    let log = concat!(
        "info: Loading document \"C:\\ProgramData\\Ableton\\Live 12\\Resources\\Builtin\\Templates\\DefaultLiveSet.als\"\n",
        "info: Default App: End SavePrefs\n",
    );
    install_live(temp.path(), "12.1", log, b"");

    let paths = latest_live_dir(temp.path()).expect("find install");
    let resolution = Locator::default()
        .locate(&LocateRequest::for_live(&paths))
        .expect("locate");
    assert_eq!(
        resolution.verdict,
        Verdict::SaveRequired {
            reason: SaveReason::DefaultTemplateNotSaved
        }
    );
    assert!(resolution.export.is_none());
}

#[test]
fn stored_settings_drive_the_locator() {
    let temp = tempdir().expect("tempdir");
    let settings_path = temp.path().join("settings.json");
    let mut store = SettingsStore::new(settings_path.clone(), LocatorSettings::default());
    store
        .update(|settings| {
            settings.log_tail_lines = 1;
            settings.scan.project_extension = "alp".to_string();
        })
        .expect("save settings");

    let reloaded = SettingsStore::load(&settings_path).expect("reload");
    assert_eq!(reloaded.settings().scan.project_extension, ".alp");

    let log_path = temp.path().join("Log.txt");
    fs::write(
        &log_path,
        "info: Loading \"C:\\Packs\\Older.alp\"\ninfo: Loading \"C:\\Packs\\Newest.alp\"\n",
    )
    .expect("write log");

    let locator = Locator::new(reloaded.into_settings());
    let resolution = locator
        .locate(&LocateRequest {
            log: log_path,
            ..LocateRequest::default()
        })
        .expect("locate");
    assert_eq!(resolution.project_path(), Some("C:/Packs/Newest.alp"));
    assert_eq!(resolution.export.expect("export plan").base_name, "Newest");
}
