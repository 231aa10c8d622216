use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use als2mid_core::ScanConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::read::DEFAULT_LOG_TAIL_LINES;

const MAX_LOG_TAIL_LINES: usize = 100_000;
const MAX_ATTEMPTS_CAP: u32 = 100;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize settings {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to prepare directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 定位器的使用者設定。 / User-tunable locator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSettings {
    /// Overrides the platform's Ableton preferences folder.
    #[serde(default)]
    pub prefs_root: Option<PathBuf>,
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_log_tail_lines() -> usize {
    DEFAULT_LOG_TAIL_LINES
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            prefs_root: None,
            log_tail_lines: default_log_tail_lines(),
            scan: ScanConfig::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl LocatorSettings {
    pub fn sanitize(&mut self) {
        if self.log_tail_lines == 0 {
            self.log_tail_lines = default_log_tail_lines();
        }
        self.log_tail_lines = self.log_tail_lines.min(MAX_LOG_TAIL_LINES);
        if self
            .prefs_root
            .as_ref()
            .map_or(false, |root| root.as_os_str().is_empty())
        {
            self.prefs_root = None;
        }
        self.scan.sanitize();
        self.retry.sanitize();
    }
}

/// Polling bounds for helper output, see [`crate::ReadRetry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    3000
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl RetrySettings {
    fn sanitize(&mut self) {
        self.max_attempts = self.max_attempts.clamp(1, MAX_ATTEMPTS_CAP);
    }
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    data: LocatorSettings,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>, settings: LocatorSettings) -> Self {
        Self {
            path: path.into(),
            data: settings,
        }
    }

    /// Default location: `<config dir>/als2mid/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("als2mid").join("settings.json"))
    }

    /// 載入設定；檔案不存在時使用預設值。 / Loads settings, falling back to defaults when the file is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let mut data = LocatorSettings::default();
            data.sanitize();
            return Ok(Self { path, data });
        }

        let contents = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let mut data: LocatorSettings =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?;
        data.sanitize();
        Ok(Self { path, data })
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.data
    }

    pub fn into_settings(self) -> LocatorSettings {
        self.data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update<F>(&mut self, op: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut LocatorSettings),
    {
        op(&mut self.data);
        self.data.sanitize();
        self.save()
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&self.data).map_err(|source| {
            SettingsError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        // 先寫入暫存檔再重新命名。 / Write a sibling temp file, then rename over the target.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, payload.as_bytes()).map_err(|source| SettingsError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.settings(), &LocatorSettings::default());
        assert_eq!(store.settings().log_tail_lines, 500);
        assert_eq!(store.settings().retry.max_attempts, 10);
    }

    #[test]
    fn out_of_range_values_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "prefs_root": "",
                "log_tail_lines": 0,
                "scan": { "project_extension": "alp", "default_template": " " },
                "retry": { "max_attempts": 0 }
            }"#,
        )
        .unwrap();

        let settings = SettingsStore::load(&path).unwrap().into_settings();
        assert_eq!(settings.prefs_root, None);
        assert_eq!(settings.log_tail_lines, 500);
        assert_eq!(settings.scan.project_extension, ".alp");
        assert_eq!(settings.scan.default_template, "DefaultLiveSet.als");
        assert_eq!(settings.retry.max_attempts, 1);
        assert_eq!(settings.retry.interval_ms, 1000);
    }

    #[test]
    fn update_persists_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut store = SettingsStore::load(&path).unwrap();
        store
            .update(|settings| {
                settings.log_tail_lines = 1_000_000;
                settings.prefs_root = Some(PathBuf::from("/opt/Ableton"));
            })
            .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.settings().log_tail_lines, 100_000);
        assert_eq!(
            reloaded.settings().prefs_root.as_deref(),
            Some(Path::new("/opt/Ableton"))
        );
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let err = SettingsStore::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
