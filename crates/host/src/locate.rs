use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HostError;

const LIVE_DIR_PREFIX: &str = "Live ";
const LOG_FILE: &str = "Log.txt";
const PREFS_FILE: &str = "Preferences.cfg";

/// 某個 Live 版本的記錄檔與偏好設定檔位置。 / Log and preferences files of one Live installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePaths {
    pub version: String,
    pub log: PathBuf,
    pub prefs: PathBuf,
}

impl LivePaths {
    pub fn for_live_dir(dir: &Path, version: impl Into<String>) -> Self {
        let prefs_dir = dir.join("Preferences");
        Self {
            version: version.into(),
            log: prefs_dir.join(LOG_FILE),
            prefs: prefs_dir.join(PREFS_FILE),
        }
    }
}

/// Folder holding one `Live <version>` directory per installed release.
///
/// `~/Library/Preferences/Ableton` on macOS, `%APPDATA%\Ableton` on Windows.
pub fn default_prefs_root() -> Result<PathBuf, HostError> {
    dirs::preference_dir()
        .map(|dir| dir.join("Ableton"))
        .ok_or(HostError::NoPrefsRoot)
}

/// Picks the `Live <version>` child of `root` with the highest version.
pub fn latest_live_dir(root: &Path) -> Result<LivePaths, HostError> {
    let entries = fs::read_dir(root).map_err(|source| HostError::ListDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut best: Option<(String, PathBuf)> = None;
    for entry in entries.flatten() {
        if !entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(version) = name.strip_prefix(LIVE_DIR_PREFIX) else {
            continue;
        };
        let version = version.trim().to_string();
        let newer = match &best {
            Some((current, _)) => compare_versions(&version, current) != Ordering::Less,
            None => true,
        };
        if newer {
            best = Some((version, entry.path()));
        }
    }

    best.map(|(version, dir)| LivePaths::for_live_dir(&dir, version))
        .ok_or_else(|| HostError::NoLiveInstall {
            path: root.to_path_buf(),
        })
}

/// Dotted numeric comparison; missing or non-numeric components count as zero.
pub(crate) fn compare_versions(a: &str, b: &str) -> Ordering {
    let pa = parse_version(a);
    let pb = parse_version(b);
    let len = pa.len().max(pb.len());
    for idx in 0..len {
        let va = pa.get(idx).copied().unwrap_or(0);
        let vb = pb.get(idx).copied().unwrap_or(0);
        match va.cmp(&vb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn parse_version(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| {
            let digits: String = part
                .trim()
                .chars()
                .take_while(|ch| ch.is_ascii_digit())
                .collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}
