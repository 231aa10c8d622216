use std::fs;
use std::path::{Path, PathBuf};

use als2mid_core::{
    normalize_bytes, normalize_separators, ExportPlan, PrefsInput, Resolver, SaveReason,
    Verdict,
};
use log::{debug, info};
use serde::Serialize;

use crate::error::HostError;
use crate::fallback::{find_project_file, find_project_root};
use crate::locate::LivePaths;
use crate::read::{read_log_tail, read_prefs_text};
use crate::settings::LocatorSettings;

/// 單次定位所需的檔案。 / Files consulted by one locate call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocateRequest {
    pub log: PathBuf,
    pub prefs: Option<PathBuf>,
    /// Output of a helper that already pulled the recent path out of the preferences.
    pub recent_file: Option<PathBuf>,
    /// Starting folder for the `Ableton Project Info` search when nothing else worked.
    pub search_from: Option<PathBuf>,
}

impl LocateRequest {
    pub fn for_live(paths: &LivePaths) -> Self {
        Self {
            log: paths.log.clone(),
            prefs: Some(paths.prefs.clone()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub verdict: Verdict,
    /// Set when the verdict was `Unresolved` and the filesystem search found a file.
    pub fallback_path: Option<String>,
    pub export: Option<ExportPlan>,
}

impl Resolution {
    /// Project to export, from the verdict or else the filesystem fallback.
    pub fn project_path(&self) -> Option<&str> {
        self.verdict
            .candidate()
            .map(|candidate| candidate.path())
            .or(self.fallback_path.as_deref())
    }

    pub fn save_reason(&self) -> Option<SaveReason> {
        match self.verdict {
            Verdict::SaveRequired { reason } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Locator {
    settings: LocatorSettings,
    resolver: Resolver,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(LocatorSettings::default())
    }
}

impl Locator {
    pub fn new(mut settings: LocatorSettings) -> Self {
        settings.sanitize();
        let resolver = Resolver::new(settings.scan.clone());
        Self { settings, resolver }
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// 讀取記錄檔並決定目前的專案。 / Reads the log, runs the engine and applies the filesystem fallback.
    ///
    /// Only an unreadable log is an error; missing preferences or helper
    /// output just leave the corresponding rules without data.
    pub fn locate(&self, request: &LocateRequest) -> Result<Resolution, HostError> {
        let log_text = read_log_tail(&request.log, self.settings.log_tail_lines)?;
        let scanner = self.resolver.log_scanner();

        let verdict = if scanner.detect_unsaved_default(&log_text) {
            debug!("latest project line is the unsaved default template");
            Verdict::SaveRequired {
                reason: SaveReason::UnsavedDefaultTemplate,
            }
        } else {
            let signals = scanner.signals(&log_text);
            debug!(
                "log signals: from_log={:?} idx_default={:?} idx_save={:?}",
                signals.from_log, signals.idx_default, signals.idx_save
            );
            self.resolver.decide(&signals, || self.prefs_input(request))
        };

        let fallback_path = match (&verdict, &request.search_from) {
            (Verdict::Unresolved, Some(start)) => self.search_filesystem(start),
            _ => None,
        };

        let mut resolution = Resolution {
            verdict,
            fallback_path,
            export: None,
        };
        resolution.export = resolution
            .project_path()
            .map(|path| ExportPlan::for_project(path, &self.settings.scan.project_extension));
        if let Some(path) = resolution.project_path() {
            info!("resolved project {path}");
        }
        Ok(resolution)
    }

    /// A helper line is already an exact path and bypasses the preferences scanner.
    fn prefs_input(&self, request: &LocateRequest) -> PrefsInput {
        if let Some(recent) = &request.recent_file {
            match fs::read(recent) {
                Ok(bytes) => {
                    let line = self
                        .resolver
                        .prefs_scanner()
                        .parse_helper_line(&normalize_bytes(&bytes));
                    if !line.is_empty() {
                        debug!("recent path taken from {}", recent.display());
                        return PrefsInput::Recent(line);
                    }
                }
                Err(err) => debug!("helper output unavailable at {}: {err}", recent.display()),
            }
        }
        match &request.prefs {
            Some(path) => PrefsInput::Text(read_prefs_text(path)),
            None => PrefsInput::Text(String::new()),
        }
    }

    fn search_filesystem(&self, start: &Path) -> Option<String> {
        let root = find_project_root(start)?;
        let file = find_project_file(&root, &self.settings.scan.project_extension)?;
        debug!("filesystem fallback picked {}", file.display());
        Some(normalize_separators(&file.to_string_lossy()))
    }
}
