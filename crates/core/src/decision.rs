//! Ordered policy turning log and preferences signals into a [`Verdict`].
//!
//! The two log markers bracket "Live opened its blank template" and "Live
//! finished writing its preferences". Their relative order decides whether a
//! path seen in the log can be trusted or whether the recent-documents list
//! has to be consulted instead.

use std::fmt;

use serde::Serialize;

use crate::config::ScanConfig;
use crate::log_scan::{LogScanner, Signals};
use crate::path::{is_temporary_project, normalize_separators};
use crate::prefs_scan::PrefsScanner;

/// 候選路徑的來源。 / Where a resolved path was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Log,
    Prefs,
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Log => f.write_str("log"),
            CandidateSource::Prefs => f.write_str("prefs"),
        }
    }
}

/// A non-empty, forward-slash normalised project path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    path: String,
    source: CandidateSource,
}

impl Candidate {
    /// Returns `None` for an empty path.
    pub fn new(path: impl AsRef<str>, source: CandidateSource) -> Option<Self> {
        let path = normalize_separators(path.as_ref());
        if path.is_empty() {
            return None;
        }
        Some(Self { path, source })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> CandidateSource {
        self.source
    }

    pub fn into_path(self) -> String {
        self.path
    }
}

/// 需要先儲存專案的原因。 / Why the export has to wait for a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveReason {
    DefaultTemplateNotSaved,
    UnsavedTemporaryOrDefault,
    UnsavedDefaultTemplate,
}

impl SaveReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SaveReason::DefaultTemplateNotSaved => "default template not saved",
            SaveReason::UnsavedTemporaryOrDefault => "unsaved temporary or default project",
            SaveReason::UnsavedDefaultTemplate => "unsaved default template",
        }
    }
}

impl fmt::Display for SaveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析結果。 / Outcome of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Ready(Candidate),
    SaveRequired { reason: SaveReason },
    /// No signal in the input; the caller should try its own fallback.
    Unresolved,
}

impl Verdict {
    pub fn is_ready(&self) -> bool {
        matches!(self, Verdict::Ready(_))
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Verdict::Ready(candidate) => Some(candidate),
            _ => None,
        }
    }
}

/// 偏好設定來源：原始文字或已取出的最近路徑。 / What a preferences provider hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefsInput {
    /// Decoded `Preferences.cfg` contents, still to be scanned.
    Text(String),
    /// A recent path extracted elsewhere; used verbatim.
    Recent(String),
}

impl From<String> for PrefsInput {
    fn from(text: String) -> Self {
        PrefsInput::Text(text)
    }
}

/// Preferences fetched at most once, and only when a rule asks for them.
struct LazyPrefs<F> {
    provider: Option<F>,
    recent: Option<String>,
}

impl<F, P> LazyPrefs<F>
where
    F: FnOnce() -> P,
    P: Into<PrefsInput>,
{
    fn new(provider: F) -> Self {
        Self {
            provider: Some(provider),
            recent: None,
        }
    }

    fn recent_path(&mut self, scanner: &PrefsScanner) -> Option<Candidate> {
        if let Some(provider) = self.provider.take() {
            self.recent = Some(match provider().into() {
                PrefsInput::Text(text) => scanner.extract_recent_path(&text),
                PrefsInput::Recent(path) => path,
            });
        }
        self.recent
            .as_deref()
            .and_then(|path| Candidate::new(path, CandidateSource::Prefs))
    }
}

/// Scanners plus the policy, built once per [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ScanConfig,
    log: LogScanner,
    prefs: PrefsScanner,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl Resolver {
    pub fn new(config: ScanConfig) -> Self {
        let log = LogScanner::new(&config);
        let prefs = PrefsScanner::new(&config);
        Self { config, log, prefs }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn log_scanner(&self) -> &LogScanner {
        &self.log
    }

    pub fn prefs_scanner(&self) -> &PrefsScanner {
        &self.prefs
    }

    /// Guard plus policy: an unsaved default template as the latest project
    /// mention short-circuits before any rule is consulted.
    pub fn evaluate<F, P>(&self, log_text: &str, prefs_text: F) -> Verdict
    where
        F: FnOnce() -> P,
        P: Into<PrefsInput>,
    {
        if self.log.detect_unsaved_default(log_text) {
            return Verdict::SaveRequired {
                reason: SaveReason::UnsavedDefaultTemplate,
            };
        }
        self.resolve(log_text, prefs_text)
    }

    /// Scans `log_text` (most-recent-first) and applies the ordered policy.
    pub fn resolve<F, P>(&self, log_text: &str, prefs_text: F) -> Verdict
    where
        F: FnOnce() -> P,
        P: Into<PrefsInput>,
    {
        let signals = self.log.signals(log_text);
        self.decide(&signals, prefs_text)
    }

    /// The policy itself; the first rule that produces a verdict wins.
    pub fn decide<F, P>(&self, signals: &Signals, prefs_text: F) -> Verdict
    where
        F: FnOnce() -> P,
        P: Into<PrefsInput>,
    {
        let mut prefs = LazyPrefs::new(prefs_text);
        let Signals {
            from_log,
            idx_default,
            idx_save,
        } = signals;
        let saved_after_default = idx_default.is_some() && idx_save > idx_default;

        // A save after the template was opened: the recent list names the new file.
        if saved_after_default {
            if let Some(candidate) = prefs.recent_path(&self.prefs) {
                return Verdict::Ready(candidate);
            }
        }

        if idx_default.is_some() && !saved_after_default {
            return Verdict::SaveRequired {
                reason: SaveReason::DefaultTemplateNotSaved,
            };
        }

        let untrusted = !from_log.is_empty() && self.is_untrusted_log_path(from_log);
        if !from_log.is_empty() && !untrusted {
            if let Some(candidate) = Candidate::new(from_log, CandidateSource::Log) {
                return Verdict::Ready(candidate);
            }
        }

        if (untrusted || from_log.is_empty()) && idx_save.is_some() {
            if let Some(candidate) = prefs.recent_path(&self.prefs) {
                return Verdict::Ready(candidate);
            }
        }

        if untrusted && idx_save.is_none() {
            return Verdict::SaveRequired {
                reason: SaveReason::UnsavedTemporaryOrDefault,
            };
        }

        Verdict::Unresolved
    }

    /// Temporary-project and template paths say nothing about a saved file.
    fn is_untrusted_log_path(&self, path: &str) -> bool {
        is_temporary_project(path, &self.config.temporary_marker)
            || self.log.contains_default_template_ref(path)
    }
}
