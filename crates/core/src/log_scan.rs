//! Heuristics over the Live log tail.
//!
//! The host hands the log over most-recent-first, so "first line" below means
//! "latest event" and a smaller offset means a more recent line. Offsets are
//! byte offsets into the buffer that was scanned and only mean something
//! relative to other offsets from the same buffer.

use regex::{Regex, RegexBuilder};

use crate::config::ScanConfig;
use crate::path::normalize_separators;

/// Byte offset of a marker, `None` when the marker is absent.
///
/// `Option` orders `None` below every `Some`, so an absent marker compares as
/// earlier than any present one.
pub type MarkerPosition = Option<usize>;

/// Raw decision inputs taken from one log buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signals {
    pub from_log: String,
    pub idx_default: MarkerPosition,
    pub idx_save: MarkerPosition,
}

const SAVE_TOKEN: &str = "saveprefs";

/// Compiled log patterns for one [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct LogScanner {
    extension: String,
    template_stem: String,
    quoted_path: Regex,
    file_url_drive: Regex,
    file_url_any: Regex,
    template_ref_loose: Regex,
    template_ref_exact: Regex,
    end_saveprefs: Regex,
    end_saveprefs_literal: Regex,
}

impl Default for LogScanner {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl LogScanner {
    pub fn new(config: &ScanConfig) -> Self {
        let ext = regex::escape(&config.project_extension);
        let template = regex::escape(&config.default_template);
        Self {
            extension: config.project_extension.clone(),
            template_stem: config.template_stem(),
            quoted_path: insensitive(&format!(r#""([A-Za-z]:[^"]*{ext})""#)),
            file_url_drive: insensitive(&format!(r#"file:///([A-Za-z]:[^\s"]*{ext})"#)),
            file_url_any: insensitive(&format!(r#"file:///([^\s"]*{ext})"#)),
            template_ref_loose: insensitive(&format!(
                r"(?:^|.)builtin[/\\]+templates[/\\]+{template}"
            )),
            template_ref_exact: insensitive(&format!(r"builtin[/\\]templates[/\\]{template}")),
            end_saveprefs: insensitive(r"default\s*app\s*[:\-]?\s*end\s+saveprefs"),
            end_saveprefs_literal: insensitive(r"end saveprefs"),
        }
    }

    /// Path of the first line, in the given order, that mentions a project file.
    ///
    /// Quoted drive paths win over `file:///` URLs on the same line. Returns an
    /// empty string when no line matches.
    pub fn extract_latest_path(&self, text: &str) -> String {
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = self.quoted_path.captures(line) {
                return normalize_separators(&caps[1]);
            }
            let url = self
                .file_url_drive
                .captures(line)
                .or_else(|| self.file_url_any.captures(line));
            if let Some(caps) = url {
                return normalize_separators(&uri_decode_lossy(&caps[1]));
            }
        }
        String::new()
    }

    /// Loose check for the built-in template path anywhere in `text`.
    ///
    /// The optional leading character is not a word boundary: `^` only anchors
    /// at the start of the whole text and `.` never matches a newline, so a
    /// reference sitting at the start of a later line is not reported. This
    /// looseness is kept on purpose; callers that need a position use
    /// [`LogScanner::last_index_of_default_template_ref`].
    pub fn contains_default_template_ref(&self, text: &str) -> bool {
        self.template_ref_loose.is_match(text)
    }

    /// Offset of the last `builtin/templates/<template>` reference, ignoring case and separator style.
    pub fn last_index_of_default_template_ref(&self, text: &str) -> MarkerPosition {
        last_match_start(&self.template_ref_exact, text)
    }

    /// Offset of the last "Default App: End SavePrefs" marker, or of a bare `end saveprefs`.
    pub fn last_index_of_end_saveprefs_marker(&self, text: &str) -> MarkerPosition {
        last_match_start(&self.end_saveprefs, text)
            .or_else(|| last_match_start(&self.end_saveprefs_literal, text))
    }

    /// Reports whether the latest project mention is the default template with no save after it.
    ///
    /// Lines before the match in the most-recent-first walk are the events that
    /// happened later; any `saveprefs` among them means the template was saved.
    pub fn detect_unsaved_default(&self, text: &str) -> bool {
        let lines: Vec<&str> = text.lines().collect();
        let Some(position) = lines
            .iter()
            .position(|line| line.contains(self.extension.as_str()))
        else {
            return false;
        };

        if !lines[position].to_lowercase().contains(&self.template_stem) {
            return false;
        }

        !lines[..position]
            .iter()
            .any(|line| line.to_lowercase().contains(SAVE_TOKEN))
    }

    /// Runs the three scans the decision engine consumes.
    pub fn signals(&self, text: &str) -> Signals {
        Signals {
            from_log: self.extract_latest_path(text),
            idx_default: self.last_index_of_default_template_ref(text),
            idx_save: self.last_index_of_end_saveprefs_marker(text),
        }
    }
}

fn insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|err| panic!("invalid built-in log pattern {pattern:?}: {err}"))
}

fn last_match_start(regex: &Regex, text: &str) -> MarkerPosition {
    regex.find_iter(text).last().map(|found| found.start())
}

/// Percent-decodes a URL path; on a malformed escape or non-UTF-8 result only `%20` is replaced.
pub(crate) fn uri_decode_lossy(input: &str) -> String {
    percent_decode_utf8(input).unwrap_or_else(|| input.replace("%20", " "))
}

fn percent_decode_utf8(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = (*bytes.get(i + 1)? as char).to_digit(16)? as u8;
                let lo = (*bytes.get(i + 2)? as char).to_digit(16)? as u8;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}
