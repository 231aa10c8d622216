//! Recent-document lookup inside `Preferences.cfg`.
//!
//! The preferences blob is a binary format with UTF-16-ish strings, so the
//! text handed in here is noisy: letters may be separated by padding bytes
//! and the section headers may survive only as printable fragments. Each step
//! below narrows a search window before trying a stricter and then a looser
//! path pattern.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::config::ScanConfig;
use crate::path::normalize_separators;

const RECENT_ANCHOR: &str = "RecentDocsList";
const RECENT_WINDOW_CHARS: usize = 8192;
const FILE_REF_WINDOW_CHARS: usize = 4096;
// NULs are stripped before the fallback runs, so this never collides with input.
const SPACE_PLACEHOLDER: char = '\0';

static FILE_REF: Lazy<Regex> = Lazy::new(|| {
    let gap = r"[^\x20-\x7E]*";
    let pattern = ["F", "i", "l", "e", "R", "e", "f"].join(gap);
    Regex::new(&pattern).unwrap_or_else(|err| panic!("invalid FileRef pattern: {err}"))
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").unwrap_or_else(|err| panic!("invalid pattern: {err}")));

/// Compiled preferences patterns for one [`ScanConfig`].
#[derive(Debug, Clone)]
pub struct PrefsScanner {
    extension: String,
    spaced_path: Regex,
    helper_line: Regex,
}

impl Default for PrefsScanner {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}

impl PrefsScanner {
    pub fn new(config: &ScanConfig) -> Self {
        let spaced_extension = config
            .project_extension
            .chars()
            .map(|ch| regex::escape(&ch.to_string()))
            .collect::<Vec<_>>()
            .join(r"\s*");
        let ext = regex::escape(&config.project_extension);
        Self {
            extension: config.project_extension.clone(),
            spaced_path: build(
                &format!(
                    r"[A-Za-z]\s*:\s*(?:/|\\)\s*[^\n\r\x{{2028}}\x{{2029}}]*?{spaced_extension}"
                ),
                true,
            ),
            helper_line: build(&format!(r#""([A-Za-z]:[^"\r\n]*{ext})""#), true),
        }
    }

    /// Most recently used project path recorded in the recent-documents list.
    ///
    /// Returns an empty string when no window or no path could be found.
    pub fn extract_recent_path(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let raw = text.replace('\0', "");

        let ascii_projection;
        let mut scope: &str = match raw.find(RECENT_ANCHOR) {
            Some(idx) => char_window(&raw[idx..], RECENT_WINDOW_CHARS),
            None => {
                ascii_projection = printable_ascii(&raw);
                match ascii_projection.find(RECENT_ANCHOR) {
                    Some(idx) => char_window(&ascii_projection[idx..], RECENT_WINDOW_CHARS),
                    None => raw.as_str(),
                }
            }
        };

        if let Some(found) = FILE_REF.find(scope) {
            scope = char_window(&scope[found.start()..], FILE_REF_WINDOW_CHARS);
        }

        let ascii_scope = printable_ascii(scope);
        if let Some(path) = drive_paths(&ascii_scope, &self.extension).first() {
            return normalize_separators(path);
        }

        self.spaced_fallback(scope).unwrap_or_default()
    }

    /// Recovers a path whose characters were padded apart, e.g. `C : / S o n g . a l s`.
    ///
    /// Runs of two or more whitespace characters stood for a real space; single
    /// whitespace characters were padding.
    fn spaced_fallback(&self, scope: &str) -> Option<String> {
        let found = self.spaced_path.find(scope)?;
        let placeholder = SPACE_PLACEHOLDER.to_string();
        let collapsed = WHITESPACE_RUN.replace_all(found.as_str(), placeholder.as_str());
        let joined: String = collapsed
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| if ch == SPACE_PLACEHOLDER { ' ' } else { ch })
            .collect();
        let cleaned = printable_ascii(&normalize_separators(&joined));

        let candidates = drive_paths(&cleaned, &self.extension);
        match candidates.last() {
            Some(last) => Some((*last).to_string()),
            None => Some(cleaned),
        }
    }

    /// Reads the single quoted path line a helper process may have pre-extracted.
    pub fn parse_helper_line(&self, text: &str) -> String {
        self.helper_line
            .captures(text.trim())
            .map(|caps| normalize_separators(&caps[1]))
            .unwrap_or_default()
    }
}

fn build(pattern: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .unwrap_or_else(|err| panic!("invalid built-in prefs pattern {pattern:?}: {err}"))
}

/// Keeps only characters in `0x20..=0x7E`.
pub(crate) fn printable_ascii(text: &str) -> String {
    text.chars().filter(|ch| matches!(ch, ' '..='~')).collect()
}

/// Prefix of `text` holding at most `max_chars` characters.
fn char_window(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// All non-overlapping drive-letter paths ending in `extension`, leftmost first.
///
/// A path starts at `<letter>:` plus a separator and is extended one
/// character at a time until the extension appears. It fails when it would
/// cross a quote, a line break or the start of another `<letter>:` pair, in
/// which case scanning resumes at the next character.
fn drive_paths<'a>(text: &'a str, extension: &str) -> Vec<&'a str> {
    let bytes = text.as_bytes();
    let ext = extension.as_bytes();
    let mut found = Vec::new();
    let mut start = 0usize;

    while start + 2 < bytes.len() {
        if !is_drive_prefix(bytes, start) || !matches!(bytes[start + 2], b'/' | b'\\') {
            start += 1;
            continue;
        }

        let mut cursor = start + 3;
        let mut end = None;
        while cursor <= bytes.len() {
            if bytes[cursor..].starts_with(ext) {
                end = Some(cursor + ext.len());
                break;
            }
            if cursor == bytes.len()
                || matches!(bytes[cursor], b'"' | b'\r' | b'\n')
                || is_drive_prefix(bytes, cursor)
            {
                break;
            }
            cursor += 1;
        }

        match end {
            // Only ASCII bytes are inspected, so both ends sit on char boundaries.
            Some(end) if text.is_char_boundary(start) && text.is_char_boundary(end) => {
                found.push(&text[start..end]);
                start = end;
            }
            _ => start += 1,
        }
    }
    found
}

fn is_drive_prefix(bytes: &[u8], idx: usize) -> bool {
    idx + 1 < bytes.len() && bytes[idx].is_ascii_alphabetic() && bytes[idx + 1] == b':'
}
