use std::fs;
use std::path::Path;

use als2mid_core::normalize_bytes;
use log::{debug, warn};

use crate::error::HostError;

pub const DEFAULT_LOG_TAIL_LINES: usize = 500;

/// 讀取記錄檔尾端並以最新優先排列。 / Reads the last `max_lines` log lines, most recent first.
///
/// The engine expects this ordering; offsets it reports are into the
/// returned buffer, not the file.
pub fn read_log_tail(path: &Path, max_lines: usize) -> Result<String, HostError> {
    let bytes = fs::read(path).map_err(|source| HostError::ReadLog {
        path: path.to_path_buf(),
        source,
    })?;
    let text = normalize_bytes(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let keep = max_lines.max(1).min(lines.len());
    let tail = &lines[lines.len() - keep..];
    debug!(
        "read {} of {} log lines from {}",
        tail.len(),
        lines.len(),
        path.display()
    );

    let mut reversed = String::with_capacity(text.len());
    for (idx, line) in tail.iter().rev().enumerate() {
        if idx > 0 {
            reversed.push('\n');
        }
        reversed.push_str(line);
    }
    Ok(reversed)
}

/// 讀取並解碼偏好設定檔；無法讀取時回傳空字串。 / Decodes the preferences blob; unreadable files yield empty text.
pub fn read_prefs_text(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => normalize_bytes(&bytes),
        Err(err) => {
            warn!("preferences unavailable at {}: {err}", path.display());
            String::new()
        }
    }
}
