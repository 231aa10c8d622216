use serde::Serialize;

/// 將反斜線轉換為正斜線。 / Converts backslashes to forward slashes; already-normalised paths are unchanged.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// 取得路徑所在資料夾。 / Text before the last separator, or an empty string when there is none.
pub fn containing_folder(path: &str) -> &str {
    match last_separator(path) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// 取得路徑中的檔案名稱。 / Text after the last separator.
pub fn file_name(path: &str) -> &str {
    match last_separator(path) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Whether the path lives inside Live's scratch folder for unsaved sets.
pub fn is_temporary_project(path: &str, marker: &str) -> bool {
    !marker.is_empty() && path.contains(marker)
}

fn last_separator(path: &str) -> Option<usize> {
    path.rfind(|ch: char| ch == '/' || ch == '\\')
}

/// 匯出 MIDI 時的目標位置。 / Where the converter writes the MIDI file for a resolved project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPlan {
    pub project: String,
    pub folder: String,
    pub base_name: String,
    pub output: String,
}

impl ExportPlan {
    /// Derives the plan next to the project file: `<folder>/<base>.mid`.
    pub fn for_project(path: &str, extension: &str) -> Self {
        let project = normalize_separators(path);
        let folder = containing_folder(&project).to_string();
        let name = file_name(&project);
        // ASCII lowercasing keeps byte offsets, so `idx` is valid in `name`.
        let base_name = match name
            .to_ascii_lowercase()
            .rfind(&extension.to_ascii_lowercase())
        {
            Some(idx) if !extension.is_empty() => &name[..idx],
            _ => name,
        }
        .to_string();
        let output = if folder.is_empty() {
            format!("{base_name}.mid")
        } else {
            format!("{folder}/{base_name}.mid")
        };
        Self {
            project,
            folder,
            base_name,
            output,
        }
    }
}
