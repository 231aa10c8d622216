use serde::{Deserialize, Serialize};

pub const DEFAULT_PROJECT_EXTENSION: &str = ".als";
pub const DEFAULT_TEMPLATE_FILE: &str = "DefaultLiveSet.als";
pub const DEFAULT_TEMPORARY_MARKER: &str = "Ableton Live Temporary Project";

/// 掃描器使用的常數設定。 / Constants the scanners match against.
///
/// These describe the host application, not the user's machine: which
/// extension marks a project file, which built-in template counts as an
/// untouched set, and which folder name Live uses for unsaved projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_project_extension")]
    pub project_extension: String,
    #[serde(default = "default_template_file")]
    pub default_template: String,
    #[serde(default = "default_temporary_marker")]
    pub temporary_marker: String,
}

fn default_project_extension() -> String {
    DEFAULT_PROJECT_EXTENSION.to_string()
}

fn default_template_file() -> String {
    DEFAULT_TEMPLATE_FILE.to_string()
}

fn default_temporary_marker() -> String {
    DEFAULT_TEMPORARY_MARKER.to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            project_extension: default_project_extension(),
            default_template: default_template_file(),
            temporary_marker: default_temporary_marker(),
        }
    }
}

impl ScanConfig {
    /// 修正空白或格式錯誤的欄位。 / Restores blank fields and adds the leading dot to the extension.
    pub fn sanitize(&mut self) {
        let extension = self.project_extension.trim();
        if extension.is_empty() || extension == "." {
            self.project_extension = default_project_extension();
        } else if !extension.starts_with('.') {
            self.project_extension = format!(".{extension}");
        } else {
            self.project_extension = extension.to_string();
        }
        if self.default_template.trim().is_empty() {
            self.default_template = default_template_file();
        }
        if self.temporary_marker.trim().is_empty() {
            self.temporary_marker = default_temporary_marker();
        }
    }

    /// Lowercased template name without its extension, e.g. `defaultliveset`.
    pub fn template_stem(&self) -> String {
        let name = self.default_template.as_str();
        let stem = match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        };
        stem.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_ableton_live() {
        let config = ScanConfig::default();
        assert_eq!(config.project_extension, ".als");
        assert_eq!(config.template_stem(), "defaultliveset");
    }

    #[test]
    fn sanitize_restores_blank_fields_and_adds_dot() {
        let mut config = ScanConfig {
            project_extension: "als ".to_string(),
            default_template: "  ".to_string(),
            temporary_marker: String::new(),
        };
        config.sanitize();
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{ "project_extension": ".alp" }"#).unwrap();
        assert_eq!(config.project_extension, ".alp");
        assert_eq!(config.default_template, DEFAULT_TEMPLATE_FILE);
        assert_eq!(config.temporary_marker, DEFAULT_TEMPORARY_MARKER);
    }
}
