//! Filesystem guess used after the engine returned `Unresolved`.
//!
//! Live keeps an `Ableton Project Info` folder next to every saved set, so the
//! project root is the nearest ancestor (or shallow descendant) holding one.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

pub const PROJECT_INFO_DIR: &str = "Ableton Project Info";
const MAX_ANCESTORS: usize = 10;
const MAX_DESCENT: usize = 3;

/// 從起始資料夾尋找專案根目錄。 / Finds the project root above or shortly below `start`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors().take(MAX_ANCESTORS) {
        if dir.join(PROJECT_INFO_DIR).is_dir() {
            debug!("project root {} found above {}", dir.display(), start.display());
            return Some(dir.to_path_buf());
        }
    }

    // Breadth first so the shallowest project wins.
    let mut queue = VecDeque::from([(start.to_path_buf(), 0usize)]);
    while let Some((dir, depth)) = queue.pop_front() {
        let mut children: Vec<PathBuf> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .flatten()
                .filter(|entry| entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false))
                .map(|entry| entry.path())
                .collect(),
            Err(_) => continue,
        };
        children.sort();
        for child in children {
            if child.file_name().map_or(false, |name| name == PROJECT_INFO_DIR) {
                debug!("project root {} found below {}", dir.display(), start.display());
                return Some(dir);
            }
            let hidden_or_dotted = child
                .file_name()
                .map_or(true, |name| name.to_string_lossy().contains('.'));
            if depth < MAX_DESCENT && !hidden_or_dotted {
                queue.push_back((child, depth + 1));
            }
        }
    }
    None
}

/// 回傳根目錄中的專案檔，優先挑選名稱不含 `[` 的檔案。 / Picks a project file directly in `root`, preferring names without `[`.
///
/// Bracketed names are Live's backup copies, e.g. `Song [2024-01-01 120000].als`.
pub fn find_project_file(root: &Path, extension: &str) -> Option<PathBuf> {
    let extension = extension.to_ascii_lowercase();
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            name.len() > extension.len() && name.ends_with(&extension)
        })
        .map(|entry| entry.into_path())
        .collect();

    let preferred = found.iter().position(|path| {
        path.file_name()
            .map_or(false, |name| !name.to_string_lossy().contains('['))
    });
    match preferred {
        Some(idx) => Some(found.swap_remove(idx)),
        None => found.into_iter().next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_found_by_walking_up() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("Song Project");
        fs::create_dir_all(project.join(PROJECT_INFO_DIR)).unwrap();
        let nested = project.join("Samples").join("Recorded");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), Some(project));
    }

    #[test]
    fn root_found_by_shallow_descent() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("Sets").join("Beat Project");
        fs::create_dir_all(project.join(PROJECT_INFO_DIR)).unwrap();

        assert_eq!(find_project_root(dir.path()), Some(project));
    }

    #[test]
    fn descent_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b").join("c").join("d");
        fs::create_dir_all(deep.join(PROJECT_INFO_DIR)).unwrap();

        assert_eq!(find_project_root(dir.path()), None);
    }

    #[test]
    fn backup_copies_are_skipped_when_possible() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Song [2024-05-01 101010].als"), b"").unwrap();
        fs::write(dir.path().join("Song.als"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        assert_eq!(
            find_project_file(dir.path(), ".als"),
            Some(dir.path().join("Song.als"))
        );
    }

    #[test]
    fn backup_copy_used_when_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Song [backup].ALS"), b"").unwrap();
        assert_eq!(
            find_project_file(dir.path(), ".als"),
            Some(dir.path().join("Song [backup].ALS"))
        );
        assert_eq!(find_project_file(&dir.path().join("none"), ".als"), None);
    }
}
