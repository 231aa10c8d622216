use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 主機端作業可能發生的錯誤。 / Errors raised while locating or reading Live's files.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to read log {path}: {source}")]
    ReadLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to list directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no Ableton preferences folder is known for this platform")]
    NoPrefsRoot,
    #[error("no `Live <version>` folder found under {path}")]
    NoLiveInstall { path: PathBuf },
}
