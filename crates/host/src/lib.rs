//! Host side of the als2mid locator.
//!
//! Finds Live's log and preferences on disk, decodes them, hands them to the
//! pure engine in `als2mid_core`, and falls back to a filesystem search when
//! the engine has nothing to say. Waiting and retrying live here too.

pub mod error;
pub mod fallback;
pub mod locate;
pub mod locator;
pub mod read;
pub mod retry;
pub mod settings;

pub use error::HostError;
pub use fallback::{find_project_file, find_project_root, PROJECT_INFO_DIR};
pub use locate::{default_prefs_root, latest_live_dir, LivePaths};
pub use locator::{LocateRequest, Locator, Resolution};
pub use read::{read_log_tail, read_prefs_text};
pub use retry::{wait_for_output, PollOutcome, ReadRetry};
pub use settings::{LocatorSettings, RetrySettings, SettingsError, SettingsStore};
