//! Project resolution engine for the als2mid exporter.
//!
//! Turns a Live log tail and a preferences blob into a [`Verdict`]: which
//! project file is open, or why the export has to wait for a save. Every
//! function here is pure and total; reading files, retrying and reporting
//! belong to the host.

pub mod config;
pub mod decision;
pub mod encoding;
pub mod log_scan;
pub mod path;
pub mod prefs_scan;

pub use config::ScanConfig;
pub use decision::{Candidate, CandidateSource, PrefsInput, Resolver, SaveReason, Verdict};
pub use encoding::{detect_encoding, normalize_bytes, DetectedEncoding};
pub use log_scan::{LogScanner, MarkerPosition, Signals};
pub use path::{
    containing_folder, file_name, is_temporary_project, normalize_separators, ExportPlan,
};
pub use prefs_scan::PrefsScanner;
