//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Uploaded documents arrive with caller-controlled names and live in
//! per-user directories; these functions keep full paths out of spans.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields — reveals file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
