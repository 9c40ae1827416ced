//! Report artifact naming.
//!
//! Any file named `report*.<ext>` in an invocation's working directory is a
//! report artifact. The orchestrator moves it to
//! `reports/<namespace>_<file name>`; modules do not choose the final place.

use std::path::Path;

/// Directory (under the run directory) that collects gathered reports.
pub const REPORTS_DIR: &str = "reports";

/// Whether `file_name` follows the report naming convention.
pub fn is_report_file(file_name: &str) -> bool {
    let path = Path::new(file_name);
    if path.components().count() != 1 {
        return false;
    }
    let has_ext = path
        .extension()
        .is_some_and(|ext| !ext.to_string_lossy().is_empty());
    let stem_ok = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().starts_with("report"))
        .unwrap_or(false);
    has_ext && stem_ok
}

/// Snake-case namespace derived from a module or step name.
pub fn report_namespace(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && prev_lower {
                out.push('_');
            }
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch.to_ascii_lowercase());
        } else {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "module".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Final file name of a gathered report.
pub fn relocated_report_name(namespace: &str, file_name: &str) -> String {
    format!("{namespace}_{file_name}")
}
