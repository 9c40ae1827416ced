//! Report gathering.

use std::path::{Path, PathBuf};

use measure_core::metrics::METRICS;
use measure_core::{is_report_file, obs, relocated_report_name};

/// Move every report artifact in `work_dir` to
/// `reports_dir/<namespace>_<file name>`.
///
/// Returns the new paths in file-name order. A missing `work_dir` means the
/// step wrote nothing.
pub async fn gather_reports(
    work_dir: &Path,
    reports_dir: &Path,
    namespace: &str,
) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(work_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_report_file(&name) {
            names.push(name);
        }
    }
    names.sort();

    let mut gathered = Vec::with_capacity(names.len());
    if names.is_empty() {
        return Ok(gathered);
    }
    tokio::fs::create_dir_all(reports_dir).await?;
    for name in names {
        let source = work_dir.join(&name);
        let destination = reports_dir.join(relocated_report_name(namespace, &name));
        if tokio::fs::rename(&source, &destination).await.is_err() {
            // Different filesystem: copy, then remove.
            tokio::fs::copy(&source, &destination).await?;
            tokio::fs::remove_file(&source).await?;
        }
        obs::emit_report_gathered(&source.display().to_string(), &destination.display().to_string());
        METRICS.inc_reports_gathered();
        gathered.push(destination);
    }
    Ok(gathered)
}
