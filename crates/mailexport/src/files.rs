//! Report files.
//!
//! Every requested format is rendered in memory before anything is
//! written, so an export that fails leaves no files behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mailexport_core::{Backend, EmailRecord, HtmlReport, OutputFormat, output_file_name, to_json};
use tracing::info;

/// A rendered report waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// File name inside the output directory.
    pub file_name: String,
    /// Document text.
    pub contents: String,
}

/// A report on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Written {
    /// Where it was written.
    pub path: PathBuf,
    /// Size in bytes.
    pub bytes: u64,
}

impl Written {
    /// Size in kilobytes.
    #[allow(clippy::cast_precision_loss)]
    pub fn kilobytes(&self) -> f64 {
        self.bytes as f64 / 1024.0
    }
}

/// What is being exported.
pub struct ExportTarget<'a> {
    /// Folder display name.
    pub folder: &'a str,
    /// Mailbox address.
    pub mailbox: &'a str,
    /// Backend the records came from.
    pub backend: Backend,
}

/// Renders `records` in every format `format` asks for.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(
    records: &[EmailRecord],
    target: &ExportTarget<'_>,
    format: OutputFormat,
) -> Result<Vec<Rendered>> {
    let mut rendered = Vec::new();
    if format.includes_json() {
        rendered.push(Rendered {
            file_name: output_file_name(target.folder, "json", target.backend),
            contents: to_json(records)?,
        });
    }
    if format.includes_html() {
        rendered.push(Rendered {
            file_name: output_file_name(target.folder, "html", target.backend),
            contents: HtmlReport::new(target.folder, target.mailbox).render(records),
        });
    }
    Ok(rendered)
}

/// Writes rendered reports into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the directory or a file cannot be written.
pub async fn write_all(dir: &Path, rendered: Vec<Rendered>) -> Result<Vec<Written>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(rendered.len());
    for report in rendered {
        let path = dir.join(&report.file_name);
        tokio::fs::write(&path, report.contents.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        let bytes = tokio::fs::metadata(&path).await?.len();
        info!(path = %path.display(), bytes, "Wrote report");
        written.push(Written { path, bytes });
    }
    Ok(written)
}
