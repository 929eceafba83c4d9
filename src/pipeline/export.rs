//! Structured export: the generated text as a human-editable JSON file.
//!
//! The export carries only the section text — it is the machine-readable
//! twin of the rendered document and must survive a round trip: re-parsing
//! an export yields a [`DeckContent`] equal to the one that produced it.
//!
//! All writes here (and the PDF write in the orchestrator) go through
//! [`write_atomic`]: bytes land in a sibling temp file that is renamed into
//! place, so an interrupted run leaves either the finished artifact or
//! nothing.

use std::path::Path;

use crate::error::DeckError;
use crate::output::DeckContent;

/// Serialise the content to pretty-printed JSON with the fixed key order.
///
/// Pure and deterministic: identical content yields byte-identical output.
pub fn export_string(content: &DeckContent) -> Result<String, DeckError> {
    let mut text = serde_json::to_string_pretty(content)
        .map_err(|e| DeckError::Internal(format!("serialising export: {e}")))?;
    text.push('\n');
    Ok(text)
}

/// Write the export file atomically.
pub async fn write_export(content: &DeckContent, path: &Path) -> Result<(), DeckError> {
    let text = export_string(content)?;
    write_atomic(path, text.as_bytes()).await
}

/// Re-parse an export file, for callers that want to feed a previous run's
/// text back into rendering or tooling.
pub fn read_export(path: &Path) -> Result<DeckContent, DeckError> {
    let text = std::fs::read_to_string(path).map_err(|e| DeckError::ExportReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| DeckError::ExportReadFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Atomic write: temp file in the target directory, then rename.
///
/// The temp name extends the real extension (`foo.json` → `foo.json.tmp`)
/// so the PDF and the export never collide on the same temp path.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DeckError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DeckError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let ext = path
        .extension()
        .map(|e| format!("{}.tmp", e.to_string_lossy()))
        .unwrap_or_else(|| "tmp".to_string());
    let tmp = path.with_extension(ext);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| DeckError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| DeckError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
