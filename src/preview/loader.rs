//! Reading payloads from disk for the `assemble` command.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::models::{CodePayload, FileMap, PayloadRequest};
use crate::errors::PreviewError;

/// Load a payload from a JSON file or a directory of generated files.
///
/// A JSON file may hold either a bare payload or `{"files": {...}}`.
/// A directory is read as a [`FileMap`] of its top-level files; anything
/// that is not UTF-8 text is skipped.
pub fn load_payload(path: &Path) -> Result<CodePayload, PreviewError> {
    let read_failed = |source| PreviewError::PayloadReadFailed {
        path: path.to_path_buf(),
        source,
    };

    if path.is_dir() {
        let mut files = FileMap::default();
        for entry in fs::read_dir(path).map_err(read_failed)? {
            let entry = entry.map_err(read_failed)?;
            if !entry.file_type().map_err(read_failed)?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match fs::read_to_string(entry.path()) {
                Ok(source) => files.insert(name, source),
                Err(e) => debug!(file = %name, error = %e, "skipping unreadable file"),
            }
        }
        return Ok(files.resolve());
    }

    let content = fs::read_to_string(path).map_err(read_failed)?;
    let request: PayloadRequest = serde_json::from_str(&content)
        .map_err(|e| PreviewError::InvalidPayload(format!("{}: {}", path.display(), e)))?;
    Ok(request.into_payload())
}
