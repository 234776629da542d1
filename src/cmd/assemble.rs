//! Offline assembly (`livepreview assemble`).

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use livepreview::errors::PreviewError;
use livepreview::preview::assemble;
use livepreview::preview::loader::load_payload;

pub fn cmd_assemble(path: &Path) -> Result<()> {
    let payload = load_payload(path)?;
    if !payload.is_renderable() {
        return Err(PreviewError::InvalidPayload(format!(
            "no markup found in {} (expected index.html or a \"markup\" field)",
            path.display()
        ))
        .into());
    }

    let document = assemble(&payload);
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(document.as_str().as_bytes())
        .context("Failed to write document")?;
    stdout.flush()?;
    Ok(())
}
