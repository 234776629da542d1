use rust_embed::RustEmbed;

/// Static files for the preview shell page.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/ui/"]
pub struct Assets;
