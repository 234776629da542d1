//! Turns a [`CodePayload`] into one self-contained HTML document.
//!
//! Assembly is pure: no I/O, no clock, no randomness, so assembling the same
//! payload twice yields the same bytes. Nothing is sanitized here; the trust
//! boundary is the isolated surface the document is served into.

use std::borrow::Cow;
use std::fmt;

use super::models::CodePayload;

/// Marker attribute carried by the inline error banner.
pub const ERROR_BANNER_ATTR: &str = "data-preview-error";

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="Content-Type" content="text/html; charset=utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
"#;

// Reports a fault inside the rendered body instead of letting it escape.
const BANNER_FN: &str = r#"function __previewReport(err) {
  var banner = document.createElement("div");
  banner.setAttribute("data-preview-error", "");
  banner.setAttribute("role", "alert");
  banner.style.cssText = "position:fixed;left:0;right:0;bottom:0;z-index:2147483647;margin:0;padding:8px 12px;background:#fde8e8;color:#9b1c1c;border-top:2px solid #f05252;font:13px/1.4 monospace;white-space:pre-wrap;";
  var message = err && err.message ? err.message : String(err);
  banner.textContent = "Preview script error: " + message;
  (document.body || document.documentElement).appendChild(banner);
}
window.addEventListener("error", function (event) {
  __previewReport(event.error || event.message);
});
"#;

/// An assembled, self-contained document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(String);

impl Document {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assemble `payload` into a complete document.
///
/// Callers must check [`CodePayload::is_renderable`] first; an empty markup
/// payload means "keep the previous render".
pub fn assemble(payload: &CodePayload) -> Document {
    let style = payload.style.as_deref().unwrap_or_default();
    let script = payload
        .script
        .as_deref()
        .filter(|s| !s.trim().is_empty());

    let mut out = String::with_capacity(
        HEAD.len() + BANNER_FN.len() + payload.markup.len() + style.len() + 256,
    );
    out.push_str(HEAD);
    out.push_str("<style>\n");
    out.push_str(style);
    out.push_str("\n</style>\n</head>\n<body>\n");
    out.push_str(&payload.markup);
    out.push('\n');

    if let Some(script) = script {
        // The reporter gets its own element so a parse error in the
        // generated script still reaches the window error listener.
        out.push_str("<script>\n");
        out.push_str(BANNER_FN);
        out.push_str("</script>\n<script>\ntry {\n");
        out.push_str(&escape_script_close(script));
        out.push_str("\n} catch (err) {\n  __previewReport(err);\n}\n</script>\n");
    }

    out.push_str("</body>\n</html>\n");
    Document(out)
}

/// Keep a literal `</script` inside the source from closing the element early.
fn escape_script_close(src: &str) -> Cow<'_, str> {
    const NEEDLE: &[u8] = b"</script";
    let bytes = src.as_bytes();
    let hit = |i: usize| {
        bytes.len() - i >= NEEDLE.len() && bytes[i..i + NEEDLE.len()].eq_ignore_ascii_case(NEEDLE)
    };

    if !(0..bytes.len()).any(hit) {
        return Cow::Borrowed(src);
    }

    let mut out = String::with_capacity(src.len() + 8);
    let mut last = 0;
    for i in 0..bytes.len() {
        if hit(i) {
            out.push_str(&src[last..=i]);
            out.push('\\');
            last = i + 1;
        }
    }
    out.push_str(&src[last..]);
    Cow::Owned(out)
}
