//! Isolation contract for generated documents.
//!
//! Generated code is untrusted. It is allowed to run scripts, but must not
//! read or write the dashboard's storage or cookies, reach the parent
//! document, navigate the top-level page, or call back into the preview
//! API. Two layers enforce this:
//!
//! - the shell embeds each document in an iframe carrying
//!   [`IFRAME_SANDBOX`] (scripts only, no `allow-same-origin`, so the frame
//!   gets an opaque origin);
//! - every document response carries a `Content-Security-Policy` with a
//!   `sandbox` directive, so the same restrictions hold when the document
//!   URL is opened directly, plus `connect-src 'none'` and
//!   `form-action 'none'` so the content cannot post back to the host.

use axum::http::{HeaderName, HeaderValue, header};

/// Value of the shell iframe's `sandbox` attribute.
pub const IFRAME_SANDBOX: &str = "allow-scripts";

pub const CONTENT_SECURITY_POLICY: &str = "sandbox allow-scripts; \
default-src 'none'; \
script-src 'unsafe-inline' 'unsafe-eval' https:; \
style-src 'unsafe-inline' https:; \
img-src data: blob: https:; \
font-src data: https:; \
media-src data: blob: https:; \
connect-src 'none'; \
form-action 'none'; \
base-uri 'none'; \
frame-ancestors 'self'";

/// Headers attached to every served preview document.
pub fn document_headers() -> [(HeaderName, HeaderValue); 5] {
    [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ),
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
    ]
}
