//! Live preview: isolated rendering of generated code, kept in sync with
//! the code-generation coordinator.
//!
//! ## Module Map
//!
//! ```text
//!  code generator ──POST /api/payload──┐
//!                                      v
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ api.rs / server.rs   (axum Router, AppState, ServerConfig)       │
//! │        │ HostHandle::apply / content_loaded                      │
//! │        v                                                         │
//! │ session.rs  (PreviewSession: sole owner of the RenderHost)       │
//! │        │                                                         │
//! │        v                                                         │
//! │ host.rs     (RenderHost: generation guard, release backstops)    │
//! │        │ assemble()                 │ mount / release            │
//! │        v                            v                            │
//! │ assembler.rs (pure)          surface.rs (ServedSurface)          │
//! │                                     │ PreviewEvent::Rendered     │
//! │                                     v                            │
//! │                              ws.rs ──> shell page (sandboxed     │
//! │                                        iframe, isolation.rs)     │
//! └──────────────────────────────────────────────────────────────────┘
//!        ^
//!        │ RefreshTarget::refresh()
//! channel.rs (UpdateChannel) <── WebSocket ── coordinator
//! ```
//!
//! ## Supporting Modules
//!
//! | Module      | Responsibility                                          |
//! |-------------|---------------------------------------------------------|
//! | `models`    | `CodePayload`, `FileMap`, `ProjectId`, `Generation`     |
//! | `viewport`  | `ViewportPreset` → container dimensions                 |
//! | `isolation` | iframe sandbox and CSP headers for served documents     |
//! | `embedded`  | Shell page assets compiled in with `rust-embed`         |
//! | `loader`    | Payloads from JSON files or directories on disk         |

pub mod api;
pub mod assembler;
pub mod channel;
pub mod embedded;
pub mod host;
pub mod isolation;
pub mod loader;
pub mod models;
pub mod server;
pub mod session;
pub mod surface;
pub mod viewport;
pub mod ws;

pub use assembler::{Document, assemble};
pub use channel::{ConnectionState, RefreshTarget, UpdateChannel};
pub use host::{RenderHost, RenderSurface};
pub use models::{CodePayload, FileMap, Generation, ProjectId};
pub use viewport::ViewportPreset;
