//! CLI command implementations.
//!
//! | Module      | Commands handled |
//! |-------------|------------------|
//! | `serve`     | `Serve`          |
//! | `assemble`  | `Assemble`       |
//! | `viewports` | `Viewports`      |
//! | `config`    | `Config`         |

pub mod assemble;
pub mod config;
pub mod serve;
pub mod viewports;

pub use assemble::cmd_assemble;
pub use config::cmd_config;
pub use serve::{ServeArgs, cmd_serve};
pub use viewports::cmd_viewports;
