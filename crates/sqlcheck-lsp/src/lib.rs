//! sqlcheck Language Server Protocol implementation
//!
//! Checks open `.sql` documents as they are edited and publishes the
//! results as diagnostics once typing pauses.
//!
//! ## Usage
//!
//! ```bash
//! sqlcheck-lsp
//! ```
//!
//! A `sqlcheck.toml` at the workspace root is picked up on startup and
//! re-read whenever a document is saved.

mod backend;
pub mod diagnostics;

pub use backend::Backend;
