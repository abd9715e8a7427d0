//! Shared plumbing for coderelay.
//!
//! Holds the pieces every interface needs: the workspace registry
//! (`config`), transport-size text chunking (`text`), and backend
//! subprocess execution (`exec`).

pub mod config;
pub mod exec;
pub mod text;

pub use config::{Config, ConfigError, Workspace, WorkspaceConfig};
pub use text::{chunk_text, EMPTY_RESPONSE_PLACEHOLDER};
