//! Backend definitions for coderelay.
//!
//! This crate knows which external CLI coding assistants coderelay can
//! drive and how to talk to each of them: the executable name, the argv
//! shape for a prompt (with optional session continuation and image
//! attachment), and the output marker that carries the backend-assigned
//! session id.
//!
//! Everything backend-specific lives here. Adding a backend means adding
//! one enum variant, one invocation arm, and one marker pattern; call
//! sites elsewhere are untouched.

pub mod backend;
pub mod invocation;
pub mod markers;

pub use backend::{CliBackend, UnknownBackend};
pub use invocation::Invocation;
