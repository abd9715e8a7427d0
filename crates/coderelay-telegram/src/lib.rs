//! Telegram interface for coderelay.
//!
//! Bridges Telegram chats to external CLI coding assistants. Each
//! configured workspace gets its own bot and its own session store; each
//! chat within a workspace holds one independent conversational session
//! with its active backend and continuation id.
//!
//! # Commands
//!
//! - `/start` - Welcome message
//! - `/help` - Show available commands
//! - `/new` - Start a new session (clears continuity)
//! - `/status` - Show workspace and session status
//! - `/cli [name]` - Show or switch the CLI backend
//! - `/stats` - Show usage statistics
//!
//! Plain text and photos run against the chat's active backend in the
//! workspace's working directory.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod media;
pub mod session;
pub mod state;

pub use bot::{Manager, WorkspaceBot};
pub use error::{RelayError, Result};
pub use session::ChatSession;
pub use state::WorkspaceState;
