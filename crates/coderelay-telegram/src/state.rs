//! Per-workspace session store and command construction.

use std::collections::HashMap;
use std::path::Path;

use teloxide::types::ChatId;
use tokio::sync::RwLock;
use tracing::{debug, info};

use coderelay_backends::{CliBackend, Invocation};
use coderelay_core::Workspace;

use crate::error::{RelayError, Result};
use crate::session::ChatSession;

/// Mutable state for one workspace: every chat's session, keyed by chat id.
///
/// The lock is held only for the read-modify-write window of each
/// operation, never across subprocess execution or a network send, so a
/// long backend run in one chat does not stall any other chat. Two events
/// for the same chat cannot interleave a session-id update.
pub struct WorkspaceState {
    workspace: Workspace,
    sessions: RwLock<HashMap<ChatId, ChatSession>>,
}

impl WorkspaceState {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The immutable workspace this store is scoped to.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Active backend and continuation id for a chat, creating the
    /// session lazily on first contact.
    pub async fn get(&self, chat_id: ChatId) -> (CliBackend, Option<String>) {
        let mut sessions = self.sessions.write().await;
        let session = self.entry(&mut sessions, chat_id);
        (session.backend, session.session_id.clone())
    }

    /// Switch a chat to another backend, clearing continuity in the same
    /// write. Rejects names outside the supported set or the workspace
    /// allow-list; previous backend and session id are untouched on
    /// failure.
    pub async fn set_cli(&self, chat_id: ChatId, name: &str) -> Result<CliBackend> {
        let backend: CliBackend = name.parse()?;
        if !self.workspace.allows(backend) {
            return Err(RelayError::UnsupportedBackend(name.trim().to_string()));
        }

        let mut sessions = self.sessions.write().await;
        let session = self.entry(&mut sessions, chat_id);
        session.switch_backend(backend);
        session.touch();

        info!(chat_id = %chat_id.0, backend = %backend, "backend switched");
        Ok(backend)
    }

    /// Start a fresh conversation: clears the continuation id only. Does
    /// not invoke the backend.
    pub async fn new_session(&self, chat_id: ChatId) {
        let mut sessions = self.sessions.write().await;
        let session = self.entry(&mut sessions, chat_id);
        session.reset();
        session.touch();

        debug!(chat_id = %chat_id.0, "session reset");
    }

    /// Store the session id parsed from an invocation's captured output.
    ///
    /// `backend` is the backend the invocation ran against. The id is kept
    /// only while that is still the chat's active backend, so a `/cli`
    /// switch that raced a long run cannot pair a stale id with the new
    /// backend. Output without a marker changes nothing.
    pub async fn update_session_from_output(
        &self,
        chat_id: ChatId,
        backend: CliBackend,
        output: &str,
    ) {
        let Some(id) = backend.extract_session_id(output) else {
            return;
        };

        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&chat_id) else {
            return;
        };
        if session.backend != backend {
            debug!(chat_id = %chat_id.0, "backend changed mid-run, discarding session id");
            return;
        }

        debug!(chat_id = %chat_id.0, session = %id, "captured session id");
        session.session_id = Some(id);
    }

    /// Build the backend invocation for one prompt, counting it in the
    /// chat's usage stats.
    ///
    /// `None` means the chat's active backend is not usable in this
    /// workspace; the caller reports the build failure to the user.
    pub async fn build_command(
        &self,
        chat_id: ChatId,
        prompt: &str,
        image_path: Option<&Path>,
    ) -> Option<Invocation> {
        let mut sessions = self.sessions.write().await;
        let session = self.entry(&mut sessions, chat_id);
        if !self.workspace.allows(session.backend) {
            return None;
        }

        session.stats.messages += 1;
        if image_path.is_some() {
            session.stats.images += 1;
        }
        session.touch();

        Some(
            session
                .backend
                .invocation(prompt, session.session_id.as_deref(), image_path),
        )
    }

    /// Formatted usage block for `/stats`.
    pub async fn stats(&self, chat_id: ChatId) -> Result<String> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&chat_id).ok_or(RelayError::NoSession)?;
        let stats = &session.stats;

        Ok(format!(
            "Messages:       {}\n\
             Images:         {}\n\
             Session resets: {}\n\
             CLI switches:   {}\n\
             Active CLI:     {}\n\
             Session:        {}\n\
             First activity: {}\n\
             Last activity:  {}",
            stats.messages,
            stats.images,
            stats.session_resets,
            stats.backend_switches,
            session.backend,
            session.session_id.as_deref().unwrap_or("none"),
            stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            stats.last_active.format("%Y-%m-%d %H:%M:%S UTC"),
        ))
    }

    fn entry<'a>(
        &self,
        sessions: &'a mut HashMap<ChatId, ChatSession>,
        chat_id: ChatId,
    ) -> &'a mut ChatSession {
        sessions
            .entry(chat_id)
            .or_insert_with(|| ChatSession::new(self.workspace.default_backend))
    }
}
