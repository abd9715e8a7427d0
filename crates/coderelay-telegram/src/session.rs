//! Per-chat conversational state.

use chrono::{DateTime, Utc};

use coderelay_backends::CliBackend;

/// Cumulative usage counters for one chat.
#[derive(Debug, Clone)]
pub struct UsageStats {
    /// Prompts sent to a backend (text and photo captions alike).
    pub messages: u64,
    /// Prompts that carried an image attachment.
    pub images: u64,
    /// Explicit `/new` resets.
    pub session_resets: u64,
    /// `/cli` switches.
    pub backend_switches: u64,
    /// First interaction from this chat.
    pub started_at: DateTime<Utc>,
    /// Most recent interaction.
    pub last_active: DateTime<Utc>,
}

/// One chat's conversational state within a workspace.
///
/// Created lazily on first contact, mutated on every command or message,
/// and gone with the process: persistence is an explicit non-goal.
#[derive(Debug, Clone)]
pub struct ChatSession {
    /// Backend new prompts run against.
    pub backend: CliBackend,
    /// Continuation id assigned by the backend. Always scoped to
    /// `backend`: any action that changes or resets the backend clears it
    /// in the same step.
    pub session_id: Option<String>,
    /// Usage counters for `/stats`.
    pub stats: UsageStats,
}

impl ChatSession {
    /// Fresh session on the workspace's default backend.
    pub fn new(backend: CliBackend) -> Self {
        let now = Utc::now();
        Self {
            backend,
            session_id: None,
            stats: UsageStats {
                messages: 0,
                images: 0,
                session_resets: 0,
                backend_switches: 0,
                started_at: now,
                last_active: now,
            },
        }
    }

    /// Clear continuity without touching the active backend.
    pub fn reset(&mut self) {
        self.session_id = None;
        self.stats.session_resets += 1;
    }

    /// Switch backend and clear continuity in the same step.
    pub fn switch_backend(&mut self, backend: CliBackend) {
        self.backend = backend;
        self.session_id = None;
        self.stats.backend_switches += 1;
    }

    /// Record activity for the stats block.
    pub fn touch(&mut self) {
        self.stats.last_active = Utc::now();
    }
}
