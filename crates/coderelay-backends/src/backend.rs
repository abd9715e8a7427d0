//! The closed set of supported CLI backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a backend name is not in the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported CLI backend: {0}")]
pub struct UnknownBackend(pub String);

/// A CLI coding assistant coderelay can drive.
///
/// The set is closed on purpose: unknown names are rejected at the boundary
/// (`FromStr`) instead of flowing through the call chain as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CliBackend {
    /// Claude Code (`claude`).
    Claude,
    /// OpenCode (`opencode`).
    Opencode,
}

impl CliBackend {
    /// All supported backends, in help-text order.
    pub const ALL: [CliBackend; 2] = [CliBackend::Claude, CliBackend::Opencode];

    /// Stable lowercase identifier used in config files and chat commands.
    pub fn id(self) -> &'static str {
        match self {
            CliBackend::Claude => "claude",
            CliBackend::Opencode => "opencode",
        }
    }

    /// Executable name resolved on PATH at spawn time.
    pub fn program(self) -> &'static str {
        match self {
            CliBackend::Claude => "claude",
            CliBackend::Opencode => "opencode",
        }
    }

    /// Human-readable name for user-facing messages.
    pub fn display_name(self) -> &'static str {
        match self {
            CliBackend::Claude => "Claude Code",
            CliBackend::Opencode => "OpenCode",
        }
    }

    /// `claude | opencode`, for error and help text.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|b| b.id())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Default for CliBackend {
    fn default() -> Self {
        CliBackend::Claude
    }
}

impl fmt::Display for CliBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CliBackend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" | "claude-code" | "cc" => Ok(CliBackend::Claude),
            "opencode" | "oc" => Ok(CliBackend::Opencode),
            _ => Err(UnknownBackend(s.trim().to_string())),
        }
    }
}
