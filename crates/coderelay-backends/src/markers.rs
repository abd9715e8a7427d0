//! Session-identifier markers in backend output.
//!
//! Each backend prints its session id on a line of its own; the marker
//! shape is backend-specific. Patterns are compiled once per process.

use std::sync::OnceLock;

use regex::Regex;

use crate::backend::CliBackend;

fn claude_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^SESSION:[ \t]*(\S+)[ \t]*$").expect("invalid marker pattern")
    })
}

fn opencode_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^session_id:[ \t]*(\S+)[ \t]*$").expect("invalid marker pattern")
    })
}

impl CliBackend {
    fn marker(self) -> &'static Regex {
        match self {
            CliBackend::Claude => claude_marker(),
            CliBackend::Opencode => opencode_marker(),
        }
    }

    /// Scan captured output for this backend's session marker.
    ///
    /// The last marker wins when a run prints several. `None` means the
    /// output carried no marker; callers keep their current id in that case.
    pub fn extract_session_id(self, output: &str) -> Option<String> {
        self.marker()
            .captures_iter(output)
            .last()
            .map(|caps| caps[1].to_string())
    }
}
