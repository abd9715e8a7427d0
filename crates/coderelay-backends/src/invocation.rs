//! Ephemeral, ready-to-execute backend invocations.

use std::path::Path;

use crate::backend::CliBackend;

/// A fully-constructed backend command, built per message and not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Backend this invocation targets; session-marker parsing of its
    /// output is scoped to this value, not to whatever the chat's active
    /// backend is by the time the child process exits.
    pub backend: CliBackend,
    /// Executable name, resolved on PATH at spawn time.
    pub program: String,
    /// Arguments in argv order.
    pub args: Vec<String>,
}

impl Invocation {
    /// Render as a single line for logs. Not shell-quoted.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl CliBackend {
    /// Build the argv for one prompt against this backend.
    ///
    /// The continuation flag is present only when a session id exists (the
    /// first turn of a conversation omits it), and the attachment flag only
    /// when an image path is supplied.
    pub fn invocation(
        self,
        prompt: &str,
        session_id: Option<&str>,
        image_path: Option<&Path>,
    ) -> Invocation {
        let mut args = match self {
            CliBackend::Claude => vec!["-p".to_string(), prompt.to_string()],
            CliBackend::Opencode => vec!["run".to_string(), prompt.to_string()],
        };

        if let Some(id) = session_id {
            let flag = match self {
                CliBackend::Claude => "--resume",
                CliBackend::Opencode => "--session",
            };
            args.push(flag.to_string());
            args.push(id.to_string());
        }

        if let Some(path) = image_path {
            let flag = match self {
                CliBackend::Claude => "--image",
                CliBackend::Opencode => "--attach",
            };
            args.push(flag.to_string());
            args.push(path.display().to_string());
        }

        Invocation {
            backend: self,
            program: self.program().to_string(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_first_turn_omits_continuation() {
        let inv = CliBackend::Claude.invocation("hello", None, None);
        assert_eq!(inv.program, "claude");
        assert_eq!(inv.args, vec!["-p", "hello"]);
        assert!(!inv.args.iter().any(|a| a == "--resume"));
    }

    #[test]
    fn test_continuation_includes_session_id() {
        let inv = CliBackend::Claude.invocation("next step", Some("abc123"), None);
        assert_eq!(inv.args, vec!["-p", "next step", "--resume", "abc123"]);
    }

    #[test]
    fn test_opencode_argv_shape() {
        let inv = CliBackend::Opencode.invocation("fix the bug", Some("s-42"), None);
        assert_eq!(inv.program, "opencode");
        assert_eq!(inv.args, vec!["run", "fix the bug", "--session", "s-42"]);
    }

    #[test]
    fn test_image_attachment_flag() {
        let path = PathBuf::from("/tmp/coderelay_img_1_2.jpg");
        let inv = CliBackend::Claude.invocation("what is this", None, Some(&path));
        assert_eq!(
            inv.args,
            vec!["-p", "what is this", "--image", "/tmp/coderelay_img_1_2.jpg"]
        );

        let inv = CliBackend::Opencode.invocation("what is this", None, Some(&path));
        assert_eq!(
            inv.args,
            vec!["run", "what is this", "--attach", "/tmp/coderelay_img_1_2.jpg"]
        );
    }

    #[test]
    fn test_command_line_rendering() {
        let inv = CliBackend::Claude.invocation("hi", Some("abc"), None);
        assert_eq!(inv.command_line(), "claude -p hi --resume abc");
    }

    #[test]
    fn test_invocation_tagged_with_backend() {
        let inv = CliBackend::Opencode.invocation("hi", None, None);
        assert_eq!(inv.backend, CliBackend::Opencode);
    }
}
