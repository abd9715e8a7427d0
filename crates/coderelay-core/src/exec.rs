//! Backend subprocess execution.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use coderelay_backends::Invocation;

/// Run an invocation in `working_dir` and capture stdout and stderr as a
/// single text result.
///
/// There is no separate error channel: spawn failures, non-zero exits, and
/// timeouts all surface as whatever text ends up in the result, and the
/// caller delivers that text to the user.
pub async fn run(
    invocation: &Invocation,
    working_dir: &Path,
    timeout: Option<Duration>,
) -> String {
    debug!(
        command = %invocation.command_line(),
        dir = %working_dir.display(),
        "running backend"
    );

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(program = %invocation.program, error = %e, "failed to spawn backend");
            return format!("failed to start {}: {}", invocation.program, e);
        }
    };

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => {
                // The elapsed timeout drops the wait future, which owns the
                // child; kill_on_drop reaps the process tree.
                warn!(
                    program = %invocation.program,
                    secs = limit.as_secs(),
                    "backend timed out"
                );
                return format!(
                    "{} timed out after {}s and was terminated",
                    invocation.program,
                    limit.as_secs()
                );
            }
        },
        None => child.wait_with_output().await,
    };

    match output {
        Ok(output) => {
            if !output.status.success() {
                debug!(status = %output.status, "backend exited non-zero");
            }
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&stderr);
            }
            text
        }
        Err(e) => format!("failed to run {}: {}", invocation.program, e),
    }
}
