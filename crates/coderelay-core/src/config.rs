//! Workspace registry configuration.
//!
//! Workspaces are declared in a JSON file and loaded once at startup:
//!
//! ```json
//! {
//!   "workspaces": [
//!     {
//!       "name": "myproject",
//!       "working_dir": "~/src/myproject",
//!       "bot_token": "123456:ABC...",
//!       "default_cli": "claude",
//!       "allowed_clis": ["claude", "opencode"],
//!       "command_timeout_secs": 600
//!     }
//!   ]
//! }
//! ```
//!
//! The file lives at `~/.coderelay/workspaces.json` unless overridden by
//! `CODERELAY_CONFIG` or the `--config` flag. A `Workspace` is immutable
//! for the process lifetime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use coderelay_backends::CliBackend;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CODERELAY_CONFIG";

/// Default directory name under home.
const DEFAULT_STATE_DIR: &str = ".coderelay";

/// Default config file name.
const CONFIG_FILE: &str = "workspaces.json";

/// Errors raised while loading or validating the workspace registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("workspace '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("config declares no workspaces")]
    Empty,
}

/// On-disk shape of the workspace registry.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub workspaces: Vec<WorkspaceConfig>,
}

/// One workspace entry as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// Display name, unique within the registry.
    pub name: String,
    /// Directory backend invocations run in. `~` is expanded.
    pub working_dir: String,
    /// Telegram bot token for this workspace.
    pub bot_token: String,
    /// Backend new chats start on. Defaults to claude.
    #[serde(default)]
    pub default_cli: Option<CliBackend>,
    /// Backends chats may switch to. Empty means all supported backends.
    #[serde(default)]
    pub allowed_clis: Vec<CliBackend>,
    /// Deadline for one backend invocation. Absent means unbounded.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

/// A validated workspace: one Telegram bot bound to one working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub name: String,
    pub working_dir: PathBuf,
    pub bot_token: String,
    pub default_backend: CliBackend,
    pub allowed_backends: Vec<CliBackend>,
    pub command_timeout: Option<Duration>,
}

impl Workspace {
    /// Whether chats in this workspace may use `backend`.
    pub fn allows(&self, backend: CliBackend) -> bool {
        self.allowed_backends.contains(&backend)
    }
}

/// Default config path: `$CODERELAY_CONFIG`, else `~/.coderelay/workspaces.json`.
pub fn default_config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(DEFAULT_STATE_DIR))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                .join(CONFIG_FILE)
        })
}

impl Config {
    /// Read and parse the registry file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate every entry and produce the immutable workspaces.
    pub fn resolve(self) -> Result<Vec<Workspace>, ConfigError> {
        if self.workspaces.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut seen = Vec::new();
        let mut workspaces = Vec::with_capacity(self.workspaces.len());
        for entry in self.workspaces {
            if seen.contains(&entry.name) {
                return Err(ConfigError::Invalid {
                    name: entry.name,
                    reason: "duplicate workspace name".to_string(),
                });
            }
            seen.push(entry.name.clone());
            workspaces.push(entry.resolve()?);
        }
        Ok(workspaces)
    }
}

impl WorkspaceConfig {
    /// Expand, validate, and freeze one workspace entry.
    pub fn resolve(self) -> Result<Workspace, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "<unnamed>".to_string(),
                reason: "workspace name is empty".to_string(),
            });
        }
        if self.bot_token.trim().is_empty() {
            return Err(invalid("bot_token is empty".to_string()));
        }

        let working_dir = PathBuf::from(shellexpand::tilde(&self.working_dir).into_owned());
        validate_working_dir(&working_dir).map_err(invalid)?;

        let allowed_backends = if self.allowed_clis.is_empty() {
            CliBackend::ALL.to_vec()
        } else {
            self.allowed_clis.clone()
        };

        let default_backend = self.default_cli.unwrap_or_default();
        if !allowed_backends.contains(&default_backend) {
            return Err(ConfigError::Invalid {
                name: self.name,
                reason: format!("default_cli '{default_backend}' is not in allowed_clis"),
            });
        }

        Ok(Workspace {
            name: self.name,
            working_dir,
            bot_token: self.bot_token,
            default_backend,
            allowed_backends,
            command_timeout: self.command_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Check that a working directory exists, is a directory, and is readable.
fn validate_working_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("working_dir does not exist: {}", path.display()));
    }
    if !path.is_dir() {
        return Err(format!("working_dir is not a directory: {}", path.display()));
    }
    if path.read_dir().is_err() {
        return Err(format!(
            "cannot access working_dir: {} (permission denied)",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dir: &Path) -> WorkspaceConfig {
        WorkspaceConfig {
            name: "test".to_string(),
            working_dir: dir.display().to_string(),
            bot_token: "123:abc".to_string(),
            default_cli: None,
            allowed_clis: Vec::new(),
            command_timeout_secs: None,
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ws = entry(dir.path()).resolve().unwrap();

        assert_eq!(ws.default_backend, CliBackend::Claude);
        assert_eq!(ws.allowed_backends, CliBackend::ALL.to_vec());
        assert_eq!(ws.command_timeout, None);
    }

    #[test]
    fn test_resolve_rejects_missing_dir() {
        let mut cfg = entry(Path::new("/nonexistent"));
        cfg.working_dir = "/definitely/not/a/real/path".to_string();
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_rejects_empty_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = entry(dir.path());
        cfg.bot_token = "  ".to_string();
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn test_resolve_rejects_default_outside_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = entry(dir.path());
        cfg.default_cli = Some(CliBackend::Claude);
        cfg.allowed_clis = vec![CliBackend::Opencode];
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("not in allowed_clis"));
    }

    #[test]
    fn test_timeout_resolves_to_duration() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = entry(dir.path());
        cfg.command_timeout_secs = Some(300);
        let ws = cfg.resolve().unwrap();
        assert_eq!(ws.command_timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_load_parses_registry_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("workspaces.json");
        let json = format!(
            r#"{{"workspaces": [{{
                "name": "demo",
                "working_dir": "{}",
                "bot_token": "123:abc",
                "default_cli": "opencode"
            }}]}}"#,
            dir.path().display()
        );
        std::fs::write(&config_path, json).unwrap();

        let workspaces = Config::load(&config_path).unwrap().resolve().unwrap();
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].name, "demo");
        assert_eq!(workspaces[0].default_backend, CliBackend::Opencode);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            workspaces: vec![entry(dir.path()), entry(dir.path())],
        };
        let err = config.resolve().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_registry_rejected() {
        let config = Config { workspaces: vec![] };
        assert!(matches!(config.resolve(), Err(ConfigError::Empty)));
    }
}
