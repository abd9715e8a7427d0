//! Workspace bots and the top-level manager.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{info, warn};

use coderelay_core::Workspace;

use crate::handlers::{self, Command};
use crate::state::WorkspaceState;

/// One workspace's bot: the transport handle plus its session store.
pub struct WorkspaceBot {
    bot: Bot,
    state: Arc<WorkspaceState>,
}

impl WorkspaceBot {
    pub fn new(workspace: Workspace) -> Self {
        let bot = Bot::new(workspace.bot_token.clone());
        let state = Arc::new(WorkspaceState::new(workspace));
        Self { bot, state }
    }

    /// Shared state, mainly for tests.
    pub fn state(&self) -> Arc<WorkspaceState> {
        Arc::clone(&self.state)
    }

    /// Long-poll updates for this workspace until shutdown.
    ///
    /// teloxide distributes updates by chat id: events from one chat are
    /// handled in order while different chats proceed concurrently.
    pub async fn run(self) {
        let name = self.state.workspace().name.clone();
        info!(workspace = %name, "starting dispatcher");

        let state_for_commands = Arc::clone(&self.state);
        let state_for_photos = Arc::clone(&self.state);
        let state_for_messages = Arc::clone(&self.state);

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                        let state = Arc::clone(&state_for_commands);
                        async move { handlers::handle_command(bot, msg, cmd, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.photo().is_some())
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_photos);
                        async move { handlers::handle_photo(bot, msg, state).await }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| {
                        // Commands that start with / but did not parse.
                        msg.text().map(|t| t.starts_with('/')).unwrap_or(false)
                    })
                    .endpoint(|bot: Bot, msg: Message| async move {
                        if let Some(text) = msg.text() {
                            bot.send_message(
                                msg.chat.id,
                                format!(
                                    "Unknown command: {}\n\nUse /help to see available commands.",
                                    text.split_whitespace().next().unwrap_or(text)
                                ),
                            )
                            .await?;
                        }
                        Ok(())
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| {
                        msg.text().map(|t| !t.starts_with('/')).unwrap_or(false)
                    })
                    .endpoint(move |bot: Bot, msg: Message| {
                        let state = Arc::clone(&state_for_messages);
                        async move { handlers::handle_text(bot, msg, state).await }
                    }),
            );

        Dispatcher::builder(self.bot, handler)
            .default_handler(|upd| async move {
                tracing::debug!("unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        info!(workspace = %name, "dispatcher stopped");
    }
}

/// Top-level dispatcher: one bot per configured workspace.
pub struct Manager {
    workspaces: Vec<WorkspaceBot>,
}

impl Manager {
    /// Build a bot per workspace, warning about backends missing from PATH.
    pub fn new(workspaces: Vec<Workspace>) -> Self {
        let workspaces = workspaces
            .into_iter()
            .map(|workspace| {
                for backend in &workspace.allowed_backends {
                    if which::which(backend.program()).is_err() {
                        warn!(
                            workspace = %workspace.name,
                            backend = %backend,
                            "backend executable not found on PATH"
                        );
                    }
                }
                info!(
                    workspace = %workspace.name,
                    dir = %workspace.working_dir.display(),
                    "workspace registered"
                );
                WorkspaceBot::new(workspace)
            })
            .collect();

        Self { workspaces }
    }

    /// Run every workspace dispatcher until all stop (ctrl-c).
    pub async fn run(self) {
        let handles: Vec<_> = self
            .workspaces
            .into_iter()
            .map(|workspace| tokio::spawn(workspace.run()))
            .collect();

        futures::future::join_all(handles).await;
    }
}
