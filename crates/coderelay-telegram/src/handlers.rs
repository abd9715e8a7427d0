//! Command handlers and the message pipeline.

use std::path::Path;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

use coderelay_backends::CliBackend;
use coderelay_core::{chunk_text, exec, EMPTY_RESPONSE_PLACEHOLDER};

use crate::media;
use crate::state::WorkspaceState;

/// Telegram caps messages at 4096 characters; stay under it.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Prompt used when a photo arrives without a caption.
pub const DEFAULT_IMAGE_PROMPT: &str = "Analyze this image";

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot and get help")]
    Start,

    #[command(description = "Show help message")]
    Help,

    #[command(description = "Start a new session (clears continuity)")]
    New,

    #[command(description = "Show workspace and session status")]
    Status,

    #[command(description = "Show or switch the CLI backend: /cli [claude|opencode]")]
    Cli(String),

    #[command(description = "Show usage statistics")]
    Stats,
}

/// Dispatch a parsed command to its handler.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<WorkspaceState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg, state).await,
        Command::Help => handle_help(bot, msg).await,
        Command::New => handle_new(bot, msg, state).await,
        Command::Status => handle_status(bot, msg, state).await,
        Command::Cli(args) => handle_cli(bot, msg, state, args).await,
        Command::Stats => handle_stats(bot, msg, state).await,
    }
}

/// Handle the /start command.
async fn handle_start(bot: Bot, msg: Message, state: Arc<WorkspaceState>) -> ResponseResult<()> {
    let workspace = state.workspace();
    let welcome = format!(
        "Welcome to coderelay! 🚀\n\n\
        Messages you send here run against <b>{}</b>\n\
        (<code>{}</code>) through the {} CLI.\n\n\
        <b>Getting started:</b>\n\
        1. Send a message to run it in the workspace\n\
        2. Send a photo (optional caption) to analyze an image\n\
        3. /new starts a fresh session, /cli switches the backend\n\n\
        Type /help for all commands.",
        html_escape(&workspace.name),
        html_escape(&workspace.working_dir.display().to_string()),
        workspace.default_backend.display_name(),
    );

    bot.send_message(msg.chat.id, welcome)
        .parse_mode(ParseMode::Html)
        .await?;

    info!(chat_id = %msg.chat.id, workspace = %workspace.name, "user started bot");
    Ok(())
}

/// Handle the /help command.
async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    let help_text = Command::descriptions().to_string();
    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}

/// Handle the /new command.
async fn handle_new(bot: Bot, msg: Message, state: Arc<WorkspaceState>) -> ResponseResult<()> {
    state.new_session(msg.chat.id).await;

    bot.send_message(
        msg.chat.id,
        "✅ <b>New session started!</b>\n\nYou can now send your message.",
    )
    .parse_mode(ParseMode::Html)
    .await?;

    Ok(())
}

/// Handle the /status command.
async fn handle_status(bot: Bot, msg: Message, state: Arc<WorkspaceState>) -> ResponseResult<()> {
    let (backend, session_id) = state.get(msg.chat.id).await;
    let workspace = state.workspace();

    let mut backends = String::new();
    for candidate in CliBackend::ALL {
        let marker = if !workspace.allows(candidate) {
            "🚫"
        } else if which::which(candidate.program()).is_ok() {
            "✅"
        } else {
            "❌"
        };
        backends.push_str(&format!("{} <code>{}</code>\n", marker, candidate.id()));
    }

    let status = format!(
        "📊 <b>Current Status</b>\n\n\
        📁 Workspace: <code>{}</code>\n\
        📍 Working dir: <code>{}</code>\n\
        🔧 CLI: <code>{}</code>\n\
        🧵 Session: <code>{}</code>\n\n\
        <b>Backends:</b>\n{}",
        html_escape(&workspace.name),
        html_escape(&workspace.working_dir.display().to_string()),
        backend,
        session_id.as_deref().unwrap_or("none"),
        backends,
    );

    bot.send_message(msg.chat.id, status)
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}

/// Handle the /cli command: report the active backend, or switch to a new
/// one (which resets continuity).
async fn handle_cli(
    bot: Bot,
    msg: Message,
    state: Arc<WorkspaceState>,
    args: String,
) -> ResponseResult<()> {
    let args = args.trim();

    if args.is_empty() {
        let (backend, _) = state.get(msg.chat.id).await;
        bot.send_message(
            msg.chat.id,
            format!("📋 Current CLI: <code>{backend}</code>"),
        )
        .parse_mode(ParseMode::Html)
        .await?;
        return Ok(());
    }

    match state.set_cli(msg.chat.id, args).await {
        Ok(backend) => {
            bot.send_message(
                msg.chat.id,
                format!("✅ CLI changed to: <code>{backend}</code> (session reset)"),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            info!(chat_id = %msg.chat.id, backend = %backend, "user switched CLI");
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("❌ {e}")).await?;
        }
    }

    Ok(())
}

/// Handle the /stats command.
async fn handle_stats(bot: Bot, msg: Message, state: Arc<WorkspaceState>) -> ResponseResult<()> {
    match state.stats(msg.chat.id).await {
        Ok(block) => {
            bot.send_message(
                msg.chat.id,
                format!("📊 <b>Statistics</b>\n<pre>{}</pre>", html_escape(&block)),
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("❌ {e}")).await?;
        }
    }

    Ok(())
}

/// Handle free text: forward it to the chat's active backend.
pub async fn handle_text(bot: Bot, msg: Message, state: Arc<WorkspaceState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    run_prompt(&bot, &state, msg.chat.id, text, None).await
}

/// Handle a photo: ingest the largest variant, then run the caption (or a
/// fixed default) as the prompt with the image attached.
pub async fn handle_photo(bot: Bot, msg: Message, state: Arc<WorkspaceState>) -> ResponseResult<()> {
    let Some(photos) = msg.photo() else {
        return Ok(());
    };
    // Telegram orders size variants ascending; the last one is the largest.
    let Some(largest) = photos.last() else {
        return Ok(());
    };

    let token = &state.workspace().bot_token;
    let image = match media::ingest(&bot, token, msg.chat.id, &largest.file.id).await {
        Ok(image) => image,
        Err(e) => {
            error!(chat_id = %msg.chat.id, error = %e, "image ingestion failed");
            bot.send_message(msg.chat.id, "❌ Failed to download image")
                .await?;
            return Ok(());
        }
    };

    let prompt = match msg.caption() {
        Some(caption) if !caption.trim().is_empty() => caption.to_string(),
        _ => DEFAULT_IMAGE_PROMPT.to_string(),
    };

    // `image` lives until the handler returns, then its temp file goes away.
    run_prompt(&bot, &state, msg.chat.id, &prompt, Some(image.path())).await
}

/// The message pipeline: build the invocation, run it in the workspace
/// directory, re-thread the session id from its output, deliver chunks.
async fn run_prompt(
    bot: &Bot,
    state: &WorkspaceState,
    chat_id: ChatId,
    prompt: &str,
    image_path: Option<&Path>,
) -> ResponseResult<()> {
    if prompt.trim().is_empty() {
        return Ok(());
    }

    let Some(invocation) = state.build_command(chat_id, prompt, image_path).await else {
        bot.send_message(chat_id, "❌ Failed to build command")
            .await?;
        return Ok(());
    };

    // Best effort; a missed indicator is not worth failing the message.
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let workspace = state.workspace();
    let output = exec::run(&invocation, &workspace.working_dir, workspace.command_timeout).await;

    state
        .update_session_from_output(chat_id, invocation.backend, &output)
        .await;

    send_chunks(bot, chat_id, &output).await
}

/// Deliver backend output in transport-sized chunks, in split order.
///
/// The first transport rejection stops delivery and propagates: the
/// channel itself may be unusable at that point.
async fn send_chunks(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bot.send_message(chat_id, EMPTY_RESPONSE_PLACEHOLDER).await?;
        return Ok(());
    }

    for chunk in chunk_text(trimmed, MAX_MESSAGE_LEN) {
        if chunk.trim().is_empty() {
            continue;
        }
        bot.send_message(chat_id, chunk).await?;
    }

    Ok(())
}

/// Escape HTML special characters for Telegram HTML mode.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_command_parsing() {
        let me = "coderelay_bot";
        assert!(matches!(
            Command::parse("/new", me),
            Ok(Command::New)
        ));
        assert!(matches!(
            Command::parse("/status", me),
            Ok(Command::Status)
        ));
        assert!(matches!(
            Command::parse("/stats", me),
            Ok(Command::Stats)
        ));
        match Command::parse("/cli opencode", me) {
            Ok(Command::Cli(args)) => assert_eq!(args, "opencode"),
            other => panic!("unexpected parse: {other:?}"),
        }
        match Command::parse("/cli", me) {
            Ok(Command::Cli(args)) => assert!(args.is_empty()),
            other => panic!("unexpected parse: {other:?}"),
        }
        assert!(Command::parse("/bogus", me).is_err());
    }
}
