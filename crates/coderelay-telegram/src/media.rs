//! Image ingestion: Telegram file reference to transient local path.

use std::path::{Path, PathBuf};

use chrono::Utc;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::error::{RelayError, Result};

/// A downloaded image on disk, removed when dropped.
///
/// Handlers hold one of these for the duration of a message attempt, so
/// the file is deleted on success and failure paths alike and temp
/// storage stays bounded.
#[derive(Debug)]
pub struct TempImage {
    path: PathBuf,
}

impl TempImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove temp image");
        }
    }
}

/// Resolve a Telegram file reference and download it to a transient file.
///
/// The file name embeds the chat id and the current time so concurrent
/// chats cannot collide. Any resolution or transfer failure maps to
/// [`RelayError::Download`] and aborts the message attempt before the
/// backend runs.
pub async fn ingest(bot: &Bot, token: &str, chat_id: ChatId, file_id: &str) -> Result<TempImage> {
    let file = bot
        .get_file(file_id.to_string())
        .await
        .map_err(|e| RelayError::Download(format!("file lookup failed: {e}")))?;

    let url = format!("https://api.telegram.org/file/bot{token}/{}", file.path);
    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(RelayError::Download(format!("HTTP {}", response.status())));
    }
    let bytes = response.bytes().await?;

    let path = std::env::temp_dir().join(format!(
        "coderelay_img_{}_{}.jpg",
        chat_id.0,
        Utc::now().timestamp_micros()
    ));
    std::fs::write(&path, &bytes)?;
    debug!(path = %path.display(), size = bytes.len(), "image downloaded");

    Ok(TempImage { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_image_removed_on_drop() {
        let path = std::env::temp_dir().join("coderelay_img_test_drop.jpg");
        std::fs::write(&path, b"fake image").unwrap();
        assert!(path.exists());

        drop(TempImage { path: path.clone() });

        assert!(!path.exists());
    }
}
