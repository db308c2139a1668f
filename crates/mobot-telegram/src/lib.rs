//! Telegram adapter (teloxide).
//!
//! Implements the `mobot-core` MessagingPort over the Telegram Bot API and
//! feeds inbound messages to the core dispatcher.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use mobot_core::{
    domain::ChatId,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, FileKind, MessagingCapabilities, OutgoingFile},
    },
    Result,
};

/// Telegram rejects photo/document captions longer than this.
const MAX_CAPTION_LEN: usize = 1024;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                }
                Err(other) => return Err(Self::map_err(other)),
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_chat_actions: true,
            max_caption_len: MAX_CAPTION_LEN,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), html.to_string())
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }

    async fn send_file(&self, chat_id: ChatId, file: OutgoingFile) -> Result<()> {
        let input = || InputFile::memory(file.bytes.clone()).file_name(file.file_name.clone());

        match file.kind {
            FileKind::Photo => {
                self.with_retry(|| {
                    self.bot
                        .send_photo(Self::tg_chat(chat_id), input())
                        .caption(file.caption.clone())
                })
                .await?;
            }
            FileKind::Document => {
                self.with_retry(|| {
                    self.bot
                        .send_document(Self::tg_chat(chat_id), input())
                        .caption(file.caption.clone())
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        let tg_action = match action {
            ChatAction::UploadPhoto => teloxide::types::ChatAction::UploadPhoto,
            ChatAction::UploadDocument => teloxide::types::ChatAction::UploadDocument,
        };
        self.with_retry(|| self.bot.send_chat_action(Self::tg_chat(chat_id), tg_action))
            .await?;
        Ok(())
    }
}
