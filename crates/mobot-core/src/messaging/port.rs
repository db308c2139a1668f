use async_trait::async_trait;

use crate::{
    domain::ChatId,
    messaging::types::{ChatAction, MessagingCapabilities, OutgoingFile},
    Result,
};

/// Outbound side of a messenger.
///
/// The core only sends through this port; the adapter owns the transport's
/// lifecycle (polling loop or webhook server).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()>;

    async fn send_file(&self, chat_id: ChatId, file: OutgoingFile) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;
}
