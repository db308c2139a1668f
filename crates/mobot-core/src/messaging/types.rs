use crate::domain::{ChatId, UserId};

/// One inbound text message that may carry a command.
///
/// Adapters only build this for messages that have both a sender and text.
#[derive(Clone, Debug)]
pub struct InboundCommand {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

/// Outgoing "chat action" shown while a file uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    UploadPhoto,
    UploadDocument,
}

/// How a file should be presented by the messenger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Photo,
    Document,
}

impl FileKind {
    const PHOTO_EXTENSIONS: &'static [&'static str] = &["png", "jpg", "jpeg", "gif", "webp"];

    pub fn for_file_name(name: &str) -> Self {
        let ext = std::path::Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext {
            Some(ext) if Self::PHOTO_EXTENSIONS.contains(&ext.as_str()) => Self::Photo,
            _ => Self::Document,
        }
    }

    pub fn upload_action(self) -> ChatAction {
        match self {
            Self::Photo => ChatAction::UploadPhoto,
            Self::Document => ChatAction::UploadDocument,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: String,
    pub kind: FileKind,
}

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_chat_actions: bool,
    pub max_caption_len: usize,
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
