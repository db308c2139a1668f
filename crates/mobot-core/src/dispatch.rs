//! Command routing: turns one inbound message into at most one reply.
//!
//! `dispatch` never fails. Routing problems become [`Ignored`] (no reply at all)
//! and handler problems become a user-facing text built from a [`Failure`].

use std::{path::PathBuf, sync::Arc};

use tracing::{debug, error, info, warn};

use crate::{
    catalog::{Catalog, CategoryState},
    command::{parse_command, NotACommand},
    config::{Category, Config, START_COMMAND, USERS_COMMAND},
    domain::{ChatId, UserId},
    errors::Error,
    identity::IdentityStore,
    messaging::{
        port::MessagingPort,
        types::{truncate_chars, FileKind, InboundCommand, OutgoingFile},
    },
    selector,
};

pub const GENERIC_FAILURE: &str = "An error occurred. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Plain text; escaped before sending.
    Text(String),
    /// Pre-rendered Telegram HTML.
    Html(String),
    File(OutgoingFile),
}

/// Why a message produced no reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ignored {
    NotACommand,
    Unrecognized(String),
    /// A non-admin sent the admin command. Callers must treat this exactly like
    /// `Unrecognized`.
    Unauthorized(UserId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Reply(Reply),
    Ignored(Ignored),
}

/// Handler-level failures that still produce a reply.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("no problem folder for category {0:?}")]
    CategoryMissing(String),

    #[error("problem folder for category {0:?} is empty")]
    CategoryEmpty(String),

    #[error("could not list category {token:?}: {source}")]
    CatalogUnavailable {
        token: String,
        #[source]
        source: Error,
    },

    #[error("could not read problem {path}: {source}")]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: Error,
    },

    #[error("user store unavailable: {0}")]
    StoreUnavailable(#[source] Error),
}

impl Failure {
    pub fn user_text(&self) -> String {
        match self {
            Self::CategoryMissing(token) => format!("Setup Error: Folder '{token}' not found."),
            Self::CategoryEmpty(token) => {
                format!("No problems found in {}.", token.to_uppercase())
            }
            Self::StoreUnavailable(_) => {
                "Total unique users: unknown (user store unavailable).".to_string()
            }
            Self::CatalogUnavailable { .. } | Self::ArtifactUnreadable { .. } => {
                GENERIC_FAILURE.to_string()
            }
        }
    }

    fn log(&self) {
        match self {
            Self::CategoryMissing(_) | Self::CategoryEmpty(_) => warn!("{}", self),
            _ => error!("{}", self),
        }
    }
}

pub struct Dispatcher {
    cfg: Arc<Config>,
    catalog: Arc<dyn Catalog>,
    identities: Arc<dyn IdentityStore>,
}

impl Dispatcher {
    pub fn new(
        cfg: Arc<Config>,
        catalog: Arc<dyn Catalog>,
        identities: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            cfg,
            catalog,
            identities,
        }
    }

    /// Dispatch and deliver the reply, if any. Delivery failures are logged.
    pub async fn handle(&self, cmd: &InboundCommand, messenger: &dyn MessagingPort) {
        match self.dispatch(cmd).await {
            Outcome::Reply(reply) => deliver(messenger, cmd.chat_id, reply).await,
            Outcome::Ignored(reason) => {
                debug!(user_id = cmd.user_id.0, ?reason, "ignoring message");
            }
        }
    }

    pub async fn dispatch(&self, cmd: &InboundCommand) -> Outcome {
        let token = match parse_command(&cmd.text) {
            Ok(token) => token,
            Err(NotACommand) => return Outcome::Ignored(Ignored::NotACommand),
        };

        match token.as_str() {
            START_COMMAND => {
                self.track(cmd.user_id).await;
                Outcome::Reply(Reply::Html(self.welcome_html()))
            }
            USERS_COMMAND => self.user_count(cmd.user_id).await,
            _ => match self.cfg.category(&token) {
                Some(category) => {
                    self.track(cmd.user_id).await;
                    Outcome::Reply(self.problem(category).await)
                }
                None => Outcome::Ignored(Ignored::Unrecognized(token)),
            },
        }
    }

    async fn track(&self, user_id: UserId) {
        match self.identities.record_if_absent(user_id).await {
            Ok(true) => info!(user_id = user_id.0, "recorded new user"),
            Ok(false) => {}
            Err(e) => warn!("{}", Failure::StoreUnavailable(e)),
        }
    }

    async fn user_count(&self, user_id: UserId) -> Outcome {
        if user_id.0 != self.cfg.admin_id {
            warn!("unauthorized user {user_id} tried /{USERS_COMMAND}");
            return Outcome::Ignored(Ignored::Unauthorized(user_id));
        }

        let text = match self.identities.size().await {
            Ok(n) => format!("Total unique users: {n}"),
            Err(e) => {
                let failure = Failure::StoreUnavailable(e);
                failure.log();
                failure.user_text()
            }
        };
        Outcome::Reply(Reply::Text(text))
    }

    async fn problem(&self, category: &Category) -> Reply {
        match self.pick_problem(category).await {
            Ok(file) => Reply::File(file),
            Err(failure) => {
                failure.log();
                Reply::Text(failure.user_text())
            }
        }
    }

    async fn pick_problem(&self, category: &Category) -> Result<OutgoingFile, Failure> {
        let token = &category.token;
        let state = self.catalog.resolve(token).await.map_err(|source| {
            Failure::CatalogUnavailable {
                token: token.clone(),
                source,
            }
        })?;

        let items = match state {
            CategoryState::Missing => return Err(Failure::CategoryMissing(token.clone())),
            CategoryState::Empty => return Err(Failure::CategoryEmpty(token.clone())),
            CategoryState::Ready(items) => items,
        };

        let artifact = selector::select(&items);
        let bytes = self.catalog.load(artifact).await.map_err(|source| {
            Failure::ArtifactUnreadable {
                path: artifact.path.clone(),
                source,
            }
        })?;

        Ok(OutgoingFile {
            file_name: artifact.name.clone(),
            bytes,
            caption: format!("Here is your {} problem. Good luck!", category.label()),
            kind: FileKind::for_file_name(&artifact.name),
        })
    }

    fn welcome_html(&self) -> String {
        let commands = self
            .cfg
            .categories
            .iter()
            .map(|c| format!("/{} - {}", escape_html(&c.token), escape_html(&c.title)))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Welcome to the Mathematics Olympiad Problems Bot!\n\n\
I provide past problems from various prestigious math competitions. \
Just use one of the commands below to get a random problem.\n\n\
<b>Available Commands:</b>\n{commands}"
        )
    }
}

async fn deliver(messenger: &dyn MessagingPort, chat_id: ChatId, reply: Reply) {
    match reply {
        Reply::Text(text) => send_html_logged(messenger, chat_id, &escape_html(&text)).await,
        Reply::Html(html) => send_html_logged(messenger, chat_id, &html).await,
        Reply::File(mut file) => {
            let caps = messenger.capabilities();
            file.caption = truncate_chars(&file.caption, caps.max_caption_len);
            if caps.supports_chat_actions {
                let _ = messenger
                    .send_chat_action(chat_id, file.kind.upload_action())
                    .await;
            }

            let name = file.file_name.clone();
            if let Err(e) = messenger.send_file(chat_id, file).await {
                error!("failed to send problem {name} to chat {}: {e}", chat_id.0);
                send_html_logged(messenger, chat_id, GENERIC_FAILURE).await;
            }
        }
    }
}

async fn send_html_logged(messenger: &dyn MessagingPort, chat_id: ChatId, html: &str) {
    if let Err(e) = messenger.send_html(chat_id, html).await {
        error!("failed to reply to chat {}: {e}", chat_id.0);
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
