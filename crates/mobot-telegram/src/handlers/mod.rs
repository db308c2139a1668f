//! Telegram update handlers.
//!
//! Each handler turns a Telegram update into a core `InboundCommand` and lets
//! the core dispatcher decide what, if anything, to send back.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Edits, service messages, and media without text carry no command.
    if msg.text().is_none() {
        return Ok(());
    }
    commands::handle_command(msg, state).await
}
