use std::sync::Arc;

use teloxide::prelude::*;

use mobot_core::{
    domain::{ChatId, UserId},
    messaging::types::InboundCommand,
};

use crate::router::AppState;

fn inbound_command(msg: &Message) -> Option<InboundCommand> {
    let user = msg.from()?;
    let text = msg.text()?;

    Some(InboundCommand {
        chat_id: ChatId(msg.chat.id.0),
        user_id: UserId(i64::try_from(user.id.0).ok()?),
        text: text.to_string(),
    })
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(cmd) = inbound_command(&msg) else {
        return Ok(());
    };

    state
        .dispatcher
        .handle(&cmd, state.messenger.as_ref())
        .await;
    Ok(())
}
