use std::sync::Arc;

use teloxide::{
    dispatching::Dispatcher, dptree, error_handlers::LoggingErrorHandler, prelude::*,
    update_listeners::webhooks,
};
use tracing::{info, warn};

use mobot_core::{
    config::{Config, Transport, WebhookConfig},
    dispatch::Dispatcher as CommandDispatcher,
    messaging::port::MessagingPort,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<CommandDispatcher>,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Run the bot until the update listener stops.
///
/// Uses long polling unless a webhook is configured.
pub async fn run(cfg: Arc<Config>, dispatcher: Arc<CommandDispatcher>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!("bot started: @{}", me.username()),
        Err(e) => warn!("could not fetch bot identity: {e}"),
    }
    info!("problems directory: {}", cfg.problems_dir.display());
    info!(
        "categories: {}",
        cfg.categories
            .iter()
            .map(|c| c.token.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState {
        dispatcher,
        messenger,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut updates = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![state])
        .build();

    match &cfg.transport {
        Transport::Polling => {
            info!("receiving updates via long polling");
            updates.dispatch().await;
        }
        Transport::Webhook(hook) => {
            info!("receiving updates via webhook {} on {}", hook.url, hook.listen);
            let listener = webhooks::axum(bot, webhook_options(hook)).await?;
            updates
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("webhook listener error"),
                )
                .await;
        }
    }

    Ok(())
}

fn webhook_options(hook: &WebhookConfig) -> webhooks::Options {
    let options = webhooks::Options::new(hook.listen, hook.url.clone());
    match &hook.secret_token {
        Some(secret) => options.secret_token(secret.clone()),
        None => options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(secret_token: Option<&str>) -> WebhookConfig {
        WebhookConfig {
            url: "https://bot.example.org/telegram/hook".parse().unwrap(),
            listen: "0.0.0.0:8443".parse().unwrap(),
            secret_token: secret_token.map(str::to_string),
        }
    }

    #[test]
    fn webhook_options_carry_address_and_url() {
        let options = webhook_options(&hook(None));
        assert_eq!(options.address, hook(None).listen);
        assert_eq!(options.url.as_str(), "https://bot.example.org/telegram/hook");
        assert_eq!(options.secret_token, None);
    }

    #[test]
    fn webhook_options_forward_secret_token() {
        let options = webhook_options(&hook(Some("s3cret_Token-1")));
        assert_eq!(options.secret_token.as_deref(), Some("s3cret_Token-1"));
    }
}
