//! Stock handlers: `/start`, `/help`, callback acknowledgement and echo.
//!
//! Handlers never call destination-addressed methods directly. Replies go
//! through [`Outbox`], which wraps each call in a rate limiter task.

use std::sync::Arc;

use tracing::warn;

use grb_core::{
    api::{
        requests::{AnswerCallbackQueryRequest, SendMessageRequest},
        ApiTransport, BotApi,
    },
    bot::{matchers, Router},
    ratelimit::{RateLimiter, Task},
};

mod callback;
mod commands;
mod echo;

pub use callback::AckCallback;
pub use commands::ReplyText;
pub use echo::Echo;

pub const START_TEXT: &str = "Hi! Send me any text and I will echo it back.";
pub const HELP_TEXT: &str = "/start - greeting\n/help - this message\nAnything else is echoed.";

/// Outbound side shared by handlers.
#[derive(Clone)]
pub struct Outbox {
    api: Arc<dyn ApiTransport>,
    limiter: Arc<RateLimiter>,
}

impl Outbox {
    pub fn new(api: Arc<dyn ApiTransport>, limiter: Arc<RateLimiter>) -> Self {
        Self { api, limiter }
    }

    /// Queue `req` behind the rate limiter. Failures are logged, not returned.
    pub fn send_message(&self, req: SendMessageRequest) {
        let api = self.api.clone();
        let chat_id = req.chat_id.clone();
        self.limiter.submit(Task::new(chat_id, async move {
            if let Err(e) = api.send_message(&req).await {
                warn!(chat_id = %req.chat_id, error = %e, "sendMessage failed");
            }
        }));
    }

    /// Callback answers are not addressed to a chat, so they skip the limiter.
    pub fn answer_callback_query(&self, req: AnswerCallbackQueryRequest) {
        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.answer_callback_query(&req).await {
                warn!(query_id = %req.callback_query_id, error = %e, "answerCallbackQuery failed");
            }
        });
    }
}

/// `/start` and `/help` replies, callback acks, then echo for any other message.
pub fn default_router(outbox: Outbox) -> Router {
    Router::new()
        .route(
            matchers::bot_command("start"),
            ReplyText::new(outbox.clone(), START_TEXT),
        )
        .route(
            matchers::bot_command("help"),
            ReplyText::new(outbox.clone(), HELP_TEXT),
        )
        .route(matchers::callback_query(), AckCallback::new(outbox.clone()))
        .route(matchers::message(), Echo::new(outbox))
}
