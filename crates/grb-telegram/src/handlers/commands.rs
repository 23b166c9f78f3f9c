use async_trait::async_trait;
use tracing::debug;

use grb_core::{
    api::{requests::SendMessageRequest, Update},
    bot::{Context, Middleware, Next},
    domain::ChatId,
};

use super::Outbox;

/// Replies with a fixed text to the chat the message came from.
pub struct ReplyText {
    outbox: Outbox,
    text: String,
}

impl ReplyText {
    pub fn new(outbox: Outbox, text: impl Into<String>) -> Self {
        Self {
            outbox,
            text: text.into(),
        }
    }
}

#[async_trait]
impl Middleware for ReplyText {
    async fn handle(&self, _ctx: &Context, update: &Update, _next: Next<'_>) {
        let Some(message) = update.message.as_ref() else {
            return;
        };
        debug!(chat_id = message.chat.id, "replying to command");
        self.outbox
            .send_message(SendMessageRequest::new(ChatId::Int(message.chat.id), &self.text));
    }
}
