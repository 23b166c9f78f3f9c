use async_trait::async_trait;

use grb_core::{
    api::{requests::SendMessageRequest, Update},
    bot::{Context, Middleware, Next},
    domain::ChatId,
};

use super::Outbox;

/// Sends text messages back as a reply. Non-text messages continue down the chain.
pub struct Echo {
    outbox: Outbox,
}

impl Echo {
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl Middleware for Echo {
    async fn handle(&self, ctx: &Context, update: &Update, mut next: Next<'_>) {
        let Some(message) = update.message.as_ref() else {
            return next.run(ctx, update).await;
        };
        let Some(text) = message.text.as_deref().filter(|t| !t.trim().is_empty()) else {
            return next.run(ctx, update).await;
        };

        let req = SendMessageRequest::new(ChatId::Int(message.chat.id), text)
            .reply_to(message.message_id);
        self.outbox.send_message(req);
    }
}
