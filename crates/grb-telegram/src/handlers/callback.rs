use async_trait::async_trait;

use grb_core::{
    api::{requests::AnswerCallbackQueryRequest, Update},
    bot::{Context, Middleware, Next},
};

use super::Outbox;

/// Acknowledges callback queries so the client stops its progress spinner.
pub struct AckCallback {
    outbox: Outbox,
}

impl AckCallback {
    pub fn new(outbox: Outbox) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl Middleware for AckCallback {
    async fn handle(&self, _ctx: &Context, update: &Update, _next: Next<'_>) {
        let Some(query) = update.callback_query.as_ref() else {
            return;
        };
        self.outbox.answer_callback_query(AnswerCallbackQueryRequest {
            callback_query_id: query.id.clone(),
            ..Default::default()
        });
    }
}
