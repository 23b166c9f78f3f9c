//! Update producers. Long polling lives here; the webhook endpoint is an HTTP
//! concern and lives in the adapter crate.

pub mod longpoll;

pub use longpoll::{LongPoller, CHANNEL_CAPACITY};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    api::Update,
    bot::{Bot, Context},
    errors::Error,
};

/// Feed produced updates into `bot`, one at a time and in arrival order.
///
/// Producer errors are logged. Returns once the producer has closed both
/// channels or `cancel` fires.
pub async fn run_updates(
    bot: &Bot,
    mut updates: mpsc::Receiver<Update>,
    mut errors: mpsc::Receiver<Error>,
    cancel: CancellationToken,
) {
    let ctx = Context::with_cancellation(cancel.clone());
    let mut errors_open = true;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            update = updates.recv() => match update {
                Some(update) => bot.handle(&ctx, &update).await,
                None => break,
            },
            err = errors.recv(), if errors_open => match err {
                Some(Error::Cancelled) => debug!("update producer cancelled"),
                Some(err) => warn!(error = %err, "update producer error"),
                None => errors_open = false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::bot::{Middleware, Next};

    struct Collect(Arc<Mutex<Vec<i64>>>);

    #[async_trait]
    impl Middleware for Collect {
        async fn handle(&self, _ctx: &Context, update: &Update, _next: Next<'_>) {
            self.0.lock().unwrap().push(update.update_id);
        }
    }

    fn update(id: i64) -> Update {
        Update {
            update_id: id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn dispatches_in_order_until_producer_closes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let bot = Bot::new().with(Collect(seen.clone()));

        let (updates_tx, updates_rx) = mpsc::channel(8);
        let (errors_tx, errors_rx) = mpsc::channel(8);
        for id in [3, 1, 2] {
            updates_tx.send(update(id)).await.unwrap();
        }
        errors_tx
            .send(Error::External("boom".to_string()))
            .await
            .unwrap();
        drop(updates_tx);
        drop(errors_tx);

        run_updates(&bot, updates_rx, errors_rx, CancellationToken::new()).await;
        assert_eq!(*seen.lock().unwrap(), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn returns_on_cancel() {
        let bot = Bot::new();
        let (_updates_tx, updates_rx) = mpsc::channel(1);
        let (_errors_tx, errors_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        run_updates(&bot, updates_rx, errors_rx, cancel).await;
    }
}
