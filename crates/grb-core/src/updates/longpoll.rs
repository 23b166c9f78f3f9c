use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    api::{requests::GetUpdatesRequest, ApiTransport, BotApi, Update},
    errors::Error,
};

/// Capacity of both the update and the error channel.
pub const CHANNEL_CAPACITY: usize = 1000;

/// Pulls updates with `getUpdates` on a fixed interval.
#[derive(Clone)]
pub struct LongPoller {
    api: Arc<dyn ApiTransport>,
}

impl LongPoller {
    pub fn new(api: Arc<dyn ApiTransport>) -> Self {
        Self { api }
    }

    /// Start polling in the background.
    ///
    /// The first request goes out one `interval` after the call. Failed
    /// requests are reported on the error channel and polling continues.
    /// Per-request errors are dropped when the error channel is full.
    /// Cancelling `cancel` reports [`Error::Cancelled`], waiting for room if
    /// needed, and stops the task, which closes both channels.
    pub fn long_poll(
        &self,
        cancel: CancellationToken,
        request: GetUpdatesRequest,
        interval: Duration,
    ) -> (mpsc::Receiver<Update>, mpsc::Receiver<Error>) {
        let (updates_tx, updates_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(poll_loop(
            self.api.clone(),
            cancel,
            request,
            interval,
            updates_tx,
            errors_tx,
        ));

        (updates_rx, errors_rx)
    }
}

async fn poll_loop(
    api: Arc<dyn ApiTransport>,
    cancel: CancellationToken,
    mut request: GetUpdatesRequest,
    interval: Duration,
    updates: mpsc::Sender<Update>,
    errors: mpsc::Sender<Error>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut offset = request.offset.unwrap_or(0);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        request.offset = Some(offset);
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = api.get_updates(&request) => res,
        };

        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, offset, "getUpdates failed");
                report(&errors, e);
                continue;
            }
        };
        debug!(count = batch.len(), offset, "received updates");

        for update in batch {
            let next_offset = update.update_id + 1;
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = updates.send(update) => sent,
            };
            if sent.is_err() {
                debug!("update receiver dropped; stopping long poll");
                return;
            }
            offset = offset.max(next_offset);
        }
    }

    // Waits for room: the stop signal is never dropped, only lost with the receiver.
    let _ = errors.send(Error::Cancelled).await;
}

fn report(errors: &mpsc::Sender<Error>, err: Error) {
    if let Err(e) = errors.try_send(err) {
        debug!(error = %e, "dropping long poll error");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::{port::fake::FakeTransport, ApiResponse};

    const INTERVAL: Duration = Duration::from_millis(100);

    fn updates_reply(ids: &[i64]) -> crate::Result<ApiResponse> {
        let updates: Vec<_> = ids.iter().map(|id| json!({"update_id": id})).collect();
        Ok(ApiResponse::success(json!(updates)))
    }

    async fn drain_until_cancelled(errors: &mut mpsc::Receiver<Error>) -> bool {
        while let Some(err) = errors.recv().await {
            if matches!(err, Error::Cancelled) {
                return true;
            }
        }
        false
    }

    fn offsets(api: &FakeTransport) -> Vec<Option<i64>> {
        api.calls()
            .iter()
            .map(|(_, params)| params.get("offset").and_then(|v| v.as_i64()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_updates_and_advances_offset() {
        let api = FakeTransport::new();
        api.push_reply(updates_reply(&[5, 7]));
        api.push_reply(updates_reply(&[3]));
        api.push_reply(updates_reply(&[]));

        let cancel = CancellationToken::new();
        let poller = LongPoller::new(api.clone());
        let (mut updates, mut errors) =
            poller.long_poll(cancel.clone(), GetUpdatesRequest::default(), INTERVAL);

        let ids: Vec<i64> = [
            updates.recv().await.unwrap(),
            updates.recv().await.unwrap(),
            updates.recv().await.unwrap(),
        ]
        .iter()
        .map(|u| u.update_id)
        .collect();
        assert_eq!(ids, vec![5, 7, 3]);

        tokio::time::sleep(INTERVAL * 2).await;
        cancel.cancel();
        assert!(drain_until_cancelled(&mut errors).await);
        assert!(updates.recv().await.is_none());

        // A stale id never moves the offset backwards.
        assert_eq!(&offsets(&api)[..3], &[Some(0), Some(8), Some(8)]);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported_and_polling_continues() {
        let api = FakeTransport::new();
        api.push_reply(Ok(ApiResponse::failure(502, "Bad Gateway")));
        api.push_reply(updates_reply(&[1]));

        let cancel = CancellationToken::new();
        let request = GetUpdatesRequest {
            offset: Some(1),
            ..Default::default()
        };
        let (mut updates, mut errors) =
            LongPoller::new(api.clone()).long_poll(cancel.clone(), request, INTERVAL);

        assert!(matches!(
            errors.recv().await,
            Some(Error::Api { code: 502, .. })
        ));
        assert_eq!(updates.recv().await.unwrap().update_id, 1);
        assert_eq!(&offsets(&api)[..2], &[Some(1), Some(1)]);

        cancel.cancel();
        assert!(drain_until_cancelled(&mut errors).await);
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_waits_one_interval() {
        let api = FakeTransport::new();
        api.push_reply(updates_reply(&[]));

        let cancel = CancellationToken::new();
        let _channels = LongPoller::new(api.clone()).long_poll(
            cancel.clone(),
            GetUpdatesRequest::default(),
            INTERVAL,
        );

        tokio::time::sleep(INTERVAL / 2).await;
        assert!(api.calls().is_empty());
        tokio::time::sleep(INTERVAL).await;
        assert_eq!(api.calls().len(), 1);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_surfaces_even_with_a_full_error_channel() {
        // No replies queued: every poll fails.
        let api = FakeTransport::new();
        let cancel = CancellationToken::new();
        let (_updates, mut errors) = LongPoller::new(api.clone()).long_poll(
            cancel.clone(),
            GetUpdatesRequest::default(),
            Duration::from_millis(1),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(api.calls().len() > CHANNEL_CAPACITY);
        cancel.cancel();

        let mut drained = 0;
        let mut saw_cancelled = false;
        while let Some(err) = errors.recv().await {
            drained += 1;
            if matches!(err, Error::Cancelled) {
                saw_cancelled = true;
            }
        }
        assert!(saw_cancelled);
        assert_eq!(drained, CHANNEL_CAPACITY + 1);
    }
}
