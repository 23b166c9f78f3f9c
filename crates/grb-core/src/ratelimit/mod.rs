//! Outbound rate limiting.
//!
//! Bot API limits:
//! - 1 message/sec to the same chat
//! - 30 messages/sec overall
//! - 20 messages/min to the same group
//!
//! Every destination-addressed call is wrapped in a [`Task`] and submitted to the
//! [`RateLimiter`]. A single worker admits tasks in submission order once both
//! the global ticker and the destination's ticker have fired, then spawns the
//! job without waiting for it.
//!
//! The two gates are awaited one after the other on a FIFO queue, so a task
//! waiting on a slow group ticker holds back every task queued behind it, even
//! for other destinations.

mod store;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::ChatId;

pub use store::{Ticker, TickerPeriods, TickerStore};

/// Unit of outbound work. Runs at most once; failures are the job's business.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    /// Minimum spacing between any two admitted tasks.
    pub global_interval: Duration,
    /// Minimum spacing between tasks for one direct chat.
    pub direct_interval: Duration,
    /// Minimum spacing between tasks for one group or channel.
    pub group_interval: Duration,
    /// How long a destination ticker lives after creation.
    pub ticker_ttl: Duration,
    pub queue_capacity: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let periods = TickerPeriods::default();
        Self {
            global_interval: Duration::from_secs(1) / 30,
            direct_interval: periods.direct,
            group_interval: periods.group,
            ticker_ttl: periods.ttl,
            queue_capacity: 1000,
        }
    }
}

impl RateLimitConfig {
    fn periods(&self) -> TickerPeriods {
        TickerPeriods {
            direct: self.direct_interval,
            group: self.group_interval,
            ttl: self.ticker_ttl,
        }
    }
}

/// A pending job addressed to one destination.
pub struct Task {
    chat_id: ChatId,
    job: Job,
    cancel: Option<CancellationToken>,
}

impl Task {
    pub fn new<F>(chat_id: impl Into<ChatId>, job: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            chat_id: chat_id.into(),
            job: Box::pin(job),
            cancel: None,
        }
    }

    /// Skip the job if `token` is cancelled before the task is admitted.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }
}

/// Paces outbound jobs under a global and a per-destination ceiling.
///
/// Bounds the admission rate only: admitted jobs run concurrently.
pub struct RateLimiter {
    tasks: mpsc::Sender<Task>,
    tickers: Arc<TickerStore>,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Start the dispatch worker. Must be called from within a tokio runtime.
    pub fn new(cfg: RateLimitConfig) -> Self {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity.max(1));
        let tickers = TickerStore::new(cfg.periods());
        let shutdown = CancellationToken::new();

        tokio::spawn(run(
            rx,
            tickers.clone(),
            cfg.global_interval,
            shutdown.clone(),
        ));

        Self {
            tasks: tx,
            tickers,
            shutdown,
        }
    }

    /// Enqueue without blocking. A full queue hands the send to a background task.
    pub fn submit(&self, task: Task) {
        match self.tasks.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) => {
                let tasks = self.tasks.clone();
                tokio::spawn(async move {
                    let _ = tasks.send(task).await;
                });
            }
            Err(TrySendError::Closed(task)) => {
                warn!(chat_id = %task.chat_id, "rate limiter stopped, dropping task");
            }
        }
    }

    /// Submit `job` and get its output back once it has been admitted and run.
    ///
    /// The receiver errors if the task is dropped without running.
    pub fn schedule<F, T>(&self, chat_id: impl Into<ChatId>, job: F) -> oneshot::Receiver<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(Task::new(chat_id, async move {
            let _ = tx.send(job.await);
        }));
        rx
    }

    pub fn tickers(&self) -> &Arc<TickerStore> {
        &self.tickers
    }

    /// Stop admitting tasks. Jobs already spawned keep running.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run(
    mut tasks: mpsc::Receiver<Task>,
    tickers: Arc<TickerStore>,
    global_interval: Duration,
    shutdown: CancellationToken,
) {
    let global = Ticker::new(global_interval);

    loop {
        let task = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = tasks.recv() => match next {
                Some(task) => task,
                None => break,
            },
        };

        let Task {
            chat_id,
            job,
            cancel,
        } = task;
        let cancel = cancel.unwrap_or_default();

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = cancel.cancelled() => {
                debug!(%chat_id, "task cancelled before admission");
                continue;
            }
            _ = global.tick() => {}
        }

        let ticker = tickers.get_or_create(&chat_id);
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = cancel.cancelled() => {
                debug!(%chat_id, "task cancelled before admission");
                continue;
            }
            _ = ticker.tick() => {}
        }

        debug!(%chat_id, "admitted task");
        tokio::spawn(job);
    }

    debug!("rate limiter stopped");
}
