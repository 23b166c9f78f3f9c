use std::{future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::Update;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Per-dispatch context handed to every middleware.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
}

impl Context {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// One link of the update-processing chain.
///
/// A middleware continues the chain by calling [`Next::run`]. Not calling it
/// truncates the chain: later middlewares and the fallback never see the update.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &Context, update: &Update, next: Next<'_>);
}

/// Continuation into the rest of a [`Pipeline`].
pub struct Next<'a> {
    pipeline: Option<&'a mut Pipeline>,
}

impl Next<'_> {
    /// Continuation that does nothing; handed to the fallback.
    fn terminal() -> Self {
        Self { pipeline: None }
    }

    /// Resume the chain at the pipeline's current position.
    ///
    /// Calling this more than once re-enters whatever is left of the chain.
    pub async fn run(&mut self, ctx: &Context, update: &Update) {
        if let Some(pipeline) = self.pipeline.as_deref_mut() {
            pipeline.handle(ctx, update).await;
        }
    }
}

/// Cursor over an ordered middleware list plus a terminal fallback.
///
/// Built fresh for every update and never shared between concurrent dispatches.
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
    fallback: Arc<dyn Middleware>,
    cursor: usize,
}

impl Pipeline {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self::with_fallback(middlewares, Arc::new(NoOpMiddleware))
    }

    pub fn with_fallback(
        middlewares: Vec<Arc<dyn Middleware>>,
        fallback: Arc<dyn Middleware>,
    ) -> Self {
        Self {
            middlewares,
            fallback,
            cursor: 0,
        }
    }

    pub fn handle<'a>(&'a mut self, ctx: &'a Context, update: &'a Update) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match self.middlewares.get(self.cursor).cloned() {
                Some(middleware) => {
                    self.cursor += 1;
                    let next = Next {
                        pipeline: Some(self),
                    };
                    middleware.handle(ctx, update, next).await;
                }
                None => {
                    let fallback = self.fallback.clone();
                    fallback.handle(ctx, update, Next::terminal()).await;
                }
            }
        })
    }
}

/// Logs the whole update, then continues.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, ctx: &Context, update: &Update, mut next: Next<'_>) {
        info!(update_id = update.update_id, kind = ?update.kind(), ?update, "update received");
        next.run(ctx, update).await;
    }
}

/// Swallows the update.
pub struct NoOpMiddleware;

#[async_trait]
impl Middleware for NoOpMiddleware {
    async fn handle(&self, _ctx: &Context, _update: &Update, _next: Next<'_>) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    pub type Log = Arc<Mutex<Vec<&'static str>>>;

    /// Appends its name to a shared log and optionally continues `times` times.
    pub struct Record {
        pub name: &'static str,
        pub log: Log,
        pub times: usize,
    }

    impl Record {
        pub fn pass(name: &'static str, log: &Log) -> Arc<dyn Middleware> {
            Arc::new(Self {
                name,
                log: log.clone(),
                times: 1,
            })
        }

        pub fn stop(name: &'static str, log: &Log) -> Arc<dyn Middleware> {
            Arc::new(Self {
                name,
                log: log.clone(),
                times: 0,
            })
        }
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, ctx: &Context, update: &Update, mut next: Next<'_>) {
            self.log.lock().unwrap().push(self.name);
            for _ in 0..self.times {
                next.run(ctx, update).await;
            }
        }
    }

    pub fn entries(log: &Log) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }
}
