//! Update dispatch: an ordered middleware list run once per update.

pub mod matchers;
pub mod middleware;
pub mod router;

use std::sync::Arc;

pub use middleware::{
    BoxFuture, Context, LoggingMiddleware, Middleware, Next, NoOpMiddleware, Pipeline,
};
pub use router::{Route, RouteMatcher, Router};

use crate::api::Update;

/// Registered middlewares plus the per-update entry point.
///
/// Register everything before dispatch starts; [`Bot::handle`] may then be
/// called concurrently, each call walking its own [`Pipeline`].
#[derive(Clone, Default)]
pub struct Bot {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Bot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, middleware: impl Middleware + 'static) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn add_arc(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Builder form of [`Bot::add`].
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.add(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run `update` through a fresh pipeline ending in [`NoOpMiddleware`].
    pub async fn handle(&self, ctx: &Context, update: &Update) {
        let mut pipeline = Pipeline::new(self.middlewares.clone());
        pipeline.handle(ctx, update).await;
    }
}
