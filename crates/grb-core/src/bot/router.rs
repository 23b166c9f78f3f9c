use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::{
    api::Update,
    bot::middleware::{Context, Middleware, Next},
};

/// Predicate over an update. Must not mutate anything.
pub type RouteMatcher = Arc<dyn Fn(&Update) -> bool + Send + Sync>;

/// A matcher paired with the middleware that handles what it matches.
#[derive(Clone)]
pub struct Route {
    matcher: RouteMatcher,
    handler: Arc<dyn Middleware>,
}

impl Route {
    pub fn new(matcher: RouteMatcher, handler: impl Middleware + 'static) -> Self {
        Self::from_arc(matcher, Arc::new(handler))
    }

    /// Route to a handler that is already shared elsewhere.
    pub fn from_arc(matcher: RouteMatcher, handler: Arc<dyn Middleware>) -> Self {
        Self { matcher, handler }
    }

    pub fn matches(&self, update: &Update) -> bool {
        (self.matcher)(update)
    }

    pub async fn handle(&self, ctx: &Context, update: &Update, next: Next<'_>) {
        self.handler.handle(ctx, update, next).await;
    }
}

/// First-match dispatcher, usable as a middleware.
///
/// Routes are tried in registration order. The first match handles the update
/// (and decides whether to continue the chain); with no match the update
/// passes straight through.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, matcher: RouteMatcher, handler: impl Middleware + 'static) {
        self.push(Route::new(matcher, handler));
    }

    pub fn add_route_arc(&mut self, matcher: RouteMatcher, handler: Arc<dyn Middleware>) {
        self.push(Route::from_arc(matcher, handler));
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Builder form of [`Router::add_route`].
    pub fn route(mut self, matcher: RouteMatcher, handler: impl Middleware + 'static) -> Self {
        self.add_route(matcher, handler);
        self
    }

    pub fn match_update(&self, update: &Update) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(update))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl Middleware for Router {
    async fn handle(&self, ctx: &Context, update: &Update, mut next: Next<'_>) {
        match self.match_update(update) {
            Some(route) => route.handle(ctx, update, next).await,
            None => {
                trace!(update_id = update.update_id, "no route matched");
                next.run(ctx, update).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{
        matchers,
        middleware::{
            testing::{entries, Log, Record},
            Pipeline,
        },
    };

    fn constant(value: bool) -> RouteMatcher {
        Arc::new(move |_: &Update| value)
    }

    fn recorder(name: &'static str, log: &Log, times: usize) -> Record {
        Record {
            name,
            log: log.clone(),
            times,
        }
    }

    async fn dispatch(router: Router, log: &Log) {
        let mut pipeline =
            Pipeline::with_fallback(vec![Arc::new(router)], Record::stop("fallback", log));
        pipeline
            .handle(&Context::background(), &Update::default())
            .await;
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let log = Log::default();
        let router = Router::new()
            .route(constant(false), recorder("h1", &log, 0))
            .route(constant(true), recorder("h2", &log, 0))
            .route(constant(true), recorder("h3", &log, 0));

        dispatch(router, &log).await;
        assert_eq!(entries(&log), vec!["h2"]);
    }

    #[tokio::test]
    async fn matched_handler_controls_continuation() {
        let log = Log::default();
        let router = Router::new().route(constant(true), recorder("h", &log, 1));

        dispatch(router, &log).await;
        assert_eq!(entries(&log), vec!["h", "fallback"]);
    }

    #[tokio::test]
    async fn unmatched_update_passes_through() {
        let log = Log::default();
        let router = Router::new().route(constant(false), recorder("h", &log, 0));

        dispatch(router, &log).await;
        assert_eq!(entries(&log), vec!["fallback"]);

        let log = Log::default();
        dispatch(Router::new(), &log).await;
        assert_eq!(entries(&log), vec!["fallback"]);
    }

    #[test]
    fn match_update_returns_the_first_route() {
        let log = Log::default();
        let router = Router::new()
            .route(matchers::callback_query(), recorder("cb", &log, 0))
            .route(matchers::any(), recorder("any", &log, 0));

        assert_eq!(router.len(), 2);
        let route = router.match_update(&Update::default()).unwrap();
        assert!(route.matches(&Update::default()));
        assert!(!router.routes[0].matches(&Update::default()));
    }

    #[tokio::test]
    async fn shared_handler_serves_several_routes() {
        let log = Log::default();
        let shared: Arc<dyn Middleware> = Arc::new(recorder("shared", &log, 0));
        let mut router = Router::new();
        router.add_route_arc(constant(false), shared.clone());
        router.add_route_arc(constant(true), shared.clone());

        dispatch(router.clone(), &log).await;
        dispatch(router.clone(), &log).await;
        assert_eq!(entries(&log), vec!["shared", "shared"]);
        assert_eq!(Arc::strong_count(&shared), 3);
    }
}
