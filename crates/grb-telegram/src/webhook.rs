//! Webhook update producer.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use grb_core::{
    api::Update,
    bot::{Bot, Context},
    Result,
};

#[derive(Clone)]
struct WebhookState {
    bot: Arc<Bot>,
}

/// Router that feeds webhook deliveries on `path` into `bot`.
///
/// Anything but a `POST` of a JSON `Update` is answered with 400 and never
/// reaches the pipeline. The 200 is sent once the pipeline has returned.
pub fn webhook_router(bot: Arc<Bot>, path: &str) -> Router {
    Router::new()
        .route(path, any(receive_update))
        .with_state(WebhookState { bot })
}

/// Serve `router` on `addr` until `cancel` fires.
pub async fn serve(addr: SocketAddr, router: Router, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "webhook server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("webhook server stopped");
    Ok(())
}

async fn receive_update(
    State(state): State<WebhookState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if method != Method::POST {
        debug!(%method, "webhook: rejected method");
        return StatusCode::BAD_REQUEST;
    }
    if !is_json(&headers) {
        debug!("webhook: rejected content type");
        return StatusCode::BAD_REQUEST;
    }
    if body.is_empty() {
        debug!("webhook: empty body");
        return StatusCode::BAD_REQUEST;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            debug!(error = %e, "webhook: body is not an update");
            return StatusCode::BAD_REQUEST;
        }
    };

    debug!(update_id = update.update_id, "webhook: update received");
    state.bot.handle(&Context::background(), &update).await;
    StatusCode::OK
}

/// `application/json`, with or without parameters such as `charset`.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use grb_core::bot::{Middleware, Next};
    use serde_json::json;
    use tower::util::ServiceExt;

    use super::*;

    const PATH: &str = "/hook";

    #[derive(Clone, Default)]
    struct Seen(Arc<Mutex<Vec<i64>>>);

    #[async_trait]
    impl Middleware for Seen {
        async fn handle(&self, _ctx: &Context, update: &Update, _next: Next<'_>) {
            self.0.lock().unwrap().push(update.update_id);
        }
    }

    fn app() -> (Router, Seen) {
        let seen = Seen::default();
        let bot = Bot::new().with(seen.clone());
        (webhook_router(Arc::new(bot), PATH), seen)
    }

    async fn status(
        app: Router,
        method: &str,
        content_type: Option<&str>,
        body: impl Into<Body>,
    ) -> StatusCode {
        let mut builder = Request::builder().method(method).uri(PATH);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let request = builder.body(body.into()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn valid_update_is_dispatched() {
        let (app, seen) = app();
        let body = json!({"update_id": 42, "message": {
            "message_id": 1, "date": 0, "chat": {"id": 7, "type": "private"}, "text": "hi"
        }});

        let code = status(app, "POST", Some("application/json"), body.to_string()).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(*seen.0.lock().unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn charset_parameter_is_accepted() {
        let (app, seen) = app();
        let code = status(
            app,
            "POST",
            Some("application/json; charset=utf-8"),
            r#"{"update_id": 1}"#,
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(seen.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_requests_get_400_and_skip_the_pipeline() {
        let cases: [(&str, Option<&str>, &str); 5] = [
            ("GET", Some("application/json"), r#"{"update_id": 1}"#),
            ("POST", Some("text/plain"), r#"{"update_id": 1}"#),
            ("POST", None, r#"{"update_id": 1}"#),
            ("POST", Some("application/json"), ""),
            ("POST", Some("application/json"), "{not json"),
        ];

        for (method, content_type, body) in cases {
            let (app, seen) = app();
            let code = status(app, method, content_type, body).await;
            assert_eq!(code, StatusCode::BAD_REQUEST, "{method} {content_type:?} {body:?}");
            assert!(seen.0.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn other_paths_are_not_served() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/elsewhere")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"update_id": 1}"#))
            .unwrap();
        let code = app.oneshot(request).await.unwrap().status();
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serve_stops_on_cancel() {
        let (app, _) = app();
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(
            SocketAddr::from(([127, 0, 0, 1], 0)),
            app,
            cancel.clone(),
        ));

        cancel.cancel();
        server.await.unwrap().unwrap();
    }
}
