use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use grb_core::{
    api::{requests::SetWebhookRequest, ApiTransport, BotApi},
    bot::{Bot, LoggingMiddleware},
    config::{Config, UpdateMode},
    ratelimit::RateLimiter,
    updates::{run_updates, LongPoller},
    Result,
};

use crate::{
    handlers::{default_router, Outbox},
    webhook::{serve, webhook_router},
    HttpTransport,
};

/// Everything a running bot shares between producers and handlers.
#[derive(Clone)]
pub struct App {
    pub cfg: Arc<Config>,
    pub api: Arc<dyn ApiTransport>,
    pub limiter: Arc<RateLimiter>,
    pub bot: Arc<Bot>,
}

impl App {
    /// Wire the HTTP transport, rate limiter and default handlers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(cfg: Config) -> Result<Self> {
        let api: Arc<dyn ApiTransport> = Arc::new(HttpTransport::from_config(&cfg)?);
        Ok(Self::with_api(cfg, api))
    }

    pub fn with_api(cfg: Config, api: Arc<dyn ApiTransport>) -> Self {
        let limiter = Arc::new(RateLimiter::new(cfg.rate_limit));
        let outbox = Outbox::new(api.clone(), limiter.clone());
        let bot = Bot::new()
            .with(LoggingMiddleware)
            .with(default_router(outbox));

        Self {
            cfg: Arc::new(cfg),
            api,
            limiter,
            bot: Arc::new(bot),
        }
    }

    /// Run in the configured update mode until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        match self.api.get_me().await {
            Ok(me) => info!(
                id = me.id,
                username = me.username.as_deref().unwrap_or("-"),
                mode = ?self.cfg.update_mode,
                "bot started"
            ),
            Err(e) => warn!(error = %e, "getMe failed"),
        }

        let res = match self.cfg.update_mode {
            UpdateMode::Polling => run_polling(self, cancel).await,
            UpdateMode::Webhook => run_webhook(self, cancel).await,
        };
        self.limiter.shutdown();
        res
    }
}

pub async fn run_polling(app: &App, cancel: CancellationToken) -> Result<()> {
    // getUpdates is refused while a webhook is registered.
    if let Err(e) = app.api.delete_webhook().await {
        warn!(error = %e, "deleteWebhook failed");
    }

    let poller = LongPoller::new(app.api.clone());
    let (updates, errors) = poller.long_poll(
        cancel.clone(),
        app.cfg.get_updates_request(),
        app.cfg.poll_interval,
    );
    info!(interval = ?app.cfg.poll_interval, "long polling");

    run_updates(&app.bot, updates, errors, cancel).await;
    Ok(())
}

pub async fn run_webhook(app: &App, cancel: CancellationToken) -> Result<()> {
    if let Some(url) = &app.cfg.webhook_url {
        app.api
            .set_webhook(&SetWebhookRequest {
                url: url.clone(),
                ..Default::default()
            })
            .await?;
        info!(%url, "webhook registered");
    }

    let router = webhook_router(app.bot.clone(), &app.cfg.webhook_path);
    serve(app.cfg.webhook_listen_addr, router, cancel).await
}
