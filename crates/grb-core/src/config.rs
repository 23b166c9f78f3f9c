use std::{env, fs, net::SocketAddr, path::Path, time::Duration};

use crate::{
    api::requests::GetUpdatesRequest, errors::Error, logging::LogFormat,
    ratelimit::RateLimitConfig, Result,
};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// How updates reach the bot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateMode {
    #[default]
    Polling,
    Webhook,
}

impl UpdateMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "polling" | "poll" | "longpoll" | "" => Some(Self::Polling),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }
}

/// Typed configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Bot API
    pub telegram_bot_token: String,
    pub api_url: String,
    pub request_timeout: Duration,

    // Update delivery
    pub update_mode: UpdateMode,
    pub webhook_listen_addr: SocketAddr,
    pub webhook_path: String,
    /// Public URL registered with `setWebhook`; left alone when unset.
    pub webhook_url: Option<String>,
    pub poll_interval: Duration,
    pub poll_timeout_secs: i64,
    pub poll_limit: i64,

    // Outbound rate limiting
    pub rate_limit: RateLimitConfig,

    pub log_format: LogFormat,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset and empty values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;

        let api_url = get("TELEGRAM_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let request_timeout = Duration::from_millis(parse_or(&get, "REQUEST_TIMEOUT_MS", 60_000)?);

        // Update delivery
        let update_mode = match get("UPDATE_MODE") {
            Some(raw) => UpdateMode::parse(&raw).ok_or_else(|| {
                Error::Config(format!("UPDATE_MODE must be polling or webhook, got {raw:?}"))
            })?,
            None => UpdateMode::default(),
        };
        let webhook_listen_addr = parse_or(
            &get,
            "WEBHOOK_LISTEN_ADDR",
            SocketAddr::from(([0, 0, 0, 0], 8443)),
        )?;
        let webhook_path = normalize_path(get("WEBHOOK_PATH").as_deref().unwrap_or("/webhook"));
        let webhook_url = get("WEBHOOK_URL");

        let poll_interval = Duration::from_millis(parse_or(&get, "POLL_INTERVAL_MS", 1_000)?);
        let poll_timeout_secs: i64 = parse_or(&get, "POLL_TIMEOUT_SECS", 30)?;
        let poll_limit: i64 = parse_or(&get, "POLL_LIMIT", 100)?;

        if poll_interval.is_zero() {
            return Err(Error::Config("POLL_INTERVAL_MS must be positive".to_string()));
        }
        if !(1..=100).contains(&poll_limit) {
            return Err(Error::Config("POLL_LIMIT must be within 1..=100".to_string()));
        }
        if poll_timeout_secs < 0 {
            return Err(Error::Config("POLL_TIMEOUT_SECS must not be negative".to_string()));
        }
        // A long poll must come back before the HTTP client gives up on it.
        if Duration::from_secs(poll_timeout_secs as u64) >= request_timeout {
            return Err(Error::Config(
                "REQUEST_TIMEOUT_MS must exceed POLL_TIMEOUT_SECS".to_string(),
            ));
        }

        // Rate limiting
        let global_per_sec: u32 = parse_or(&get, "RATE_GLOBAL_PER_SEC", 30)?;
        let chat_interval_ms: u64 = parse_or(&get, "RATE_CHAT_INTERVAL_MS", 1_000)?;
        let group_per_min: u32 = parse_or(&get, "RATE_GROUP_PER_MIN", 20)?;
        let ticker_ttl_secs: u64 = parse_or(&get, "RATE_TICKER_TTL_SECS", 600)?;
        let queue_capacity: usize = parse_or(&get, "RATE_QUEUE_CAPACITY", 1_000)?;

        if global_per_sec == 0
            || chat_interval_ms == 0
            || group_per_min == 0
            || ticker_ttl_secs == 0
            || queue_capacity == 0
        {
            return Err(Error::Config("RATE_* values must be positive".to_string()));
        }

        let rate_limit = RateLimitConfig {
            global_interval: Duration::from_secs(1) / global_per_sec,
            direct_interval: Duration::from_millis(chat_interval_ms),
            group_interval: Duration::from_secs(60) / group_per_min,
            ticker_ttl: Duration::from_secs(ticker_ttl_secs),
            queue_capacity,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| {
                Error::Config(format!("LOG_FORMAT must be pretty or json, got {raw:?}"))
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            telegram_bot_token,
            api_url,
            request_timeout,
            update_mode,
            webhook_listen_addr,
            webhook_path,
            webhook_url,
            poll_interval,
            poll_timeout_secs,
            poll_limit,
            rate_limit,
            log_format,
        })
    }

    /// Initial `getUpdates` request for the long poller.
    pub fn get_updates_request(&self) -> GetUpdatesRequest {
        GetUpdatesRequest {
            offset: None,
            limit: Some(self.poll_limit),
            timeout: Some(self.poll_timeout_secs),
            allowed_updates: None,
        }
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}: invalid value {raw:?}: {e}"))),
        None => Ok(default),
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
