/// Core error type.
///
/// Adapter crates map their transport-specific failures into this type so
/// callers can tell Bot API rejections (`Api`) apart from everything else.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid bot token")]
    InvalidToken,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bot api error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        retry_after: Option<i64>,
        migrate_to_chat_id: Option<i64>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Seconds the Bot API asked us to wait before retrying (HTTP 429).
    pub fn retry_after(&self) -> Option<i64> {
        match self {
            Error::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
