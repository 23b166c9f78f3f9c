//! Telegram adapter: HTTP transport for the Bot API, the webhook endpoint,
//! stock handlers and the polling/webhook composition roots.

pub mod handlers;
pub mod runner;
pub mod transport;
pub mod webhook;

pub use runner::App;
pub use transport::HttpTransport;
