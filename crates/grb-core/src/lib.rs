//! Core of the Telegram bot framework: Bot API model, outbound rate limiting,
//! middleware dispatch and long polling.
//!
//! Nothing here speaks HTTP. The Bot API is reached through the
//! [`api::ApiTransport`] port, implemented in the adapter crate.

pub mod api;
pub mod bot;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ratelimit;
pub mod text;
pub mod updates;

pub use errors::{Error, Result};
