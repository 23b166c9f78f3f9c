//! Bot API data model, the transport port, and a typed wrapper over it.

pub mod port;
pub mod requests;
pub mod response;
pub mod types;

pub use port::{ApiTransport, BotApi, Params};
pub use response::{ApiResponse, ResponseParameters};
pub use types::{Update, UpdateKind};
