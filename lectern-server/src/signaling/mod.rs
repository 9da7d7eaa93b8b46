mod auth;
mod media_relay;
mod rooms_handler;
mod signaling_service;
mod ws_handler;

pub use auth::*;
pub use media_relay::*;
pub use rooms_handler::*;
pub use signaling_service::*;
pub use ws_handler::*;
