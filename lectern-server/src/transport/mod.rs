mod connection_adapter;
mod transport_event;

pub use connection_adapter::*;
pub use transport_event::*;
