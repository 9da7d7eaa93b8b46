mod room;
mod room_command;
mod room_coordinator;
mod room_event;
mod room_handle;
mod room_registry;

pub use room::*;
pub use room_command::*;
pub use room_coordinator::*;
pub use room_event::*;
pub use room_handle::*;
pub use room_registry::*;
