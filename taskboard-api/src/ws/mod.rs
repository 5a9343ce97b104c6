//! WebSocket live updates.
//!
//! A socket authenticates with the `token` query parameter on upgrade and is
//! placed in its own `user:<id>` room. Clients then join project rooms to
//! receive task events. The [`Hub`] doubles as the process-local
//! [`EventPublisher`](taskboard_shared::events::EventPublisher).

mod handler;
mod heartbeat;
pub mod hub;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use hub::Hub;
