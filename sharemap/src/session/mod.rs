//! Map sessions: the event-facing layer between the map widget and the
//! render pipeline.
//!
//! [`MapSession`] is synchronous and clock-free; hosts with their own event
//! loop drive it directly. [`driver::spawn_session`] runs one on a tokio
//! task for hosts that prefer channels.

pub mod driver;
mod map_session;

pub use driver::{spawn_session, SessionCommand, SessionError, SessionHandle};
pub use map_session::{MapSession, SessionTiming, DEFAULT_DEBOUNCE};
