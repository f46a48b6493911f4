//! Data models for identities, presence, friendships, and events.

pub mod event;
pub mod friendship;
pub mod presence;

pub use event::*;
pub use friendship::*;
pub use presence::*;
