//! Real-time core: connection registry, event routing, and presence.

pub mod presence;
pub mod registry;
pub mod router;

pub use presence::PresenceTracker;
pub use registry::{AdmissionError, ConnectionRegistry, Registration, Session, SessionHandle};
pub use router::EventRouter;
