//! Role-assumption session: the persisted store and the lifecycle
//! controller that is its only writer.

pub mod controller;
pub mod store;

pub use controller::{SessionController, SessionEvent, SessionState};
pub use store::{FilePersistence, MemoryPersistence, Session, SessionPersistence, SessionStore};
