//! Core application modules for the AWS console.
//!
//! # Module Organization
//!
//! - [`session`] - role-assumption session store and lifecycle controller
//! - [`resource_explorer`] - session-scoped resource fetch, normalization and filtering
//! - [`errors`] - error taxonomy surfaced to every consumer
//! - [`config`] - backend origin, default region and log settings
//!
//! # Architecture
//!
//! The [`session::SessionController`] is the only writer of the session
//! store. The [`resource_explorer::ResourceClient`] reads the stored id for
//! every request and reports authorization failures back to the controller,
//! so every page shares one expiry path.

pub mod config;
pub mod errors;
pub mod resource_explorer;
pub mod session;

pub use config::ConsoleConfig;
pub use errors::{ConsoleError, ConsoleResult};
