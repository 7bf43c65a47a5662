//! AWS Console - role assumption and resource inventory through a backend proxy
//!
//! The console lets an operator temporarily assume an AWS IAM role and inspect
//! that account's EC2 instances, Security Groups, S3 buckets and VPC network
//! topology. The AWS calls themselves are made by a backend proxy; this crate
//! is the client-side core.
//!
//! # Core Features
//!
//! - **Session lifecycle**: role assumption, persisted session id, logout and
//!   uniform expiry handling when the backend answers 401
//! - **Resource fetch**: one authenticated request per resource family with
//!   failures mapped to a fixed error taxonomy
//! - **Normalization**: heterogeneous backend payloads flattened into one
//!   record shape with an explicit absent marker
//! - **Filtering and export**: case-insensitive tag filter, Security Group
//!   rule filter, CSV export
//!
//! # Architecture Overview
//!
//! - **Session** ([`app::session`]): the store and its single writer, the controller
//! - **Resource Explorer** ([`app::resource_explorer`]): client, normalizers,
//!   filters and per-page views
//! - **Ambient** ([`app::errors`], [`app::config`]): error taxonomy and configuration
//!
//! The `awsconsole` binary is a command-line consumer of this library.

#![warn(clippy::all, rust_2018_idioms)]

pub mod app;

pub use app::errors::{ConsoleError, ConsoleResult};
pub use app::resource_explorer::{ResourceClient, ResourceExplorer};
pub use app::session::{SessionController, SessionStore};
