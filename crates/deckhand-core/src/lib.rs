//! Core domain types for the deckhand deployment helper.
//!
//! This crate contains:
//! - Small value types shared across the workspace (basic-auth
//!   credentials, Docker image references)
//! - Pure naming helpers (environment-variable-safe slugs, deploy and
//!   secret names, prefixed variable collection)
//!
//! Nothing in here touches the process environment or the filesystem.

pub mod models;
pub mod naming;

pub use models::{BasicAuthUser, DockerImageRef};
pub use naming::env_var_safe_key;
