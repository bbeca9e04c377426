//! Core types shared across contentdb facilities
//!
//! This crate provides foundational types used by the core, the store
//! and the logging facility:
//!
//! - **Resource identifiers**: `ResourceId`, the opaque `content://` token
//! - **Schema constants**: Canonical field keys and event names

pub mod resource;
pub mod schema;

pub use resource::{ResourceId, SCHEME};
