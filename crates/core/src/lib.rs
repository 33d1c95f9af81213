//! Delicious Core - Shared domain types.
//!
//! This crate provides the types used across all Delicious components:
//! - `site` - The public store directory web application
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, slugs, ratings, locations and tags

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
