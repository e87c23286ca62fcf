//! Carmart Core - Shared domain types.
//!
//! This crate provides the types used across all Carmart components:
//! - `api` - The marketplace REST API
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. The test-drive state machine lives here so that
//! every store implementation applies the same transition table.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, listing and booking types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
