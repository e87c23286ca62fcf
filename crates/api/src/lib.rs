//! Carmart API library.
//!
//! The JSON API behind the Carmart used-car marketplace: accounts, car
//! listings with photo uploads and AI search, test-drive bookings and an
//! admin overview. Exposed as a library so the CLI and the integration
//! tests can build the same router and services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ai;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
