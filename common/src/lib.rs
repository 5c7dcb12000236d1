//! Shared building blocks for the tracking-number services.
//!
//! Configuration, the error type, request/record models, the API response
//! envelope, HTTP middleware, counters and request validation.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
