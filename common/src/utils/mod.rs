//! Utility functions and helpers.

pub mod id_generator;
pub mod request_validator;

// Re-export commonly used types
pub use id_generator::IdGenerator;
pub use request_validator::RequestValidator;
