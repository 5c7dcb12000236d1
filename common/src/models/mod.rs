//! Shared data models.

pub mod tracking;

// Re-export commonly used types
pub use tracking::{
    TrackingNumber, TrackingRecord, TrackingRequest, TrackingResponse, ValidatedRequest,
    TRACKING_NUMBER_LENGTH,
};
