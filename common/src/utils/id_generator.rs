//! Unique ID generator.
//!
//! Provides identifiers for stored records and for request tracing.

use uuid::Uuid;

/// Generates unique identifiers for various entities.
pub struct IdGenerator;

impl IdGenerator {
    /// Generates a store identifier for a tracking record.
    ///
    /// # Returns
    /// A unique UUID string.
    pub fn record_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generates a unique request ID.
    pub fn request_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_is_unique() {
        let id1 = IdGenerator::record_id();
        let id2 = IdGenerator::record_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_request_id_is_uuid() {
        let id = IdGenerator::request_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
