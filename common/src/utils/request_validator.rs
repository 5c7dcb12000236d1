//! Tracking request validator.
//!
//! Turns a raw [`TrackingRequest`] into a [`ValidatedRequest`] or reports the
//! first violated rule.

use validator::{Validate, ValidationErrors};

use crate::errors::{AppError, AppResult};
use crate::models::tracking::{TrackingRequest, ValidatedRequest};

/// Fields in the order they are checked. The first failing one is reported.
const FIELD_ORDER: [&str; 5] = [
    "origin_country_id",
    "destination_country_id",
    "customer_id",
    "customer_slug",
    "weight",
];

/// Validates tracking-number generation requests.
pub struct RequestValidator;

impl RequestValidator {
    /// Validates a generation request.
    ///
    /// # Errors
    /// Returns `AppError::InvalidRequest` naming the first field that breaks a rule.
    pub fn validate(request: &TrackingRequest) -> AppResult<ValidatedRequest> {
        if let Err(errors) = request.validate() {
            let err = first_violation(&errors);
            tracing::error!(error = %err, "tracking request rejected");
            return Err(err);
        }

        // Required fields were checked above; the fallbacks are never taken.
        let validated = ValidatedRequest {
            origin_country_id: request.origin_country_id.clone().unwrap_or_default(),
            destination_country_id: request.destination_country_id.clone().unwrap_or_default(),
            weight: request.weight.unwrap_or_default(),
            created_at: request.created_at.clone(),
            customer_id: request.customer_id.clone().unwrap_or_default(),
            customer_name: request.customer_name.clone(),
            customer_slug: request.customer_slug.clone().unwrap_or_default(),
        };
        tracing::info!(
            origin = %validated.origin_country_id,
            destination = %validated.destination_country_id,
            customer_id = %validated.customer_id,
            "request validated successfully"
        );
        Ok(validated)
    }
}

fn first_violation(errors: &ValidationErrors) -> AppError {
    let field_errors = errors.field_errors();
    FIELD_ORDER
        .iter()
        .find_map(|field| {
            let first = field_errors.get(*field)?.first()?;
            let reason = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| first.code.to_string());
            Some(AppError::invalid(*field, reason))
        })
        .unwrap_or_else(|| AppError::invalid("request", errors.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> TrackingRequest {
        TrackingRequest {
            origin_country_id: Some("US".into()),
            destination_country_id: Some("CA".into()),
            weight: Some(2.5),
            created_at: Some("2024-01-01T00:00:00Z".into()),
            customer_id: Some("c1".into()),
            customer_name: Some("Acme Corp".into()),
            customer_slug: Some("acme".into()),
        }
    }

    fn rejected_field(request: &TrackingRequest) -> String {
        match RequestValidator::validate(request) {
            Err(AppError::InvalidRequest { field, .. }) => field,
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let validated = RequestValidator::validate(&valid_request()).unwrap();
        assert_eq!(validated.origin_country_id, "US");
        assert_eq!(validated.destination_country_id, "CA");
        assert_eq!(validated.weight, 2.5);
        assert_eq!(validated.customer_slug, "acme");
        assert_eq!(validated.customer_name.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut req = valid_request();
        req.origin_country_id = None;
        assert_eq!(rejected_field(&req), "origin_country_id");

        let mut req = valid_request();
        req.destination_country_id = None;
        assert_eq!(rejected_field(&req), "destination_country_id");

        let mut req = valid_request();
        req.customer_id = Some("   ".into());
        assert_eq!(rejected_field(&req), "customer_id");

        let mut req = valid_request();
        req.customer_slug = None;
        assert_eq!(rejected_field(&req), "customer_slug");

        let mut req = valid_request();
        req.weight = None;
        assert_eq!(rejected_field(&req), "weight");
    }

    #[test]
    fn test_malformed_country_codes_rejected() {
        for code in ["us", "USA", "U1", "", " US"] {
            let mut req = valid_request();
            req.destination_country_id = Some(code.into());
            assert_eq!(rejected_field(&req), "destination_country_id", "code {code:?}");
        }
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        for weight in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut req = valid_request();
            req.weight = Some(weight);
            assert_eq!(rejected_field(&req), "weight", "weight {weight}");
        }
    }

    #[test]
    fn test_first_failure_in_check_order_wins() {
        let req = TrackingRequest {
            weight: Some(-3.0),
            customer_id: None,
            destination_country_id: Some("ca".into()),
            ..valid_request()
        };
        assert_eq!(rejected_field(&req), "destination_country_id");
    }

    #[test]
    fn test_created_at_not_checked_here() {
        let mut req = valid_request();
        req.created_at = Some("not a date".into());
        assert!(RequestValidator::validate(&req).is_ok());
    }
}
