//! Tracking-number models.
//!
//! Contains the inbound request, the validated request, the issued tracking
//! number, the persisted record and the response body.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::errors::{AppError, AppResult};

/// Total length of an issued tracking number.
pub const TRACKING_NUMBER_LENGTH: usize = 12;

/// Two uppercase ASCII letters (ISO 3166-1 alpha-2 shape).
pub static COUNTRY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("country code pattern"));

static TRACKING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{1,16}$").expect("tracking number pattern"));

/// Query parameters of a generation request.
///
/// Every field is optional at the wire level so that a missing value is
/// reported as a validation failure on that field rather than a generic
/// deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TrackingRequest {
    /// Origin country, ISO 3166-1 alpha-2 (e.g. `US`).
    #[validate(
        required(message = "cannot be null or empty"),
        custom(function = "not_blank"),
        regex(path = *COUNTRY_CODE_RE, message = "must be a 2-letter ISO 3166-1 alpha-2 code")
    )]
    pub origin_country_id: Option<String>,

    /// Destination country, ISO 3166-1 alpha-2 (e.g. `CA`).
    #[validate(
        required(message = "cannot be null or empty"),
        custom(function = "not_blank"),
        regex(path = *COUNTRY_CODE_RE, message = "must be a 2-letter ISO 3166-1 alpha-2 code")
    )]
    pub destination_country_id: Option<String>,

    /// Parcel weight; the unit is not interpreted. An empty value counts as missing.
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(
        required(message = "cannot be null"),
        custom(function = "positive_weight")
    )]
    pub weight: Option<f64>,

    /// Shipment creation time, ISO-8601 / RFC 3339.
    pub created_at: Option<String>,

    #[validate(
        required(message = "cannot be null or empty"),
        custom(function = "not_blank")
    )]
    pub customer_id: Option<String>,

    pub customer_name: Option<String>,

    #[validate(
        required(message = "cannot be null or empty"),
        custom(function = "not_blank")
    )]
    pub customer_slug: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("cannot be null or empty".into()));
    }
    Ok(())
}

fn positive_weight(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::new("weight").with_message("must be positive".into()));
    }
    Ok(())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A request that passed validation; required fields are no longer optional.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub origin_country_id: String,
    pub destination_country_id: String,
    pub weight: f64,
    pub created_at: Option<String>,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub customer_slug: String,
}

/// An issued tracking number, `^[A-Z0-9]{1,16}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    /// Accepts `value` only if it has the tracking-number shape.
    pub fn parse(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        Self::is_valid_format(&value).then_some(Self(value))
    }

    /// Whether `value` matches `^[A-Z0-9]{1,16}$`.
    pub fn is_valid_format(value: &str) -> bool {
        TRACKING_NUMBER_RE.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted issuance. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    /// Store-assigned identifier; `None` until saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tracking_number: TrackingNumber,
    pub origin_country_id: String,
    pub destination_country_id: String,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub customer_slug: String,
}

impl TrackingRecord {
    /// Builds an unsaved record, parsing `created_at` on the way.
    ///
    /// # Errors
    /// Returns `AppError::TimestampParse` if `created_at` is missing or not RFC 3339.
    pub fn new(request: &ValidatedRequest, tracking_number: TrackingNumber) -> AppResult<Self> {
        let created_at = parse_created_at(request.created_at.as_deref())?;
        Ok(Self {
            id: None,
            tracking_number,
            origin_country_id: request.origin_country_id.clone(),
            destination_country_id: request.destination_country_id.clone(),
            weight: request.weight,
            created_at,
            customer_id: request.customer_id.clone(),
            customer_name: request.customer_name.clone(),
            customer_slug: request.customer_slug.clone(),
        })
    }
}

/// Parses an ISO-8601 instant such as `2024-01-01T00:00:00Z`.
pub fn parse_created_at(value: Option<&str>) -> AppResult<DateTime<Utc>> {
    let raw = value.map(str::trim).unwrap_or_default();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::TimestampParse(raw.to_string()))
}

/// Body returned for a successful generation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResponse {
    pub tracking_number: String,
    /// Issuance time, RFC 3339.
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(created_at: Option<&str>) -> ValidatedRequest {
        ValidatedRequest {
            origin_country_id: "US".into(),
            destination_country_id: "CA".into(),
            weight: 2.5,
            created_at: created_at.map(String::from),
            customer_id: "c1".into(),
            customer_name: None,
            customer_slug: "acme".into(),
        }
    }

    #[test]
    fn test_tracking_number_format() {
        assert!(TrackingNumber::parse("USCA7QX2M4AB").is_some());
        assert!(TrackingNumber::parse("usca7qx2m4ab").is_none());
        assert!(TrackingNumber::parse("USCA-QX2M4AB").is_none());
        assert!(TrackingNumber::parse("").is_none());
        assert!(TrackingNumber::parse("A".repeat(17)).is_none());
    }

    #[test]
    fn test_record_copies_request_fields() {
        let number = TrackingNumber::parse("USCA7QX2M4AB").unwrap();
        let record = TrackingRecord::new(&validated(Some("2024-01-01T00:00:00Z")), number.clone())
            .unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.tracking_number, number);
        assert_eq!(record.origin_country_id, "US");
        assert_eq!(record.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_bad_timestamp_is_timestamp_error() {
        let number = TrackingNumber::parse("USCA7QX2M4AB").unwrap();
        let err = TrackingRecord::new(&validated(Some("01/01/2024")), number.clone()).unwrap_err();
        assert!(matches!(err, AppError::TimestampParse(ref v) if v == "01/01/2024"));

        let err = TrackingRecord::new(&validated(None), number).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_blank_weight_is_missing() {
        let request: TrackingRequest = serde_json::from_str(r#"{"weight":""}"#).unwrap();
        assert_eq!(request.weight, None);

        let request: TrackingRequest = serde_json::from_str(r#"{"weight":" 2.5 "}"#).unwrap();
        assert_eq!(request.weight, Some(2.5));

        let request: TrackingRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.weight, None);

        assert!(serde_json::from_str::<TrackingRequest>(r#"{"weight":"heavy"}"#).is_err());
    }

    #[test]
    fn test_weight_must_be_positive_and_finite() {
        assert!(positive_weight(2.5).is_ok());
        assert!(positive_weight(0.0).is_err());
        assert!(positive_weight(-1.0).is_err());
        assert!(positive_weight(f64::NAN).is_err());
        assert!(positive_weight(f64::INFINITY).is_err());
    }

    #[test]
    fn test_offset_timestamp_normalised_to_utc() {
        let parsed = parse_created_at(Some("2024-01-01T02:00:00+02:00")).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
