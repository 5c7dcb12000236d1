//! Tracking-number generator.
//!
//! A tracking number is the upper-cased origin and destination country codes
//! followed by a random suffix, `TRACKING_NUMBER_LENGTH` characters in total.
//! Candidates are drawn until one is absent from the store or the attempt
//! budget runs out.

use std::sync::Arc;

use rand::{rngs::OsRng, TryRngCore};

use common::errors::{AppError, AppResult};
use common::metrics::{MetricsRecorder, TRACKING_NUMBER_COLLISION, TRACKING_NUMBER_FAILURE};
use common::models::{TrackingNumber, ValidatedRequest, TRACKING_NUMBER_LENGTH};

use crate::repository::UniquenessChecker;

/// RFC 4648 base32 alphabet. Uppercase letters and digits only, so every
/// encoded suffix already satisfies the tracking-number format.
const SUFFIX_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Source of random bytes for suffixes.
pub trait RandomSource: Send + Sync {
    /// Fills `buf` with random bytes.
    fn fill_bytes(&self, buf: &mut [u8]) -> AppResult<()>;
}

/// Operating-system CSPRNG. Stateless, so concurrent callers never share a
/// generator state.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, buf: &mut [u8]) -> AppResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| AppError::Generation(format!("failed to draw random bytes: {e}")))
    }
}

/// Draws tracking-number candidates and checks them for uniqueness.
pub struct TrackingNumberGenerator {
    max_attempts: u32,
    random: Arc<dyn RandomSource>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl TrackingNumberGenerator {
    /// Creates a generator backed by the OS random source.
    pub fn new(max_attempts: u32, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self::with_random_source(max_attempts, Arc::new(OsRandom), metrics)
    }

    /// Creates a generator drawing from `random`.
    pub fn with_random_source(
        max_attempts: u32,
        random: Arc<dyn RandomSource>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            max_attempts,
            random,
            metrics,
        }
    }

    /// Returns the first candidate that is well-formed and absent from `checker`.
    ///
    /// Acceptance is not counted here; the caller counts the number as
    /// generated once its record is stored.
    ///
    /// # Errors
    /// - `AppError::GenerationExhausted` when every attempt collided.
    /// - `AppError::UniquenessCheck` when the existence check fails.
    /// - `AppError::Generation` when the prefix leaves no room for a suffix or
    ///   the random source fails.
    pub async fn generate<C>(
        &self,
        request: &ValidatedRequest,
        checker: &C,
    ) -> AppResult<TrackingNumber>
    where
        C: UniquenessChecker + ?Sized,
    {
        let prefix = format!(
            "{}{}",
            request.origin_country_id, request.destination_country_id
        )
        .to_ascii_uppercase();
        let suffix_len = suffix_length(&prefix)?;

        for attempt in 1..=self.max_attempts {
            let suffix = self.random_suffix(suffix_len)?;
            let candidate = format!("{prefix}{suffix}").to_ascii_uppercase();

            let Some(candidate) = TrackingNumber::parse(candidate.clone()) else {
                tracing::debug!(attempt, candidate = %candidate, "candidate failed format check");
                continue;
            };

            let exists = checker.exists(candidate.as_str()).await.map_err(|e| {
                tracing::error!(tracking_number = %candidate, error = %e, "failed to check tracking number existence");
                match e {
                    AppError::UniquenessCheck(_) => e,
                    AppError::Persistence(msg) | AppError::Generation(msg) => {
                        AppError::UniquenessCheck(msg)
                    }
                    other => AppError::UniquenessCheck(other.to_string()),
                }
            })?;

            if !exists {
                tracing::info!(attempt, tracking_number = %candidate, "tracking number is unique and valid");
                return Ok(candidate);
            }

            self.metrics.increment(TRACKING_NUMBER_COLLISION, &[]);
            tracing::warn!(attempt, tracking_number = %candidate, "tracking number collision detected, retrying");
        }

        self.metrics.increment(TRACKING_NUMBER_FAILURE, &[]);
        tracing::error!(
            attempts = self.max_attempts,
            "failed to generate a unique tracking number"
        );
        Err(AppError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }

    fn random_suffix(&self, len: usize) -> AppResult<String> {
        let mut bytes = vec![0u8; len];
        self.random.fill_bytes(&mut bytes)?;
        let suffix = encode_suffix(&bytes);
        tracing::debug!(suffix = %suffix, "generated random suffix");
        Ok(suffix)
    }
}

/// Room left for the random part after `prefix`.
///
/// # Errors
/// Returns `AppError::Generation` if the prefix already fills the tracking number.
pub fn suffix_length(prefix: &str) -> AppResult<usize> {
    match TRACKING_NUMBER_LENGTH.checked_sub(prefix.len()) {
        Some(len) if len > 0 => Ok(len),
        _ => Err(AppError::Generation(format!(
            "prefix {prefix:?} leaves no room for a random suffix"
        ))),
    }
}

/// Encodes one base32 symbol per byte from its high five bits.
fn encode_suffix(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| SUFFIX_ALPHABET[usize::from(b >> 3)] as char)
        .collect()
}
