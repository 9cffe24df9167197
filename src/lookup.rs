//! Retrying barcode lookup.
//!
//! Attempts run strictly one after another. After the n-th failed attempt
//! the dispatcher sleeps `base_delay * n` before trying again, so the
//! default policy waits 1s and then 2s across three attempts.
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::backend::FoodLookup;
use crate::barcode::Barcode;
use crate::error::{classify, Disposition, ProviderWhitelistError};
use crate::model::FoodItem;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the attempt that follows failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Look up `barcode`, retrying transient failures.
///
/// Returns `Ok(Some(_))` on the first hit and `Ok(None)` when the product
/// is absent, the backend rejected the code, or every attempt failed.
/// Only a provider whitelist rejection is returned as `Err`.
#[instrument(skip(lookup, barcode), fields(barcode = %barcode))]
pub async fn lookup_with_retry(
    lookup: &dyn FoodLookup,
    barcode: &Barcode,
    policy: RetryPolicy,
) -> Result<Option<FoodItem>, ProviderWhitelistError> {
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        debug!(attempt, max_attempts, "barcode lookup attempt");

        let err = match lookup.lookup_barcode(barcode).await {
            Ok(Some(item)) => {
                info!(attempt, food = %item.food_name, "barcode matched");
                return Ok(Some(item));
            }
            Ok(None) => {
                info!(attempt, "no product for barcode");
                return Ok(None);
            }
            Err(err) => err,
        };

        match classify(&err) {
            Disposition::Fatal(fatal) => {
                warn!(attempt, error = %err, "provider rejected backend address");
                return Err(fatal);
            }
            Disposition::Absent => {
                info!(attempt, error = %err, "backend reports barcode absent");
                return Ok(None);
            }
            Disposition::Transient if attempt >= max_attempts => {
                warn!(attempt, error = %err, "barcode lookup failed; retries exhausted");
                return Ok(None);
            }
            Disposition::Transient => {
                let delay = policy.delay_after(attempt);
                warn!(attempt, error = %err, ?delay, "barcode lookup failed; retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Lookup dispatcher with its collaborators injected. Holds no mutable
/// state, so one instance can serve overlapping scans.
#[derive(Clone)]
pub struct Dispatcher {
    lookup: Arc<dyn FoodLookup>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(lookup: Arc<dyn FoodLookup>, policy: RetryPolicy) -> Self {
        Self { lookup, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn lookup(
        &self,
        barcode: &Barcode,
    ) -> Result<Option<FoodItem>, ProviderWhitelistError> {
        lookup_with_retry(self.lookup.as_ref(), barcode, self.policy).await
    }
}
