//! Best-effort bulk results
//!
//! Bulk operations run one transition per subscription and keep going when
//! one fails. Each step yields a `Result`; [`BulkOutcome::collect`] folds
//! them into counts plus the list of failures.

use serde::Serialize;

use orchard_types::SubscriptionId;

use crate::error::SubscriptionError;

/// What happened to one item of a bulk run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The item was changed
    Processed,
    /// The item needed no change
    Skipped,
}

/// One failed item
#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub subscription_id: SubscriptionId,
    pub code: &'static str,
    pub error: String,
}

/// Summary of a bulk run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub processed_count: u32,
    pub skipped_count: u32,
    pub errors: Vec<BulkFailure>,
}

impl BulkOutcome {
    /// Fold per-subscription results into a summary
    pub fn collect<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (SubscriptionId, Result<ItemOutcome, SubscriptionError>)>,
    {
        results
            .into_iter()
            .fold(Self::default(), |mut outcome, (subscription_id, result)| {
                outcome.record(subscription_id, result);
                outcome
            })
    }

    pub fn record(
        &mut self,
        subscription_id: SubscriptionId,
        result: Result<ItemOutcome, SubscriptionError>,
    ) {
        match result {
            Ok(ItemOutcome::Processed) => self.processed_count += 1,
            Ok(ItemOutcome::Skipped) => self.skipped_count += 1,
            Err(e) => self.errors.push(BulkFailure {
                subscription_id,
                code: e.error_code(),
                error: e.to_string(),
            }),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_counts_each_kind() {
        let failed = SubscriptionId::new();
        let outcome = BulkOutcome::collect(vec![
            (SubscriptionId::new(), Ok(ItemOutcome::Processed)),
            (SubscriptionId::new(), Ok(ItemOutcome::Processed)),
            (SubscriptionId::new(), Ok(ItemOutcome::Skipped)),
            (failed, Err(SubscriptionError::ConcurrentModification)),
        ]);

        assert_eq!(outcome.processed_count, 2);
        assert_eq!(outcome.skipped_count, 1);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(outcome.errors[0].subscription_id, failed);
        assert_eq!(outcome.errors[0].code, "CONCURRENT_MODIFICATION");
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_empty_run_is_complete() {
        let outcome = BulkOutcome::collect(Vec::new());
        assert_eq!(outcome.processed_count, 0);
        assert!(outcome.is_complete());
    }
}
