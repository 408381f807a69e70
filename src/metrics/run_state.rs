use crate::metrics::snapshot::ProgressSnapshot;
use std::time::Duration;

/// Counters for a single fetch run. A fresh value is built for every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunState {
    total_items: u64,
    processed_items: u64,
    persisted_items: u64,
    failed_writes: u64,
    field_failures: u64,
    processing_time: Duration,
    completed: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_total(&mut self, total: u64) {
        self.total_items = total;
    }

    /// Accounts for one processed offer; `persisted` is false when the write failed.
    pub(crate) fn record_item(&mut self, elapsed: Duration, persisted: bool, field_failures: u64) {
        debug_assert!(self.processed_items < self.total_items);
        self.processed_items += 1;
        self.processing_time += elapsed;
        self.field_failures += field_failures;
        if persisted {
            self.persisted_items += 1;
        } else {
            self.failed_writes += 1;
        }
    }

    pub(crate) fn complete(&mut self) {
        self.completed = true;
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn processed_items(&self) -> u64 {
        self.processed_items
    }

    pub fn persisted_items(&self) -> u64 {
        self.persisted_items
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    pub fn field_failures(&self) -> u64 {
        self.field_failures
    }

    pub fn processing_time(&self) -> Duration {
        self.processing_time
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn average_item_time(&self) -> Duration {
        self.scaled_processing_time(1)
    }

    /// Average time per processed item times the items still left.
    /// Zero until the first item has been processed.
    pub fn estimated_remaining(&self) -> Duration {
        self.scaled_processing_time(self.total_items.saturating_sub(self.processed_items))
    }

    /// `processing_time * factor / processed_items`, in whole nanoseconds.
    fn scaled_processing_time(&self, factor: u64) -> Duration {
        if self.processed_items == 0 {
            return Duration::ZERO;
        }
        let nanos = self.processing_time.as_nanos() * u128::from(factor)
            / u128::from(self.processed_items);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn snapshot(&self, run_name: &str) -> ProgressSnapshot {
        ProgressSnapshot {
            run_name: run_name.to_string(),
            total_items: self.total_items,
            processed_items: self.processed_items,
            estimated_remaining: self.estimated_remaining(),
        }
    }
}
