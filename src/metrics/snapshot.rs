use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Payload handed to the progress callback after every processed offer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_name: String,
    pub total_items: u64,
    pub processed_items: u64,
    pub estimated_remaining: Duration,
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;
