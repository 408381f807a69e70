use crate::error::Result;
use crate::offer::OfferRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod file;

pub use file::FileOutput;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// One `key: value` line per field.
    #[default]
    Text,
    Json,
}

impl RecordFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RecordFormat::Text => "txt",
            RecordFormat::Json => "json",
        }
    }
}

/// Writes one offer record into `directory`, returning the created file.
#[async_trait]
pub trait OfferWriter: Send + Sync {
    async fn write(&self, record: &OfferRecord, directory: &Path) -> Result<PathBuf>;
}
