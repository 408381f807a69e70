pub mod browser;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod metadata;
pub mod metrics;
pub mod offer;
pub mod output;
pub mod page;
pub mod selector;

pub use browser::{Browser, BrowserSession, WebDriverBrowser};
pub use diagnostics::{Diagnostics, LogDiagnostics, MemoryDiagnostics};
pub use error::{Error, Result};
pub use extractor::{OfferExtractor, OfferSource};
pub use fetcher::{FetchParams, OfferFetcher, RunPhase};
pub use metrics::{ProgressCallback, ProgressSnapshot, RunState};
pub use offer::{ExtractedOffer, OfferRecord};
pub use output::{FileOutput, OfferWriter, RecordFormat};
