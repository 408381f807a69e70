use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::extractor::OfferSource;
use crate::metrics::{ProgressCallback, RunState};
use crate::offer::ExtractedOffer;
use crate::output::OfferWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

pub const DEFAULT_TRADING_PAIR: &str = "BTC_USDT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    FetchingBatch,
    ProcessingItems { index: usize },
    Completed,
}

/// Resolved invocation parameters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchParams {
    pub trading_pair: String,
    pub target_directory: PathBuf,
}

impl FetchParams {
    /// A missing pair falls back to `BTC_USDT`; a missing or empty target
    /// directory is a configuration error.
    pub fn resolve(trading_pair: Option<&str>, target_directory: Option<&Path>) -> Result<Self> {
        let trading_pair = match trading_pair.map(str::trim) {
            Some(pair) if !pair.is_empty() => pair.to_string(),
            _ => DEFAULT_TRADING_PAIR.to_string(),
        };

        let target_directory = match target_directory {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => {
                return Err(Error::Config(
                    "target_directory is required to persist offers".to_string(),
                ));
            }
        };

        Ok(Self {
            trading_pair,
            target_directory,
        })
    }
}

/// Drives one fetch: extract the batch, persist each offer, report progress.
pub struct OfferFetcher<S: OfferSource, W: OfferWriter> {
    name: String,
    source: S,
    writer: W,
    diagnostics: Arc<dyn Diagnostics>,
    progress: Option<ProgressCallback>,
    phase: watch::Sender<RunPhase>,
}

impl<S: OfferSource, W: OfferWriter> OfferFetcher<S, W> {
    pub fn new(name: impl Into<String>, source: S, writer: W, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let (phase, _) = watch::channel(RunPhase::NotStarted);
        Self {
            name: name.into(),
            source,
            writer,
            diagnostics,
            progress: None,
            phase,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn watch_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: RunPhase) {
        self.phase.send_replace(phase);
    }

    /// Runs the pipeline once and returns the final counters.
    ///
    /// Only creating the target directory can fail; every problem after that
    /// is logged and the run carries on. Takes `&mut self` so runs on one
    /// fetcher never overlap.
    pub async fn run(&mut self, params: &FetchParams) -> Result<RunState> {
        let mut state = RunState::new();
        self.set_phase(RunPhase::NotStarted);
        self.diagnostics.info(&format!(
            "Starting {} fetch for trading pair '{}' into '{}'",
            self.name,
            params.trading_pair,
            params.target_directory.display()
        ));

        // Fails when the path exists but is not a directory.
        let existed = params.target_directory.is_dir();
        std::fs::create_dir_all(&params.target_directory)?;
        if !existed {
            self.diagnostics.info(&format!(
                "Created directory {}",
                params.target_directory.display()
            ));
        }

        self.set_phase(RunPhase::FetchingBatch);
        let offers = self.source.extract(&params.trading_pair).await;
        state.set_total(offers.len() as u64);
        self.diagnostics
            .info(&format!("Found {} P2P offers", offers.len()));

        for (index, offer) in offers.into_iter().enumerate() {
            self.set_phase(RunPhase::ProcessingItems { index });
            let started = Instant::now();
            let field_failures = offer.failures().len() as u64;
            let persisted = self.persist(offer, &params.target_directory).await;
            state.record_item(started.elapsed(), persisted, field_failures);

            if let Some(callback) = &self.progress {
                callback(&state.snapshot(&self.name));
            }
        }

        state.complete();
        self.set_phase(RunPhase::Completed);
        self.diagnostics.info(&format!(
            "{} fetch completed: {} of {} offers persisted",
            self.name,
            state.persisted_items(),
            state.total_items()
        ));
        Ok(state)
    }

    /// Writes one offer; failures are logged and reported as `false`.
    async fn persist(&self, offer: ExtractedOffer, directory: &Path) -> bool {
        let record = offer.into_record();
        match self.writer.write(&record, directory).await {
            Ok(path) => {
                self.diagnostics
                    .info(&format!("Saved offer to {}", path.display()));
                true
            }
            Err(e) => {
                self.diagnostics.error(&format!(
                    "Error saving offer from '{}': {}",
                    record.seller, e
                ));
                false
            }
        }
    }
}
