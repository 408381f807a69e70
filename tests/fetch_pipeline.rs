use async_trait::async_trait;
use log::Level;
use p2p_offers::browser::{Browser, BrowserSession, Viewport};
use p2p_offers::config::MarketplaceConfig;
use p2p_offers::diagnostics::MemoryDiagnostics;
use p2p_offers::error::{Error, Result};
use p2p_offers::extractor::{OfferExtractor, OfferSource};
use p2p_offers::fetcher::{FetchParams, OfferFetcher, RunPhase};
use p2p_offers::metrics::{ProgressCallback, ProgressSnapshot};
use p2p_offers::offer::{ExtractedOffer, FieldFailure, FieldOutcome, OfferRecord};
use p2p_offers::output::{FileOutput, OfferWriter, RecordFormat};
use p2p_offers::page::OfferSelectors;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

fn found(value: &str) -> FieldOutcome<String> {
    FieldOutcome::Found(value.to_string())
}

fn offer(seller: &str, methods: Option<Vec<&str>>) -> ExtractedOffer {
    ExtractedOffer {
        seller: found(seller),
        price: found("67,100.00"),
        min_amount: found("100.00"),
        max_amount: found("5,000.00"),
        payment_methods: match methods {
            Some(m) => FieldOutcome::Found(m.into_iter().map(String::from).collect()),
            None => FieldOutcome::Failed(FieldFailure::Missing),
        },
        trading_pair: "BTC_USDT".to_string(),
    }
}

/// Returns a fixed batch and records whether the output directory existed
/// at extraction time.
struct StaticSource {
    offers: Vec<ExtractedOffer>,
    directory: PathBuf,
    directory_existed: Arc<Mutex<Option<bool>>>,
}

impl StaticSource {
    fn new(offers: Vec<ExtractedOffer>, directory: &Path) -> Self {
        Self {
            offers,
            directory: directory.to_path_buf(),
            directory_existed: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl OfferSource for StaticSource {
    async fn extract(&self, _trading_pair: &str) -> Vec<ExtractedOffer> {
        *self.directory_existed.lock().unwrap() = Some(self.directory.is_dir());
        self.offers.clone()
    }
}

fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<ProgressSnapshot>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: ProgressCallback = Arc::new(move |snapshot: &ProgressSnapshot| {
        sink.lock().unwrap().push(snapshot.clone());
    });
    (callback, seen)
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn three_offers_produce_three_files() {
    let root = tempfile::tempdir().unwrap();
    let target = root.path().join("offers");
    let diag = Arc::new(MemoryDiagnostics::new());
    let source = StaticSource::new(
        vec![
            offer("alice", Some(vec!["Wise"])),
            offer("bob", None),
            offer("carol", Some(vec!["SEPA", "Revolut"])),
        ],
        &target,
    );
    let (callback, seen) = recording_callback();

    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        source,
        FileOutput::new("binance_p2p", RecordFormat::Text),
        diag.clone(),
    )
    .with_progress(callback);
    let phase = fetcher.watch_phase();

    let params = FetchParams::resolve(Some("BTC_USDT"), Some(target.as_path())).unwrap();
    let state = fetcher.run(&params).await.unwrap();

    assert!(state.is_completed());
    assert_eq!(state.total_items(), 3);
    assert_eq!(state.processed_items(), 3);
    assert_eq!(state.persisted_items(), 3);
    assert_eq!(state.field_failures(), 1);
    assert_eq!(*phase.borrow(), RunPhase::Completed);

    let files = files_in(&target);
    assert_eq!(files.len(), 3);
    let bob = files
        .iter()
        .find(|p| p.file_name().unwrap().to_string_lossy().starts_with("binance_p2p_bob_"))
        .expect("bob's offer file");
    let contents = fs::read_to_string(bob).unwrap();
    assert!(contents.contains("payment_methods: []"));
    assert!(contents.contains("seller: \"bob\""));
    assert!(contents.contains("trading_pair: \"BTC_USDT\""));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(
        seen.iter().map(|s| s.processed_items).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    let last = seen.last().unwrap();
    assert_eq!(last.run_name, "binance_p2p");
    assert_eq!(last.total_items, 3);
    assert_eq!(last.estimated_remaining, Duration::ZERO);
}

#[tokio::test]
async fn target_directory_is_created_before_extraction() {
    let root = tempfile::tempdir().unwrap();
    let target = root.path().join("nested").join("snapshots");
    assert!(!target.exists());

    let source = StaticSource::new(vec![offer("dave", Some(vec!["Zelle"]))], &target);
    let existed = source.directory_existed.clone();
    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        source,
        FileOutput::new("binance_p2p", RecordFormat::Json),
        Arc::new(MemoryDiagnostics::new()),
    );

    let params = FetchParams::resolve(None, Some(target.as_path())).unwrap();
    fetcher.run(&params).await.unwrap();

    assert_eq!(*existed.lock().unwrap(), Some(true));
    let files = files_in(&target);
    assert_eq!(files.len(), 1);
    let stored: OfferRecord = serde_json::from_str(&fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(stored.seller, "dave");
    assert_eq!(stored.payment_methods, vec!["Zelle".to_string()]);
}

#[tokio::test]
async fn empty_batch_still_completes() {
    let root = tempfile::tempdir().unwrap();
    let (callback, seen) = recording_callback();
    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        StaticSource::new(Vec::new(), root.path()),
        FileOutput::new("binance_p2p", RecordFormat::Text),
        Arc::new(MemoryDiagnostics::new()),
    )
    .with_progress(callback);

    let params = FetchParams::resolve(None, Some(root.path())).unwrap();
    let state = fetcher.run(&params).await.unwrap();

    assert!(state.is_completed());
    assert_eq!(state.processed_items(), 0);
    assert_eq!(state.estimated_remaining(), Duration::ZERO);
    assert!(seen.lock().unwrap().is_empty());
}

struct FailingWriter;

#[async_trait]
impl OfferWriter for FailingWriter {
    async fn write(&self, _record: &OfferRecord, _directory: &Path) -> Result<PathBuf> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        )))
    }
}

#[tokio::test]
async fn write_failures_do_not_abort_the_batch() {
    let root = tempfile::tempdir().unwrap();
    let diag = Arc::new(MemoryDiagnostics::new());
    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        StaticSource::new(vec![offer("erin", None), offer("frank", None)], root.path()),
        FailingWriter,
        diag.clone(),
    );

    let params = FetchParams::resolve(None, Some(root.path())).unwrap();
    let state = fetcher.run(&params).await.unwrap();

    assert!(state.is_completed());
    assert_eq!(state.processed_items(), 2);
    assert_eq!(state.failed_writes(), 2);
    assert_eq!(state.persisted_items(), 0);
    assert_eq!(diag.count(Level::Error), 2);
}

#[tokio::test]
async fn fresh_counters_for_every_run() {
    let root = tempfile::tempdir().unwrap();
    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        StaticSource::new(vec![offer("gina", None), offer("hal", None)], root.path()),
        FileOutput::new("binance_p2p", RecordFormat::Text),
        Arc::new(MemoryDiagnostics::new()),
    );
    let params = FetchParams::resolve(None, Some(root.path())).unwrap();

    let first = fetcher.run(&params).await.unwrap();
    let second = fetcher.run(&params).await.unwrap();

    assert_eq!(first.processed_items(), 2);
    assert_eq!(second.processed_items(), 2);
    assert_eq!(second.total_items(), 2);
    assert_eq!(files_in(root.path()).len(), 4);
}

struct UnreachableBrowser {
    closed: Arc<AtomicUsize>,
}

struct UnreachableSession {
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Browser for UnreachableBrowser {
    async fn open(&self, _viewport: Viewport) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(UnreachableSession {
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for UnreachableSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        Err(Error::Navigation(format!("{}: net::ERR_NAME_NOT_RESOLVED", url)))
    }

    async fn wait_for(&mut self, _css: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(String::new())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn navigation_failure_completes_with_no_files() {
    let root = tempfile::tempdir().unwrap();
    let diag = Arc::new(MemoryDiagnostics::new());
    let closed = Arc::new(AtomicUsize::new(0));
    let extractor = OfferExtractor::new(
        UnreachableBrowser {
            closed: closed.clone(),
        },
        MarketplaceConfig::default(),
        OfferSelectors::default(),
        diag.clone(),
    );
    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        extractor,
        FileOutput::new("binance_p2p", RecordFormat::Text),
        diag.clone(),
    );

    let params = FetchParams::resolve(Some("BTC_USDT"), Some(root.path())).unwrap();
    let state = fetcher.run(&params).await.unwrap();

    assert!(state.is_completed());
    assert_eq!(state.total_items(), 0);
    assert!(files_in(root.path()).is_empty());
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert!(diag.count(Level::Error) >= 1);
}

#[tokio::test]
async fn directory_creation_failure_propagates() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("not-a-dir");
    fs::write(&blocker, "file in the way").unwrap();

    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        StaticSource::new(vec![offer("ivy", None)], &blocker),
        FileOutput::new("binance_p2p", RecordFormat::Text),
        Arc::new(MemoryDiagnostics::new()),
    );
    let params = FetchParams::resolve(None, Some(blocker.join("offers").as_path())).unwrap();

    assert!(fetcher.run(&params).await.is_err());
}

#[tokio::test]
async fn target_that_is_a_file_fails_before_extraction() {
    let root = tempfile::tempdir().unwrap();
    let target = root.path().join("offers");
    fs::write(&target, "not a directory").unwrap();

    let source = StaticSource::new(vec![offer("jack", None)], &target);
    let extracted = source.directory_existed.clone();
    let mut fetcher = OfferFetcher::new(
        "binance_p2p",
        source,
        FileOutput::new("binance_p2p", RecordFormat::Text),
        Arc::new(MemoryDiagnostics::new()),
    );
    let phase = fetcher.watch_phase();
    let params = FetchParams::resolve(None, Some(target.as_path())).unwrap();

    assert!(matches!(fetcher.run(&params).await, Err(Error::Io(_))));
    assert_eq!(*extracted.lock().unwrap(), None);
    assert_eq!(*phase.borrow(), RunPhase::NotStarted);
    assert_eq!(fs::read_to_string(&target).unwrap(), "not a directory");
}
