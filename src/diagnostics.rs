use log::Level;
use std::sync::Mutex;

/// Sink for the human-readable messages the pipeline emits.
///
/// Components receive it as `Arc<dyn Diagnostics>` instead of reaching for a
/// global, so a host can route or capture the trail of a single run.
pub trait Diagnostics: Send + Sync {
    fn record(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn record(&self, level: Level, message: &str) {
        log::log!(target: "p2p_offers", level, "{}", message);
    }
}

/// Keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<(Level, String)>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries().iter().filter(|(l, _)| *l == level).count()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn record(&self, level: Level, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((level, message.to_string()));
    }
}
