use super::{OfferWriter, RecordFormat};
use crate::error::Result;
use crate::offer::{OfferRecord, UNKNOWN};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAX_SELLER_LEN: usize = 64;

/// One file per offer, named `{tag}_{seller}_{unix_seconds}.{ext}`.
///
/// Files are opened with create-new semantics; when the name is taken
/// (same seller within the same second) `_1`, `_2`, ... is appended.
pub struct FileOutput {
    source_tag: String,
    format: RecordFormat,
}

impl FileOutput {
    pub fn new(source_tag: impl Into<String>, format: RecordFormat) -> Self {
        Self {
            source_tag: source_tag.into(),
            format,
        }
    }

    pub fn file_stem(&self, seller: &str, timestamp: i64) -> String {
        format!("{}_{}_{}", self.source_tag, sanitize(seller), timestamp)
    }

    pub fn render(&self, record: &OfferRecord) -> Result<String> {
        match self.format {
            RecordFormat::Json => Ok(serde_json::to_string_pretty(record)?),
            RecordFormat::Text => {
                let mut out = String::new();
                // String formatting cannot fail
                let _ = writeln!(out, "seller: {:?}", record.seller);
                let _ = writeln!(out, "price: {:?}", record.price);
                let _ = writeln!(out, "min_amount: {:?}", record.min_amount);
                let _ = writeln!(out, "max_amount: {:?}", record.max_amount);
                let _ = writeln!(out, "payment_methods: {:?}", record.payment_methods);
                let _ = writeln!(out, "trading_pair: {:?}", record.trading_pair);
                Ok(out)
            }
        }
    }
}

fn sanitize(seller: &str) -> String {
    let cleaned: String = seller
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_SELLER_LEN)
        .collect();

    if cleaned.is_empty() {
        UNKNOWN.to_string()
    } else {
        cleaned
    }
}

/// Writes `contents` to a freshly created file, removing `path` again if the
/// write fails so no truncated record keeps the name.
fn fill(mut sink: impl Write, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Err(e) = sink.write_all(contents).and_then(|_| sink.flush()) {
        drop(sink);
        if let Err(cleanup) = std::fs::remove_file(path) {
            log::warn!("Could not remove partial file {}: {}", path.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl OfferWriter for FileOutput {
    async fn write(&self, record: &OfferRecord, directory: &Path) -> Result<PathBuf> {
        let contents = self.render(record)?;
        let stem = self.file_stem(&record.seller, chrono::Utc::now().timestamp());
        let ext = self.format.extension();

        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{}.{}", stem, ext),
                n => format!("{}_{}.{}", stem, n, ext),
            };
            let path = directory.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    fill(file, &path, contents.as_bytes())?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
