use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub mod webdriver;

pub use webdriver::{WebDriverBrowser, WebDriverSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Factory for rendering sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, viewport: Viewport) -> Result<Box<dyn BrowserSession>>;
}

/// One live rendering session.
///
/// `close` consumes the session; callers must reach it on every path once
/// `open` has succeeded.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// Blocks until an element matching `css` is present or `timeout` elapses.
    async fn wait_for(&mut self, css: &str, timeout: Duration) -> Result<()>;

    async fn page_source(&mut self) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}
