use super::{Browser, BrowserSession, Viewport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;
use url::Url;

/// Chrome driven over the WebDriver protocol (chromedriver, selenium grid).
#[derive(Debug, Clone)]
pub struct WebDriverBrowser {
    endpoint: String,
    headless: bool,
}

impl WebDriverBrowser {
    pub fn new(endpoint: impl Into<String>, headless: bool) -> Self {
        Self {
            endpoint: endpoint.into(),
            headless,
        }
    }

    fn chrome_args(&self, viewport: Viewport) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless".to_string());
        }
        args.push("--disable-gpu".to_string());
        args.push(format!("--window-size={},{}", viewport.width, viewport.height));
        args
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open(&self, viewport: Viewport) -> Result<Box<dyn BrowserSession>> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": self.chrome_args(viewport) }),
        );

        log::debug!("Opening WebDriver session at {}", self.endpoint);
        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = builder
            .connect(&self.endpoint)
            .await
            .map_err(|e| Error::Browser(format!("{}: {}", self.endpoint, e)))?;

        Ok(Box::new(WebDriverSession { client }))
    }
}

pub struct WebDriverSession {
    client: Client,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.client
            .goto(url.as_str())
            .await
            .map_err(|e| Error::Navigation(format!("{}: {}", url, e)))
    }

    async fn wait_for(&mut self, css: &str, timeout: Duration) -> Result<()> {
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await
            .map(|_| ())
            .map_err(|e| Error::Browser(format!("waiting for '{}': {}", css, e)))
    }

    async fn page_source(&mut self) -> Result<String> {
        self.client
            .source()
            .await
            .map_err(|e| Error::Browser(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| Error::Browser(format!("closing session: {}", e)))
    }
}
