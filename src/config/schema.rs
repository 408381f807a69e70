use crate::browser::Viewport;
use crate::error::Result;
use crate::fetcher::FetchParams;
use crate::output::RecordFormat;
use crate::page::OfferSelectors;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

pub const PAIR_PLACEHOLDER: &str = "{pair}";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FetchConfig {
    /// Run name reported to progress callbacks and used as the file prefix.
    #[serde(default = "default_name")]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default = "default_trading_pair")]
    #[validate(length(min = 1))]
    pub trading_pair: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "target_directory must be set"))]
    pub target_directory: String,

    #[serde(default)]
    pub record_format: RecordFormat,

    #[serde(default)]
    #[validate]
    pub marketplace: MarketplaceConfig,

    #[serde(default)]
    pub selectors: OfferSelectors,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

impl FetchConfig {
    pub fn params(&self) -> Result<FetchParams> {
        FetchParams::resolve(
            Some(&self.trading_pair),
            Some(Path::new(&self.target_directory)),
        )
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            trading_pair: default_trading_pair(),
            target_directory: String::new(),
            record_format: RecordFormat::default(),
            marketplace: MarketplaceConfig::default(),
            selectors: OfferSelectors::default(),
            extends: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MarketplaceConfig {
    /// Offer page address; `{pair}` is replaced by the trading pair.
    #[serde(default = "default_url_template")]
    #[validate(custom = "validate_url_template")]
    pub url_template: String,

    #[serde(default = "default_webdriver_url")]
    #[validate(url)]
    pub webdriver_url: String,

    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default)]
    pub viewport: Viewport,

    #[serde(default = "default_navigation_timeout")]
    #[validate(range(min = 1))]
    pub navigation_timeout_ms: u64,

    /// How long to wait for the first offer container to render.
    #[serde(default = "default_render_timeout")]
    pub render_timeout_ms: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            viewport: Viewport::default(),
            navigation_timeout_ms: default_navigation_timeout(),
            render_timeout_ms: default_render_timeout(),
        }
    }
}

impl MarketplaceConfig {
    pub fn url_for(&self, trading_pair: &str) -> Result<Url> {
        Ok(Url::parse(&self.url_template.replace(PAIR_PLACEHOLDER, trading_pair))?)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

fn validate_url_template(template: &str) -> std::result::Result<(), ValidationError> {
    if !template.contains(PAIR_PLACEHOLDER) {
        return Err(ValidationError::new("missing_pair_placeholder"));
    }
    Url::parse(&template.replace(PAIR_PLACEHOLDER, "BTC_USDT"))
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_url"))
}

pub(crate) fn default_name() -> String {
    "binance_p2p".to_string()
}

pub(crate) fn default_trading_pair() -> String {
    "BTC_USDT".to_string()
}

pub(crate) fn default_url_template() -> String {
    "https://p2p.binance.com/en/trade/{pair}".to_string()
}

pub(crate) fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_headless() -> bool {
    true
}

pub(crate) fn default_navigation_timeout() -> u64 {
    30_000
}

pub(crate) fn default_render_timeout() -> u64 {
    5_000
}
