use crate::browser::{Browser, BrowserSession};
use crate::config::MarketplaceConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::offer::{ExtractedOffer, FieldKind};
use crate::page::{HtmlOfferPage, OfferPage, OfferSelectors};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Produces the batch of offers for one trading pair.
///
/// Implementations never fail: problems are reported through diagnostics
/// and yield a partial or empty batch.
#[async_trait]
pub trait OfferSource: Send + Sync {
    async fn extract(&self, trading_pair: &str) -> Vec<ExtractedOffer>;
}

pub struct OfferExtractor<B: Browser> {
    browser: B,
    marketplace: MarketplaceConfig,
    selectors: OfferSelectors,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<B: Browser> OfferExtractor<B> {
    pub fn new(
        browser: B,
        marketplace: MarketplaceConfig,
        selectors: OfferSelectors,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            browser,
            marketplace,
            selectors,
            diagnostics,
        }
    }

    /// Navigates and returns the page source once offers have rendered.
    async fn render(&self, session: &mut dyn BrowserSession, url: &Url) -> Result<String> {
        self.diagnostics.info(&format!("Navigating to {}", url));

        let timeout = self.marketplace.navigation_timeout();
        match tokio::time::timeout(timeout, session.navigate(url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Navigation(format!(
                    "{} did not load within {:?}",
                    url, timeout
                )));
            }
        }

        let container = self.selectors.container.to_css_string();
        if let Err(e) = session
            .wait_for(&container, self.marketplace.render_timeout())
            .await
        {
            // Read whatever rendered; an empty page simply yields no offers.
            self.diagnostics
                .error(&format!("Offer list did not render: {}", e));
        }

        session.page_source().await
    }

    fn parse(&self, html: &str, trading_pair: &str) -> Vec<ExtractedOffer> {
        let page = HtmlOfferPage::new(html, &self.selectors);
        let mut offers = Vec::new();

        for (index, container) in page.offer_containers().into_iter().enumerate() {
            let offer = read_offer(&page, container, trading_pair);
            for (kind, failure) in offer.failures() {
                self.diagnostics.error(&format!(
                    "Error extracting {} of offer #{}: {}",
                    kind, index, failure
                ));
            }
            log::debug!("Extracted offer #{}: {:?}", index, offer);
            offers.push(offer);
        }

        offers
    }
}

/// Reads every field of one container; each field fails independently.
pub fn read_offer<P: OfferPage>(
    page: &P,
    container: P::Container<'_>,
    trading_pair: &str,
) -> ExtractedOffer {
    ExtractedOffer {
        seller: page.field_within(container, FieldKind::Seller),
        price: page.field_within(container, FieldKind::Price),
        min_amount: page.field_within(container, FieldKind::MinAmount),
        max_amount: page.field_within(container, FieldKind::MaxAmount),
        payment_methods: page.fields_within(container, FieldKind::PaymentMethod),
        trading_pair: trading_pair.to_string(),
    }
}

#[async_trait]
impl<B: Browser> OfferSource for OfferExtractor<B> {
    async fn extract(&self, trading_pair: &str) -> Vec<ExtractedOffer> {
        let url = match self.marketplace.url_for(trading_pair) {
            Ok(url) => url,
            Err(e) => {
                self.diagnostics
                    .error(&format!("Cannot build offer URL for '{}': {}", trading_pair, e));
                return Vec::new();
            }
        };

        let mut session = match self.browser.open(self.marketplace.viewport).await {
            Ok(session) => session,
            Err(e) => {
                self.diagnostics
                    .error(&format!("Cannot start browser session: {}", e));
                return Vec::new();
            }
        };

        let offers = match self.render(session.as_mut(), &url).await {
            Ok(html) => self.parse(&html, trading_pair),
            Err(e) => {
                self.diagnostics
                    .error(&format!("Error navigating to {}: {}", url, e));
                Vec::new()
            }
        };

        if let Err(e) = session.close().await {
            self.diagnostics.error(&format!("{}", e));
        }

        self.diagnostics
            .info(&format!("Extracted {} offers for {}", offers.len(), trading_pair));
        offers
    }
}
