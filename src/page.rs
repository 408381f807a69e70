use crate::offer::{FieldFailure, FieldKind, FieldOutcome};
use crate::selector::ElementSelector;
use select::document::Document;
use select::node::Node;
use serde::{Deserialize, Serialize};

/// Where each part of an offer lives on the marketplace page.
///
/// Field selectors are evaluated inside an offer container. When
/// `min_amount` and `max_amount` point at the same element kind, the minimum
/// is the first match and the maximum the last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSelectors {
    #[serde(default = "default_container")]
    pub container: ElementSelector,
    #[serde(default = "default_seller")]
    pub seller: ElementSelector,
    #[serde(default = "default_price")]
    pub price: ElementSelector,
    #[serde(default = "default_amount")]
    pub min_amount: ElementSelector,
    #[serde(default = "default_amount")]
    pub max_amount: ElementSelector,
    #[serde(default = "default_payment_method")]
    pub payment_method: ElementSelector,
}

impl Default for OfferSelectors {
    fn default() -> Self {
        Self {
            container: default_container(),
            seller: default_seller(),
            price: default_price(),
            min_amount: default_amount(),
            max_amount: default_amount(),
            payment_method: default_payment_method(),
        }
    }
}

impl OfferSelectors {
    pub fn for_field(&self, kind: FieldKind) -> &ElementSelector {
        match kind {
            FieldKind::Seller => &self.seller,
            FieldKind::Price => &self.price,
            FieldKind::MinAmount => &self.min_amount,
            FieldKind::MaxAmount => &self.max_amount,
            FieldKind::PaymentMethod => &self.payment_method,
        }
    }
}

fn default_container() -> ElementSelector {
    ElementSelector::class("css-1sv7ku3")
}

fn default_seller() -> ElementSelector {
    ElementSelector::class("css-1gw9lzm")
}

fn default_price() -> ElementSelector {
    ElementSelector::class("css-1uvkrz3")
}

fn default_amount() -> ElementSelector {
    ElementSelector::class("css-1w0m5x8")
}

fn default_payment_method() -> ElementSelector {
    ElementSelector::class("css-1pm6sv3")
}

/// Query capability over a rendered marketplace page.
pub trait OfferPage {
    type Container<'a>: Copy
    where
        Self: 'a;

    /// Offer containers in page order.
    fn offer_containers(&self) -> Vec<Self::Container<'_>>;

    /// Text of a single-valued field inside `container`.
    fn field_within(&self, container: Self::Container<'_>, kind: FieldKind) -> FieldOutcome<String>;

    /// Texts of every element of a list-valued field inside `container`.
    fn fields_within(
        &self,
        container: Self::Container<'_>,
        kind: FieldKind,
    ) -> FieldOutcome<Vec<String>>;
}

/// [`OfferPage`] over page source captured from the browser.
pub struct HtmlOfferPage<'s> {
    document: Document,
    selectors: &'s OfferSelectors,
}

impl<'s> HtmlOfferPage<'s> {
    pub fn new(html: &str, selectors: &'s OfferSelectors) -> Self {
        Self {
            document: Document::from(html),
            selectors,
        }
    }

    fn matches_within<'a>(&self, container: Node<'a>, kind: FieldKind) -> Vec<Node<'a>> {
        container.find(self.selectors.for_field(kind)).collect()
    }
}

impl<'s> OfferPage for HtmlOfferPage<'s> {
    type Container<'a>
        = Node<'a>
    where
        Self: 'a;

    fn offer_containers(&self) -> Vec<Node<'_>> {
        self.document.find(&self.selectors.container).collect()
    }

    fn field_within(&self, container: Node<'_>, kind: FieldKind) -> FieldOutcome<String> {
        let matches = self.matches_within(container, kind);
        let node = match kind {
            FieldKind::MaxAmount => matches.last(),
            _ => matches.first(),
        };
        match node.map(|n| n.text().trim().to_string()) {
            Some(text) if text.is_empty() => FieldOutcome::Failed(FieldFailure::Unreadable(
                "element has no text".to_string(),
            )),
            Some(text) => FieldOutcome::Found(text),
            None => FieldOutcome::Failed(FieldFailure::Missing),
        }
    }

    /// An offer without matching elements simply has an empty list.
    fn fields_within(&self, container: Node<'_>, kind: FieldKind) -> FieldOutcome<Vec<String>> {
        let texts = self
            .matches_within(container, kind)
            .iter()
            .map(|n| n.text().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();
        FieldOutcome::Found(texts)
    }
}
