use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder stored for any text field the page did not yield.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Seller,
    Price,
    MinAmount,
    MaxAmount,
    PaymentMethod,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Seller => "seller",
            FieldKind::Price => "price",
            FieldKind::MinAmount => "min_amount",
            FieldKind::MaxAmount => "max_amount",
            FieldKind::PaymentMethod => "payment_methods",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFailure {
    /// No element matched the field's selector inside the container.
    Missing,
    Unreadable(String),
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFailure::Missing => f.write_str("element not found"),
            FieldFailure::Unreadable(reason) => write!(f, "unreadable: {}", reason),
        }
    }
}

/// Result of reading one field of one offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome<T> {
    Found(T),
    Failed(FieldFailure),
}

impl<T> FieldOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, FieldOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&FieldFailure> {
        match self {
            FieldOutcome::Found(_) => None,
            FieldOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn unwrap_or_else(self, fallback: impl FnOnce() -> T) -> T {
        match self {
            FieldOutcome::Found(value) => value,
            FieldOutcome::Failed(_) => fallback(),
        }
    }
}

/// One offer as read from the page, before sentinel substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedOffer {
    pub seller: FieldOutcome<String>,
    pub price: FieldOutcome<String>,
    pub min_amount: FieldOutcome<String>,
    pub max_amount: FieldOutcome<String>,
    pub payment_methods: FieldOutcome<Vec<String>>,
    pub trading_pair: String,
}

impl ExtractedOffer {
    /// Fields that could not be read, in record order.
    pub fn failures(&self) -> Vec<(FieldKind, &FieldFailure)> {
        [
            (FieldKind::Seller, self.seller.failure()),
            (FieldKind::Price, self.price.failure()),
            (FieldKind::MinAmount, self.min_amount.failure()),
            (FieldKind::MaxAmount, self.max_amount.failure()),
            (FieldKind::PaymentMethod, self.payment_methods.failure()),
        ]
        .into_iter()
        .filter_map(|(kind, failure)| failure.map(|f| (kind, f)))
        .collect()
    }

    pub fn into_record(self) -> OfferRecord {
        let unknown = || UNKNOWN.to_string();
        OfferRecord {
            seller: self.seller.unwrap_or_else(unknown),
            price: self.price.unwrap_or_else(unknown),
            min_amount: self.min_amount.unwrap_or_else(unknown),
            max_amount: self.max_amount.unwrap_or_else(unknown),
            payment_methods: self.payment_methods.unwrap_or_else(Vec::new),
            trading_pair: self.trading_pair,
        }
    }
}

/// The persisted shape of an offer. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub seller: String,
    pub price: String,
    pub min_amount: String,
    pub max_amount: String,
    pub payment_methods: Vec<String>,
    pub trading_pair: String,
}
