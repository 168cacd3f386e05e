use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::db_types::{OrderId, TransactionType, Wallet, WalletTransaction};

/// A single movement of money into or out of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub amount: Money,
    pub description: String,
    pub order_id: Option<OrderId>,
    /// Unique tag for the business event. A second entry with the same reference is refused.
    pub reference: Option<String>,
}

impl WalletEntry {
    pub fn new<S: Into<String>>(amount: Money, description: S) -> Self {
        Self { amount, description: description.into(), order_id: None, reference: None }
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// A manual credit or debit made by an administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAdjustment {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Money,
    pub description: String,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletView {
    pub wallet: Wallet,
    pub transactions: Vec<WalletTransaction>,
    pub page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralBonus {
    pub referrer: Money,
    pub referee: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralOutcome {
    pub referrer_id: String,
    pub referee_wallet: Wallet,
    pub bonus: ReferralBonus,
}

/// Number of pages needed to show `total` rows, `per_page` at a time. Always at least one.
pub fn page_count(total: i64, per_page: i64) -> i64 {
    if per_page <= 0 {
        return 1;
    }
    ((total + per_page - 1) / per_page).max(1)
}

/// Rows to skip to reach the 1-based `page`. Pages far past the end saturate, and simply come back empty.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(per_page.max(0))
}
