//! Quote Engine
//!
//! Pure estimation of an intended trade's outcome from current prices.
//! Nothing here submits orders; every figure is approximate and actual
//! fills may differ.

use crate::market::PairDirection;
use serde::Serialize;

pub const CONFIRM_HINT: &str = "Add --confirm to execute this trade";
pub const CONFIRM_HINT_TWO_STEP: &str = "Add --confirm to execute (2 transactions)";

/// Estimated receive amount for a single-leg trade.
///
/// Direct (selling the base): receive = amount x price.
/// Reverse (spending the quote): receive = amount / price.
pub fn single_leg_receive(amount: f64, price: f64, direction: PairDirection) -> f64 {
    match direction {
        PairDirection::Direct => amount * price,
        PairDirection::Reverse => amount / price,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BridgedEstimate {
    /// Bridge-asset proceeds of leg 1.
    pub bridge_amount: f64,
    /// Target-asset receive of leg 2.
    pub receive: f64,
}

/// Composition for a two-leg route: sell into the bridge asset, then buy
/// the target with those proceeds.
pub fn bridged_receive(amount: f64, sell_price: f64, buy_price: f64) -> BridgedEstimate {
    let bridge_amount = amount * sell_price;
    BridgedEstimate {
        bridge_amount,
        receive: bridge_amount / buy_price,
    }
}

// ==========================================
// Preview payloads
// ==========================================

/// Non-committing description of a planned action. Returning one of these
/// never causes a state change.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Preview {
    Trade(TradePreview),
    Swap(SwapPreview),
    BridgedSwap(BridgedSwapPreview),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePreview {
    pub preview: bool,
    pub action: String,
    pub symbol: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub order_type: String,
    pub limit_price: Option<f64>,
    pub current_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_proceeds: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapPreview {
    pub preview: bool,
    pub action: String,
    pub from: String,
    pub to: String,
    pub pair: String,
    pub direction: String,
    pub price: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgedSwapPreview {
    pub preview: bool,
    pub action: String,
    pub from: String,
    pub to: String,
    pub route: String,
    pub step1: String,
    pub step2: String,
    pub message: String,
}
