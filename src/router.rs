//! Swap Router
//!
//! Resolves an asset-to-asset conversion end to end: a single order when a
//! direct or reverse market exists, otherwise two sequential legs through
//! the bridge asset. Leg 2 is always sized by leg 1's realized proceeds,
//! never the pre-trade estimate, and a mid-route failure is reported with
//! exactly which legs completed and what amounts were realized. A two-leg
//! swap is not transactional; nothing here attempts to reverse leg 1.

use crate::client::{ClientError, Exchange};
use crate::executor::OrderExecutor;
use crate::format::format_qty;
use crate::gate::{self, Gated};
use crate::market::{AssetPair, MarketQuery, PairDirection};
use crate::quote::{
    bridged_receive, single_leg_receive, BridgedSwapPreview, Preview, SwapPreview, CONFIRM_HINT,
    CONFIRM_HINT_TWO_STEP,
};
use crate::types::{OrderKind, OrderSide, OrderSizing, OrderSpec};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// The dominant stable quote asset, used as the fixed intermediary for all
/// bridged swaps.
pub const BRIDGE_ASSET: &str = "USDT";

// ==========================================
// Error Types
// ==========================================

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("swap amount must be positive")]
    InvalidAmount,
    #[error("cannot find {0} pair")]
    NoMarket(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

// ==========================================
// Route planning
// ==========================================

#[derive(Debug, Clone)]
pub enum RoutePlan {
    Direct {
        pair: AssetPair,
        price: f64,
    },
    Bridged {
        sell_symbol: String,
        sell_price: f64,
        buy_symbol: String,
        buy_price: f64,
    },
}

// ==========================================
// Result Types
// ==========================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegReport {
    pub leg: usize,
    pub symbol: String,
    pub side: OrderSide,
    pub order_id: i64,
    pub input_amount: f64,
    pub output_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapErrorInfo {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub step1_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usdt_received: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapReport {
    pub success: bool,
    pub action: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    pub order_ids: Vec<i64>,
    pub legs: Vec<LegReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SwapErrorInfo>,
}

// ==========================================
// Router
// ==========================================

pub struct SwapRouter<'a, E: Exchange> {
    exchange: &'a E,
}

impl<'a, E: Exchange> SwapRouter<'a, E> {
    pub fn new(exchange: &'a E) -> Self {
        Self { exchange }
    }

    /// Resolve and (when confirmed) execute an asset-to-asset conversion.
    pub async fn swap(
        &self,
        from_asset: &str,
        to_asset: &str,
        amount: f64,
        confirmed: bool,
    ) -> Result<Gated<SwapReport>, SwapError> {
        if !(amount > 0.0) {
            return Err(SwapError::InvalidAmount);
        }

        let from = from_asset.to_uppercase();
        let to = to_asset.to_uppercase();

        let plan = self.plan(&from, &to).await?;
        let preview = self.preview(&plan, &from, &to, amount);

        gate::run(confirmed, preview, || self.execute(&plan, &from, &to, amount)).await
    }

    /// Pick a route: the direct/reverse market when one exists, otherwise
    /// two legs through the bridge asset. Swapping the bridge asset itself
    /// never bridges through itself: if no direct market exists for it,
    /// there is no route at all.
    pub async fn plan(&self, from: &str, to: &str) -> Result<RoutePlan, SwapError> {
        let market = MarketQuery::new(self.exchange);

        if let Some(pair) = market.resolve_pair(from, to).await? {
            let price = market
                .price_of(&pair.symbol)
                .await?
                .filter(|p| *p > 0.0)
                .ok_or_else(|| SwapError::NoMarket(pair.symbol.clone()))?;
            info!("Route {} -> {}: single leg on {}", from, to, pair.symbol);
            return Ok(RoutePlan::Direct { pair, price });
        }

        if from == BRIDGE_ASSET {
            return Err(SwapError::NoMarket(format!("{}{}", to, BRIDGE_ASSET)));
        }
        if to == BRIDGE_ASSET {
            return Err(SwapError::NoMarket(format!("{}{}", from, BRIDGE_ASSET)));
        }

        let sell_symbol = format!("{}{}", from, BRIDGE_ASSET);
        let sell_price = market
            .price_of(&sell_symbol)
            .await?
            .filter(|p| *p > 0.0)
            .ok_or_else(|| SwapError::NoMarket(sell_symbol.clone()))?;

        let buy_symbol = format!("{}{}", to, BRIDGE_ASSET);
        let buy_price = market
            .price_of(&buy_symbol)
            .await?
            .filter(|p| *p > 0.0)
            .ok_or_else(|| SwapError::NoMarket(buy_symbol.clone()))?;

        info!(
            "Route {} -> {}: bridged via {} ({} then {})",
            from, to, BRIDGE_ASSET, sell_symbol, buy_symbol
        );
        Ok(RoutePlan::Bridged {
            sell_symbol,
            sell_price,
            buy_symbol,
            buy_price,
        })
    }

    fn preview(&self, plan: &RoutePlan, from: &str, to: &str, amount: f64) -> Preview {
        match plan {
            RoutePlan::Direct { pair, price } => {
                let estimated = single_leg_receive(amount, *price, pair.direction);
                Preview::Swap(SwapPreview {
                    preview: true,
                    action: "SWAP".to_string(),
                    from: format!("{} {}", format_qty(amount), from),
                    to: format!("~{:.6} {}", estimated, to),
                    pair: pair.symbol.clone(),
                    direction: match pair.direction {
                        PairDirection::Direct => "SELL".to_string(),
                        PairDirection::Reverse => "BUY".to_string(),
                    },
                    price: *price,
                    message: CONFIRM_HINT.to_string(),
                })
            }
            RoutePlan::Bridged {
                sell_price,
                buy_price,
                ..
            } => {
                let est = bridged_receive(amount, *sell_price, *buy_price);
                Preview::BridgedSwap(BridgedSwapPreview {
                    preview: true,
                    action: format!("SWAP (via {})", BRIDGE_ASSET),
                    from: format!("{} {}", format_qty(amount), from),
                    to: format!("~{:.6} {}", est.receive, to),
                    route: format!("{} -> {} -> {}", from, BRIDGE_ASSET, to),
                    step1: format!(
                        "Sell {} {} -> ~{:.2} {}",
                        format_qty(amount),
                        from,
                        est.bridge_amount,
                        BRIDGE_ASSET
                    ),
                    step2: format!(
                        "Buy {} with ~{:.2} {}",
                        to, est.bridge_amount, BRIDGE_ASSET
                    ),
                    message: CONFIRM_HINT_TWO_STEP.to_string(),
                })
            }
        }
    }

    async fn execute(
        &self,
        plan: &RoutePlan,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<SwapReport, SwapError> {
        match plan {
            RoutePlan::Direct { pair, .. } => self.execute_direct(pair, from, to, amount).await,
            RoutePlan::Bridged {
                sell_symbol,
                buy_symbol,
                ..
            } => {
                self.execute_bridged(sell_symbol, buy_symbol, from, to, amount)
                    .await
            }
        }
    }

    async fn execute_direct(
        &self,
        pair: &AssetPair,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<SwapReport, SwapError> {
        let executor = OrderExecutor::new(self.exchange);

        // Direct: sell `amount` of the base. Reverse: buy the base by
        // spending `amount` of the quote, which is the from-asset.
        let spec = match pair.direction {
            PairDirection::Direct => OrderSpec {
                symbol: pair.symbol.clone(),
                side: OrderSide::Sell,
                kind: OrderKind::Market,
                sizing: OrderSizing::Base(amount),
            },
            PairDirection::Reverse => OrderSpec {
                symbol: pair.symbol.clone(),
                side: OrderSide::Buy,
                kind: OrderKind::Market,
                sizing: OrderSizing::Quote(amount),
            },
        };

        let from_display = format!("{} {}", format_qty(amount), from);
        match executor.submit(&spec).await {
            Ok(result) => {
                let received = match pair.direction {
                    PairDirection::Direct => result.quote_qty,
                    PairDirection::Reverse => result.executed_qty,
                };
                Ok(SwapReport {
                    success: true,
                    action: "SWAP".to_string(),
                    from: from_display,
                    received: Some(format!("{} {}", format_qty(received), to)),
                    route: None,
                    order_ids: vec![result.order_id],
                    legs: vec![LegReport {
                        leg: 1,
                        symbol: pair.symbol.clone(),
                        side: spec.side,
                        order_id: result.order_id,
                        input_amount: amount,
                        output_amount: received,
                    }],
                    error: None,
                })
            }
            Err(ClientError::Rejected { code, msg }) => {
                warn!("Swap order on {} rejected: {} (code {})", pair.symbol, msg, code);
                Ok(SwapReport {
                    success: false,
                    action: "SWAP".to_string(),
                    from: from_display,
                    received: None,
                    route: None,
                    order_ids: Vec::new(),
                    legs: Vec::new(),
                    error: Some(SwapErrorInfo {
                        message: msg,
                        code: Some(code),
                        step1_complete: false,
                        usdt_received: None,
                    }),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn execute_bridged(
        &self,
        sell_symbol: &str,
        buy_symbol: &str,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<SwapReport, SwapError> {
        let executor = OrderExecutor::new(self.exchange);
        let route = format!("{} -> {} -> {}", from, BRIDGE_ASSET, to);
        let from_display = format!("{} {}", format_qty(amount), from);

        // Leg 1: sell into the bridge asset.
        let sell_spec = OrderSpec {
            symbol: sell_symbol.to_string(),
            side: OrderSide::Sell,
            kind: OrderKind::Market,
            sizing: OrderSizing::Base(amount),
        };
        let leg1 = match executor.submit(&sell_spec).await {
            Ok(result) => result,
            Err(ClientError::Rejected { code, msg }) => {
                warn!("Bridged swap aborted, leg 1 rejected: {} (code {})", msg, code);
                return Ok(SwapReport {
                    success: false,
                    action: "SWAP".to_string(),
                    from: from_display,
                    received: None,
                    route: Some(route),
                    order_ids: Vec::new(),
                    legs: Vec::new(),
                    error: Some(SwapErrorInfo {
                        message: format!("Step 1 failed: {}", msg),
                        code: Some(code),
                        step1_complete: false,
                        usdt_received: None,
                    }),
                });
            }
            Err(e) => return Err(e.into()),
        };

        // Leg 2 spends what leg 1 actually realized, not the estimate:
        // market execution may fill at a different amount than quoted.
        let realized = leg1.quote_qty;
        info!(
            "Leg 1 complete: {} {} -> {} {}",
            format_qty(amount),
            from,
            format_qty(realized),
            BRIDGE_ASSET
        );

        let leg1_report = LegReport {
            leg: 1,
            symbol: sell_symbol.to_string(),
            side: OrderSide::Sell,
            order_id: leg1.order_id,
            input_amount: amount,
            output_amount: realized,
        };

        let buy_spec = OrderSpec {
            symbol: buy_symbol.to_string(),
            side: OrderSide::Buy,
            kind: OrderKind::Market,
            sizing: OrderSizing::Quote(realized),
        };
        let leg2 = match executor.submit(&buy_spec).await {
            Ok(result) => result,
            Err(ClientError::Rejected { code, msg }) => {
                // Leg 1's proceeds remain in the account; the caller needs
                // the realized amount to complete or unwind manually.
                warn!(
                    "Bridged swap leg 2 rejected after leg 1 completed; {} {} realized",
                    format_qty(realized),
                    BRIDGE_ASSET
                );
                return Ok(SwapReport {
                    success: false,
                    action: "SWAP".to_string(),
                    from: from_display,
                    received: None,
                    route: Some(route),
                    order_ids: vec![leg1.order_id],
                    legs: vec![leg1_report],
                    error: Some(SwapErrorInfo {
                        message: format!("Step 2 failed: {}", msg),
                        code: Some(code),
                        step1_complete: true,
                        usdt_received: Some(realized),
                    }),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let received = leg2.executed_qty;
        Ok(SwapReport {
            success: true,
            action: "SWAP".to_string(),
            from: from_display,
            received: Some(format!("{} {}", format_qty(received), to)),
            route: Some(route),
            order_ids: vec![leg1.order_id, leg2.order_id],
            legs: vec![
                leg1_report,
                LegReport {
                    leg: 2,
                    symbol: buy_symbol.to_string(),
                    side: OrderSide::Buy,
                    order_id: leg2.order_id,
                    input_amount: realized,
                    output_amount: received,
                },
            ],
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExchange;

    fn eth_sol_market() -> MockExchange {
        // No direct ETH/SOL market in either direction.
        MockExchange::new(&[("ETHUSDT", 3000.0), ("SOLUSDT", 150.0)])
    }

    #[tokio::test]
    async fn test_direct_route_sells_base() {
        let exchange = MockExchange::new(&[("ETHBTC", 0.05)]);
        let router = SwapRouter::new(&exchange);

        let report = match router.swap("ETH", "BTC", 2.0, true).await.unwrap() {
            Gated::Executed(r) => r,
            Gated::Preview(_) => panic!("confirmed swap must execute"),
        };
        assert!(report.success);

        let orders = exchange.submitted();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].symbol, "ETHBTC");
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].sizing, OrderSizing::Base(2.0));
        assert_eq!(report.received.as_deref(), Some("0.1 BTC"));
    }

    #[tokio::test]
    async fn test_reverse_route_buys_with_quote_amount() {
        // BTC -> ETH with only ETHBTC listed: spend 0.1 BTC buying ETH.
        let exchange = MockExchange::new(&[("ETHBTC", 0.05)]);
        let router = SwapRouter::new(&exchange);

        let report = match router.swap("BTC", "ETH", 0.1, true).await.unwrap() {
            Gated::Executed(r) => r,
            Gated::Preview(_) => panic!("confirmed swap must execute"),
        };
        assert!(report.success);

        let orders = exchange.submitted();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, OrderSide::Buy);
        assert_eq!(orders[0].sizing, OrderSizing::Quote(0.1));
        // 0.1 BTC / 0.05 = 2 ETH received.
        assert_eq!(report.received.as_deref(), Some("2 ETH"));
    }

    #[tokio::test]
    async fn test_preview_never_mutates() {
        let exchange = eth_sol_market();
        let router = SwapRouter::new(&exchange);

        for _ in 0..3 {
            let outcome = router.swap("ETH", "SOL", 1.0, false).await.unwrap();
            assert!(outcome.is_preview());
        }
        assert!(exchange.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_bridged_preview_shape() {
        let exchange = eth_sol_market();
        let router = SwapRouter::new(&exchange);

        let preview = match router.swap("ETH", "SOL", 1.0, false).await.unwrap() {
            Gated::Preview(p) => p,
            Gated::Executed(_) => panic!("unconfirmed swap must not execute"),
        };
        match preview {
            Preview::BridgedSwap(p) => {
                assert_eq!(p.route, "ETH -> USDT -> SOL");
                assert!(p.step1.contains("~3000.00 USDT"));
                assert!(p.step2.contains("Buy SOL"));
                assert!(p.to.starts_with("~20.000000 SOL"));
            }
            _ => panic!("expected bridged preview"),
        }
    }

    #[tokio::test]
    async fn test_bridged_leg2_sized_by_realized_output() {
        // 3% slippage: leg 1 realizes 2910 USDT instead of the 3000 quoted.
        let exchange = eth_sol_market().with_fill_factor(0.97);
        let router = SwapRouter::new(&exchange);

        let report = match router.swap("ETH", "SOL", 1.0, true).await.unwrap() {
            Gated::Executed(r) => r,
            Gated::Preview(_) => panic!("confirmed swap must execute"),
        };
        assert!(report.success);

        let orders = exchange.submitted();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].symbol, "ETHUSDT");
        assert_eq!(orders[1].symbol, "SOLUSDT");
        match orders[1].sizing {
            OrderSizing::Quote(spent) => assert!((spent - 2910.0).abs() < 1e-6),
            _ => panic!("leg 2 must be sized by quote spend"),
        }
        assert_eq!(report.order_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_realized_bridge_amount() {
        let exchange = eth_sol_market().with_fill_factor(0.97).failing_on("SOLUSDT");
        let router = SwapRouter::new(&exchange);

        let report = match router.swap("ETH", "SOL", 1.0, true).await.unwrap() {
            Gated::Executed(r) => r,
            Gated::Preview(_) => panic!("confirmed swap must execute"),
        };
        assert!(!report.success);

        let error = report.error.unwrap();
        assert!(error.step1_complete);
        assert!((error.usdt_received.unwrap() - 2910.0).abs() < 1e-6);
        assert!(error.message.starts_with("Step 2 failed"));
        assert_eq!(report.legs.len(), 1);
        assert_eq!(report.order_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_leg1_failure_aborts_with_no_progress() {
        let exchange = eth_sol_market().failing_on("ETHUSDT");
        let router = SwapRouter::new(&exchange);

        let report = match router.swap("ETH", "SOL", 1.0, true).await.unwrap() {
            Gated::Executed(r) => r,
            Gated::Preview(_) => panic!("confirmed swap must execute"),
        };
        assert!(!report.success);

        let error = report.error.unwrap();
        assert!(!error.step1_complete);
        assert_eq!(error.usdt_received, None);
        assert!(error.message.starts_with("Step 1 failed"));
        assert!(report.legs.is_empty());
    }

    #[tokio::test]
    async fn test_bridge_asset_swap_degenerates_to_single_leg() {
        // USDT -> SOL resolves as the reverse of SOLUSDT; no self-bridge.
        let exchange = MockExchange::new(&[("SOLUSDT", 150.0)]);
        let router = SwapRouter::new(&exchange);

        let report = match router.swap("USDT", "SOL", 300.0, true).await.unwrap() {
            Gated::Executed(r) => r,
            Gated::Preview(_) => panic!("confirmed swap must execute"),
        };
        assert!(report.success);
        assert_eq!(exchange.submitted().len(), 1);
        assert_eq!(report.received.as_deref(), Some("2 SOL"));
    }

    #[tokio::test]
    async fn test_bridge_asset_without_market_has_no_route() {
        let exchange = MockExchange::new(&[]);
        let router = SwapRouter::new(&exchange);

        let err = router.swap("USDT", "ZZZ", 10.0, true).await.unwrap_err();
        assert!(matches!(err, SwapError::NoMarket(ref s) if s == "ZZZUSDT"));
        assert!(exchange.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected_before_any_call() {
        let exchange = eth_sol_market();
        let router = SwapRouter::new(&exchange);

        for amount in [0.0, -1.0, f64::NAN] {
            let err = router.swap("ETH", "SOL", amount, true).await.unwrap_err();
            assert!(matches!(err, SwapError::InvalidAmount));
        }
        assert!(exchange.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_missing_buy_pair_fails_before_execution() {
        let exchange = MockExchange::new(&[("ETHUSDT", 3000.0)]);
        let router = SwapRouter::new(&exchange);

        let err = router.swap("ETH", "ZZZ", 1.0, true).await.unwrap_err();
        assert!(matches!(err, SwapError::NoMarket(ref s) if s == "ZZZUSDT"));
        assert!(exchange.submitted().is_empty());
    }
}
