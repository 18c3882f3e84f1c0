// src/core/position.rs
use crate::connectors::traits::OrderGateway;
use crate::error::StrategyError;
use crate::types::{
    OrderOutcome, OrderRequest, OrderResult, OrderType, Position, Side, TimeInForce,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

/// Sends MARKET orders and turns whatever comes back into an `OrderResult`.
pub struct OrderDispatcher {
    gateway: Arc<dyn OrderGateway>,
    symbol: String,
    quote: String,
}

impl OrderDispatcher {
    pub fn new(gateway: Arc<dyn OrderGateway>, symbol: String, quote: String) -> Self {
        Self {
            gateway,
            symbol,
            quote,
        }
    }

    /// `reference_price` is the price the decision was made on. The gateway
    /// uses it to size a quote-denominated BUY.
    pub async fn submit_buy(&self, quantity: Decimal, reference_price: Decimal) -> OrderResult {
        self.submit(Side::Buy, quantity, reference_price).await
    }

    pub async fn submit_sell(&self, quantity: Decimal, reference_price: Decimal) -> OrderResult {
        self.submit(Side::Sell, quantity, reference_price).await
    }

    async fn submit(&self, side: Side, quantity: Decimal, reference_price: Decimal) -> OrderResult {
        let request = OrderRequest {
            symbol: self.symbol.clone(),
            quote: self.quote.clone(),
            side,
            quantity,
            reference_price,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Gtc,
        };

        info!("Placing {} order for {} {} at market", side, quantity, self.symbol);

        // Only code 0 confirms. Transport errors and any other code are failures.
        let outcome = match self.gateway.place_order(&request).await {
            Ok(reply) if reply.code == 0 => {
                let order_id = reply.order_id.unwrap_or_else(|| "N/A".to_string());
                info!("✅ {} order confirmed. Order ID: {}", side, order_id);
                OrderOutcome::Confirmed { order_id }
            }
            Ok(reply) => {
                let reason = format!(
                    "status code {}: {}",
                    reply.code,
                    reply.message.as_deref().unwrap_or("no message")
                );
                error!("{} order rejected ({})", side, reason);
                OrderOutcome::Failed { reason }
            }
            Err(e) => {
                error!("⚠️ {} order transport error: {:#}", side, e);
                OrderOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        };

        OrderResult { request, outcome }
    }
}

/// Owns the single position slot. The only mutator of `Position`.
#[derive(Debug, Default)]
pub struct PositionStateMachine {
    position: Position,
}

impl PositionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Moves the slot on a confirmed order, otherwise leaves it and returns
    /// `OrderFailed`.
    pub fn apply_result(
        &mut self,
        side: Side,
        result: &OrderResult,
    ) -> Result<Position, StrategyError> {
        match &result.outcome {
            OrderOutcome::Confirmed { .. } => {
                let previous = self.position;
                self.position = match side {
                    Side::Buy => Position::Long,
                    Side::Sell => Position::Flat,
                };
                info!("Position {} -> {}", previous, self.position);
                Ok(self.position)
            }
            OrderOutcome::Failed { reason } => {
                error!("{} order failed. Position remains {}.", side, self.position);
                Err(StrategyError::OrderFailed {
                    side,
                    reason: reason.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ScriptedGateway;
    use rust_decimal_macros::dec;

    fn dispatcher(gateway: Arc<ScriptedGateway>) -> OrderDispatcher {
        OrderDispatcher::new(gateway, "BTC".into(), "USDT".into())
    }

    fn result(side: Side, outcome: OrderOutcome) -> OrderResult {
        OrderResult {
            request: OrderRequest {
                symbol: "BTC".into(),
                quote: "USDT".into(),
                side,
                quantity: dec!(0.0005),
                reference_price: dec!(64000),
                order_type: OrderType::Market,
                time_in_force: TimeInForce::Gtc,
            },
            outcome,
        }
    }

    fn confirmed(side: Side) -> OrderResult {
        result(side, OrderOutcome::Confirmed { order_id: "1".into() })
    }

    fn failed(side: Side) -> OrderResult {
        result(side, OrderOutcome::Failed { reason: "rejected".into() })
    }

    #[test]
    fn starts_flat() {
        assert_eq!(PositionStateMachine::new().position(), Position::Flat);
    }

    #[test]
    fn confirmed_buy_then_sell_round_trips() {
        let mut sm = PositionStateMachine::new();
        assert_eq!(sm.apply_result(Side::Buy, &confirmed(Side::Buy)), Ok(Position::Long));
        assert_eq!(sm.apply_result(Side::Sell, &confirmed(Side::Sell)), Ok(Position::Flat));
    }

    #[test]
    fn failed_orders_are_self_loops() {
        let mut sm = PositionStateMachine::new();
        let err = sm.apply_result(Side::Buy, &failed(Side::Buy)).unwrap_err();
        assert!(matches!(err, StrategyError::OrderFailed { side: Side::Buy, .. }));
        assert_eq!(sm.position(), Position::Flat);

        sm.apply_result(Side::Buy, &confirmed(Side::Buy)).unwrap();
        assert!(sm.apply_result(Side::Sell, &failed(Side::Sell)).is_err());
        assert_eq!(sm.position(), Position::Long);
    }

    #[tokio::test]
    async fn zero_code_is_confirmed_market_order() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(0, Some("abc"), None);

        let res = dispatcher(gateway.clone()).submit_buy(dec!(0.0005), dec!(64000)).await;
        assert_eq!(res.outcome, OrderOutcome::Confirmed { order_id: "abc".into() });

        let sent = gateway.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].side, Side::Buy);
        assert_eq!(sent[0].order_type, OrderType::Market);
        assert_eq!(sent[0].quantity, dec!(0.0005));
        assert_eq!(sent[0].reference_price, dec!(64000));
    }

    #[tokio::test]
    async fn confirmed_without_id_uses_placeholder() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(0, None, None);
        let res = dispatcher(gateway).submit_sell(dec!(1), dec!(100)).await;
        assert_eq!(res.outcome, OrderOutcome::Confirmed { order_id: "N/A".into() });
    }

    #[tokio::test]
    async fn non_zero_code_and_transport_error_fail() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_reply(21721, None, Some("Insufficient balance"));
        gateway.push_transport_error("connection reset");
        let d = dispatcher(gateway);

        let rejected = d.submit_sell(dec!(1), dec!(100)).await;
        match rejected.outcome {
            OrderOutcome::Failed { reason } => assert!(reason.contains("21721")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(d.submit_buy(dec!(1), dec!(100)).await.order_id(), None);
    }
}
