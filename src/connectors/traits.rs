// src/connectors/traits.rs
use crate::types::{Candle, GatewayReply, OrderRequest, Timeframe};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest traded price for `symbol`/`quote`.
    async fn get_price(&self, symbol: &str, quote: &str) -> Result<Decimal>;

    /// Up to `limit` recent candles. Order is whatever the venue returns.
    async fn get_candles(
        &self,
        symbol: &str,
        quote: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// `Err` means transport failure; a rejected order is `Ok` with a non-zero code.
    async fn place_order(&self, request: &OrderRequest) -> Result<GatewayReply>;
}
