// src/connectors/paper.rs
use crate::connectors::traits::OrderGateway;
use crate::types::{GatewayReply, OrderRequest};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Confirms every order locally. Used when live trading is off.
#[derive(Debug, Default)]
pub struct PaperGateway;

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn place_order(&self, request: &OrderRequest) -> Result<GatewayReply> {
        let order_id = format!("paper-{}", uuid::Uuid::new_v4().simple());
        info!(
            "Paper {}: {} {}/{} (id {})",
            request.side, request.quantity, request.symbol, request.quote, order_id
        );
        Ok(GatewayReply {
            code: 0,
            order_id: Some(order_id),
            message: None,
        })
    }
}
