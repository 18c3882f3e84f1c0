// src/connectors/poloniex.rs
use crate::config::Credentials;
use crate::connectors::messages::{
    parse_candle_row, ApiError, NewOrder, OrderAck, PriceResponse, ServerTime,
};
use crate::connectors::traits::{MarketDataProvider, OrderGateway};
use crate::types::{Candle, GatewayReply, OrderRequest, Timeframe};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use std::str::FromStr;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

const ORDERS_PATH: &str = "/orders";

/// REST client for the Poloniex v3 spot API. Serves both market data and
/// order placement.
#[derive(Clone)]
pub struct PoloniexClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
    amount_step: Decimal,
}

impl PoloniexClient {
    pub fn new(credentials: &Credentials, base_rest_url: impl Into<String>) -> Self {
        Self {
            api_key: credentials.api_key.clone(),
            secret_key: credentials.secret_key.clone(),
            http_client: Client::new(),
            base_rest_url: base_rest_url.into().trim_end_matches('/').to_string(),
            amount_step: Decimal::new(1, 2),
        }
    }

    /// Lot size for quote-denominated MARKET BUY amounts.
    pub fn with_amount_step(mut self, amount_step: Decimal) -> Self {
        self.amount_step = amount_step;
        self
    }

    /// Fails when the venue is unreachable.
    pub async fn connect(&self) -> Result<()> {
        let url = format!("{}/timestamp", self.base_rest_url);
        let time = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<ServerTime>()
            .await?;
        info!("Connected to Poloniex (server time {})", time.server_time);
        Ok(())
    }

    fn market(symbol: &str, quote: &str) -> String {
        format!("{}_{}", symbol.to_uppercase(), quote.to_uppercase())
    }

    /// Base64 HMAC-SHA256 over `METHOD\nPATH\nrequestBody=...&signTimestamp=...`.
    fn sign(&self, method: &str, path: &str, body: &str, timestamp: &str) -> Result<String> {
        let payload = format!(
            "{}\n{}\nrequestBody={}&signTimestamp={}",
            method, path, body, timestamp
        );

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .context("Invalid secret key length")?;
        mac.update(payload.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl MarketDataProvider for PoloniexClient {
    async fn get_price(&self, symbol: &str, quote: &str) -> Result<Decimal> {
        let market = Self::market(symbol, quote);
        let url = format!("{}/markets/{}/price", self.base_rest_url, market);

        let resp = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<PriceResponse>()
            .await?;

        let price_str = resp
            .price
            .ok_or_else(|| anyhow!("Failed to parse price for {}", market))?;
        let price = Decimal::from_str(&price_str)
            .with_context(|| format!("Malformed price '{}' for {}", price_str, market))?;

        debug!("{} last price {}", resp.symbol.as_deref().unwrap_or(&market), price);
        Ok(price)
    }

    async fn get_candles(
        &self,
        symbol: &str,
        quote: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let market = Self::market(symbol, quote);
        let query = serde_urlencoded::to_string([
            ("interval", timeframe.exchange_interval().to_string()),
            ("limit", limit.to_string()),
        ])?;
        let url = format!("{}/markets/{}/candles?{}", self.base_rest_url, market, query);

        let rows = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Vec<Value>>>()
            .await?;

        rows.iter()
            .map(|row| parse_candle_row(row))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Malformed candles for {}", market))
    }
}

#[async_trait]
impl OrderGateway for PoloniexClient {
    async fn place_order(&self, request: &OrderRequest) -> Result<GatewayReply> {
        let market = Self::market(&request.symbol, &request.quote);
        let order = NewOrder::market(
            &market,
            request.side,
            request.quantity,
            request.reference_price,
            self.amount_step,
            uuid::Uuid::new_v4().simple().to_string(),
        )?;
        let body = serde_json::to_string(&order)?;
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign("POST", ORDERS_PATH, &body, &timestamp)?;

        info!(
            "Sending order: {} {} (quantity {:?}, amount {:?})",
            order.side, market, order.quantity, order.amount
        );

        let response = self
            .http_client
            .post(format!("{}{}", self.base_rest_url, ORDERS_PATH))
            .header("Content-Type", "application/json")
            .header("key", &self.api_key)
            .header("signatureMethod", "hmacSHA256")
            .header("signatureVersion", "2")
            .header("signTimestamp", &timestamp)
            .header("signature", signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            let ack: OrderAck = serde_json::from_str(&text)
                .with_context(|| format!("Unexpected order reply: {}", text))?;
            return Ok(GatewayReply {
                code: 0,
                order_id: Some(ack.id),
                message: None,
            });
        }

        warn!("Order rejected with HTTP {}: {}", status, text);
        let reply = match serde_json::from_str::<ApiError>(&text) {
            Ok(err) => GatewayReply {
                // A zero code on an HTTP error still counts as a rejection.
                code: if err.code == 0 { i64::from(status.as_u16()) } else { err.code },
                order_id: None,
                message: err.message,
            },
            Err(_) => GatewayReply {
                code: i64::from(status.as_u16()),
                order_id: None,
                message: Some(text),
            },
        };
        Ok(reply)
    }
}
