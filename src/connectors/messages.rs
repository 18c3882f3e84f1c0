// src/connectors/messages.rs
use crate::types::{Candle, Side};
use crate::utils::precision::normalize_quantity;
use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// `GET /markets/{symbol}/price`
#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    pub symbol: Option<String>,
    pub price: Option<String>,
}

/// `GET /timestamp`
#[derive(Debug, Deserialize)]
pub struct ServerTime {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

/// Body of `POST /orders`. Decimals travel as strings.
///
/// A MARKET BUY is sized in quote units (`amount`); every other order in
/// base units (`quantity`). Exactly one of the two is set.
#[derive(Debug, Serialize)]
pub struct NewOrder<'a> {
    pub symbol: &'a str,
    pub side: &'a str,
    #[serde(rename = "type")]
    pub order_type: &'a str,
    #[serde(rename = "timeInForce")]
    pub time_in_force: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
}

impl<'a> NewOrder<'a> {
    /// MARKET/GTC order. A BUY spends `quantity * reference_price` of the
    /// quote currency, floored to `amount_step`.
    pub fn market(
        symbol: &'a str,
        side: Side,
        quantity: Decimal,
        reference_price: Decimal,
        amount_step: Decimal,
        client_order_id: String,
    ) -> Result<Self> {
        let (side_str, quantity, amount) = match side {
            Side::Buy => {
                let amount = normalize_quantity(quantity * reference_price, amount_step);
                if amount <= Decimal::ZERO {
                    return Err(anyhow!(
                        "MARKET BUY of {} at {} rounds to a zero quote amount",
                        quantity,
                        reference_price
                    ));
                }
                ("BUY", None, Some(amount.to_string()))
            }
            Side::Sell => ("SELL", Some(quantity.to_string()), None),
        };

        Ok(Self {
            symbol,
            side: side_str,
            order_type: "MARKET",
            time_in_force: "GTC",
            quantity,
            amount,
            client_order_id,
        })
    }
}

/// 2xx reply to `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct OrderAck {
    pub id: String,
}

/// Error body the exchange returns with a non-2xx status.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub message: Option<String>,
}

// Candle rows are positional arrays:
// [low, high, open, close, amount, quantity, buyTakerAmount, buyTakerQuantity,
//  tradeCount, ts, weightedAverage, interval, startTime, closeTime]
const IDX_LOW: usize = 0;
const IDX_HIGH: usize = 1;
const IDX_OPEN: usize = 2;
const IDX_CLOSE: usize = 3;
const IDX_START_TIME: usize = 12;

pub fn parse_candle_row(row: &[Value]) -> Result<Candle> {
    if row.len() <= IDX_START_TIME {
        return Err(anyhow!("candle row has {} fields, expected at least {}", row.len(), IDX_START_TIME + 1));
    }

    Ok(Candle {
        open_time: as_i64(&row[IDX_START_TIME]).context("candle startTime")?,
        open: as_decimal(&row[IDX_OPEN]).context("candle open")?,
        high: as_decimal(&row[IDX_HIGH]).context("candle high")?,
        low: as_decimal(&row[IDX_LOW]).context("candle low")?,
        close: as_decimal(&row[IDX_CLOSE]).context("candle close")?,
    })
}

fn as_decimal(value: &Value) -> Result<Decimal> {
    match value {
        Value::String(s) => Ok(Decimal::from_str(s)?),
        Value::Number(n) => Ok(Decimal::from_str(&n.to_string())?),
        other => Err(anyhow!("expected decimal, got {}", other)),
    }
}

fn as_i64(value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| anyhow!("expected integer, got {}", n)),
        Value::String(s) => Ok(s.parse()?),
        other => Err(anyhow!("expected integer, got {}", other)),
    }
}
