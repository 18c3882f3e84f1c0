// src/types.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// The single position slot. Restart always begins `Flat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Position {
    #[default]
    Flat,
    Long,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Flat => f.write_str("FLAT"),
            Position::Long => f.write_str("LONG"),
        }
    }
}

/// Candle intervals supported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M1,
    M5,
    M10,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H12,
    D1,
    D3,
    W1,
    Mo1,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M10 => "10m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::D3 => "3d",
            Timeframe::W1 => "1w",
            Timeframe::Mo1 => "1M",
        }
    }

    /// Interval name used by the Poloniex candles endpoint.
    pub fn exchange_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "MINUTE_1",
            Timeframe::M5 => "MINUTE_5",
            Timeframe::M10 => "MINUTE_10",
            Timeframe::M15 => "MINUTE_15",
            Timeframe::M30 => "MINUTE_30",
            Timeframe::H1 => "HOUR_1",
            Timeframe::H2 => "HOUR_2",
            Timeframe::H4 => "HOUR_4",
            Timeframe::H6 => "HOUR_6",
            Timeframe::H12 => "HOUR_12",
            Timeframe::D1 => "DAY_1",
            Timeframe::D3 => "DAY_3",
            Timeframe::W1 => "WEEK_1",
            Timeframe::Mo1 => "MONTH_1",
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tf = match s {
            "1m" => Timeframe::M1,
            "5m" => Timeframe::M5,
            "10m" => Timeframe::M10,
            "15m" => Timeframe::M15,
            "30m" => Timeframe::M30,
            "1h" => Timeframe::H1,
            "2h" => Timeframe::H2,
            "4h" => Timeframe::H4,
            "6h" => Timeframe::H6,
            "12h" => Timeframe::H12,
            "1d" => Timeframe::D1,
            "3d" => Timeframe::D3,
            "1w" => Timeframe::W1,
            "1M" => Timeframe::Mo1,
            other => return Err(format!("unsupported timeframe '{}'", other)),
        };
        Ok(tf)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.label().to_string()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized OHLC bar. `open_time` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSample {
    pub value: Decimal,
    pub quote: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverageSample {
    pub value: Decimal,
    pub period: usize,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// Output of the decision rule together with the inputs that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeDecision {
    pub action: Action,
    pub price: Decimal,
    pub average: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderType {
    Market,
}

/// `Gtc` is what the exchange calls the "normal" force flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeInForce {
    Gtc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub quote: String,
    pub side: Side,
    pub quantity: Decimal,
    /// Last price seen by the iteration that produced the order. Used to
    /// size quote-denominated MARKET BUYs.
    pub reference_price: Decimal,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
}

/// Raw gateway reply. `code == 0` is the success sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub code: i64,
    pub order_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OrderOutcome {
    Confirmed { order_id: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderResult {
    pub request: OrderRequest,
    pub outcome: OrderOutcome,
}

impl OrderResult {
    pub fn order_id(&self) -> Option<&str> {
        match &self.outcome {
            OrderOutcome::Confirmed { order_id } => Some(order_id),
            OrderOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IterationOutcome {
    /// Decision was HOLD, nothing sent.
    Held,
    Executed { side: Side, order_id: String },
    NoData { reason: String },
    OrderFailed { side: Side, reason: String },
    /// Unexpected fault caught at the iteration boundary.
    Faulted { reason: String },
}

/// One line of the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct IterationRecord {
    pub iteration: u64,
    pub run_key: String,
    pub recorded_at: DateTime<Utc>,
    pub symbol: String,
    pub quote: String,
    pub price: Option<Decimal>,
    pub average: Option<Decimal>,
    pub position: Position,
    pub action: Option<Action>,
    pub outcome: IterationOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_parses_supported_labels() {
        assert_eq!("5m".parse::<Timeframe>().unwrap(), Timeframe::M5);
        assert_eq!("1M".parse::<Timeframe>().unwrap(), Timeframe::Mo1);
        assert_eq!(Timeframe::H4.exchange_interval(), "HOUR_4");
        assert!("7m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn position_defaults_to_flat() {
        assert_eq!(Position::default(), Position::Flat);
    }

    #[test]
    fn outcome_serializes_with_variant_name() {
        let outcome = IterationOutcome::Executed {
            side: Side::Buy,
            order_id: "42".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("Executed"));
        assert!(json.contains("\"42\""));
    }
}
