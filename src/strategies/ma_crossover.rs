// src/strategies/ma_crossover.rs
use crate::config::AppConfig;
use crate::connectors::traits::MarketDataProvider;
use crate::error::StrategyError;
use crate::types::{
    Action, Candle, MovingAverageSample, Position, PriceSample, Timeframe, TradeDecision,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Price-vs-SMA rule for a single position slot.
///
/// * price above average while flat  -> BUY
/// * price below average while long  -> SELL
/// * anything else, including a tie  -> HOLD
pub fn decide(price: Decimal, average: Decimal, position: Position) -> TradeDecision {
    let action = match position {
        Position::Flat if price > average => Action::Buy,
        Position::Long if price < average => Action::Sell,
        _ => Action::Hold,
    };
    TradeDecision {
        action,
        price,
        average,
    }
}

/// Unweighted mean of the closes of the `period` most recent candles.
/// Candles are ordered by open time, newest first, before windowing.
pub fn simple_moving_average(candles: &[Candle], period: usize) -> Result<Decimal, StrategyError> {
    if period == 0 || candles.len() < period {
        return Err(StrategyError::InsufficientData {
            required: period,
            received: candles.len(),
        });
    }

    let mut ordered: Vec<&Candle> = candles.iter().collect();
    ordered.sort_by(|a, b| b.open_time.cmp(&a.open_time));

    let sum: Decimal = ordered.iter().take(period).map(|c| c.close).sum();
    Ok(sum / Decimal::from(period))
}

/// Pulls the two inputs of the rule from the market data provider.
pub struct SignalEvaluator {
    market: Arc<dyn MarketDataProvider>,
    symbol: String,
    quote: String,
    period: usize,
    timeframe: Timeframe,
}

impl SignalEvaluator {
    pub fn new(market: Arc<dyn MarketDataProvider>, config: &AppConfig) -> Self {
        Self {
            market,
            symbol: config.symbol.clone(),
            quote: config.quote.clone(),
            period: config.strategy.ma_period,
            timeframe: config.strategy.timeframe,
        }
    }

    pub async fn current_price(&self) -> Result<PriceSample, StrategyError> {
        let value = self
            .market
            .get_price(&self.symbol, &self.quote)
            .await
            .map_err(|e| StrategyError::DataUnavailable(format!("price: {:#}", e)))?;

        if value <= Decimal::ZERO {
            return Err(StrategyError::DataUnavailable(format!(
                "price: non-positive value {}",
                value
            )));
        }

        info!("Current {} price: {} {}", self.symbol, value, self.quote);
        Ok(PriceSample {
            value,
            quote: self.quote.clone(),
            fetched_at: Utc::now(),
        })
    }

    pub async fn moving_average(&self) -> Result<MovingAverageSample, StrategyError> {
        let candles = self
            .market
            .get_candles(&self.symbol, &self.quote, self.timeframe, self.period)
            .await
            .map_err(|e| StrategyError::DataUnavailable(format!("candles: {:#}", e)))?;

        let value = simple_moving_average(&candles, self.period).inspect_err(|_| {
            warn!(
                "Not enough candles for MA({}): got {}",
                self.period,
                candles.len()
            );
        })?;

        info!("MA({}) on '{}': {}", self.period, self.timeframe, value);
        Ok(MovingAverageSample {
            value,
            period: self.period,
            timeframe: self.timeframe,
        })
    }
}
