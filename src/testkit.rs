// src/testkit.rs
// In-memory collaborators shared by the unit tests.
use crate::config::{AppConfig, StrategyConfig};
use crate::connectors::traits::{MarketDataProvider, OrderGateway};
use crate::core::audit::AuditSink;
use crate::types::{Candle, GatewayReply, IterationRecord, OrderRequest, Timeframe};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn test_config(ma_period: usize) -> AppConfig {
    AppConfig {
        symbol: "BTC".into(),
        quote: "USDT".into(),
        trade_quantity: Decimal::new(5, 4),
        quantity_step: Decimal::new(1, 4),
        amount_step: Decimal::new(1, 2),
        poll_interval_secs: 60,
        live_trading: false,
        audit_dir: "logs".into(),
        base_url: "http://localhost".into(),
        strategy: StrategyConfig {
            ma_period,
            timeframe: Timeframe::M5,
        },
    }
}

/// Ascending 5-minute candles whose closes are `closes`, oldest first.
pub fn candles_from_closes(closes: &[Decimal]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| Candle {
            open_time: 1_700_000_000_000 + i as i64 * 300_000,
            open: *close,
            high: *close,
            low: *close,
            close: *close,
        })
        .collect()
}

#[derive(Default)]
struct MarketScript {
    price: Option<std::result::Result<Decimal, String>>,
    candles: Option<std::result::Result<Vec<Candle>, String>>,
    panic_on_price: bool,
    last_candle_request: Option<(Timeframe, usize)>,
}

#[derive(Default)]
pub struct ScriptedMarket {
    script: Mutex<MarketScript>,
    price_calls: AtomicUsize,
    candle_calls: AtomicUsize,
}

impl ScriptedMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, price: Decimal) {
        self.script.lock().unwrap().price = Some(Ok(price));
    }

    pub fn fail_price(&self, reason: &str) {
        self.script.lock().unwrap().price = Some(Err(reason.to_string()));
    }

    pub fn panic_on_price(&self) {
        self.script.lock().unwrap().panic_on_price = true;
    }

    pub fn set_closes(&self, closes: &[Decimal]) {
        self.script.lock().unwrap().candles = Some(Ok(candles_from_closes(closes)));
    }

    /// Candle window whose mean is exactly `average`.
    pub fn set_average(&self, average: Decimal, period: usize) {
        self.set_closes(&vec![average; period]);
    }

    pub fn fail_candles(&self, reason: &str) {
        self.script.lock().unwrap().candles = Some(Err(reason.to_string()));
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn candle_calls(&self) -> usize {
        self.candle_calls.load(Ordering::SeqCst)
    }

    pub fn last_candle_request(&self) -> Option<(Timeframe, usize)> {
        self.script.lock().unwrap().last_candle_request
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedMarket {
    async fn get_price(&self, _symbol: &str, _quote: &str) -> Result<Decimal> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap();
        if script.panic_on_price {
            drop(script);
            panic!("price feed exploded");
        }
        match &script.price {
            Some(Ok(p)) => Ok(*p),
            Some(Err(e)) => Err(anyhow!(e.clone())),
            None => Err(anyhow!("no price scripted")),
        }
    }

    async fn get_candles(
        &self,
        _symbol: &str,
        _quote: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        script.last_candle_request = Some((timeframe, limit));
        match &script.candles {
            Some(Ok(c)) => Ok(c.clone()),
            Some(Err(e)) => Err(anyhow!(e.clone())),
            None => Err(anyhow!("no candles scripted")),
        }
    }
}

/// Replies are consumed in order; once empty every order is confirmed.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<std::result::Result<GatewayReply, String>>>,
    requests: Mutex<Vec<OrderRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, code: i64, order_id: Option<&str>, message: Option<&str>) {
        self.replies.lock().unwrap().push_back(Ok(GatewayReply {
            code,
            order_id: order_id.map(str::to_string),
            message: message.map(str::to_string),
        }));
    }

    pub fn push_transport_error(&self, reason: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderGateway for ScriptedGateway {
    async fn place_order(&self, request: &OrderRequest) -> Result<GatewayReply> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Ok(GatewayReply {
                code: 0,
                order_id: Some(format!("order-{}", n)),
                message: None,
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    records: Mutex<Vec<IterationRecord>>,
    fail: bool,
    panic: bool,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<IterationRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, record: &IterationRecord) -> Result<()> {
        // guard is released before panicking so later records still land
        self.records.lock().unwrap().push(record.clone());
        if self.panic {
            panic!("audit sink exploded");
        }
        if self.fail {
            return Err(anyhow!("audit disk full"));
        }
        Ok(())
    }
}
