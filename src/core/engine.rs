// src/core/engine.rs
use crate::config::AppConfig;
use crate::connectors::traits::{MarketDataProvider, OrderGateway};
use crate::core::audit::AuditSink;
use crate::core::position::{OrderDispatcher, PositionStateMachine};
use crate::error::StrategyError;
use crate::strategies::ma_crossover::{decide, SignalEvaluator};
use crate::types::{Action, IterationOutcome, IterationRecord, Position, Side};
use chrono::Utc;
use futures::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// What one iteration observed, kept for the audit record even when the
/// iteration bails out early.
#[derive(Debug, Default)]
struct IterationTrace {
    price: Option<Decimal>,
    average: Option<Decimal>,
    action: Option<Action>,
}

pub struct TradingEngine {
    config: AppConfig,
    evaluator: SignalEvaluator,
    dispatcher: OrderDispatcher,
    state: PositionStateMachine,
    audit: Arc<dyn AuditSink>,
    run_key: String,
    iteration: u64,
}

impl TradingEngine {
    pub fn new(
        config: AppConfig,
        market: Arc<dyn MarketDataProvider>,
        gateway: Arc<dyn OrderGateway>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let evaluator = SignalEvaluator::new(market, &config);
        let dispatcher = OrderDispatcher::new(gateway, config.symbol.clone(), config.quote.clone());
        Self {
            config,
            evaluator,
            dispatcher,
            state: PositionStateMachine::new(),
            audit,
            run_key: uuid::Uuid::new_v4().simple().to_string(),
            iteration: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.state.position()
    }

    /// Runs iterations back to back, sleeping `poll_interval` between them,
    /// until `shutdown` resolves. An iteration in progress always finishes.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let interval = self.config.poll_interval();

        info!(
            "Engine starting for {}/{} (run key {}). MA({}) on '{}', qty {}",
            self.config.symbol,
            self.config.quote,
            self.run_key,
            self.config.strategy.ma_period,
            self.config.strategy.timeframe,
            self.config.trade_quantity
        );

        loop {
            self.evaluate_once().await;

            info!("⏸ Waiting {} seconds before next iteration...", interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested.");
                    break;
                }
            }
        }

        info!("Engine stopped. Final position: {}", self.position());
    }

    /// One full price -> average -> decision -> order -> state pass.
    /// Never fails: every fault is folded into the returned outcome.
    pub async fn evaluate_once(&mut self) -> IterationOutcome {
        self.iteration += 1;
        let span = info_span!("iteration", n = self.iteration, run_key = %self.run_key);

        let mut trace = IterationTrace::default();
        let result = AssertUnwindSafe(self.step(&mut trace).instrument(span.clone()))
            .catch_unwind()
            .await;

        let _entered = span.enter();
        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(StrategyError::OrderFailed { side, reason })) => {
                IterationOutcome::OrderFailed { side, reason }
            }
            Ok(Err(e)) => {
                warn!("Skipping iteration: {}", e);
                IterationOutcome::NoData {
                    reason: e.to_string(),
                }
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("Iteration faulted: {}", reason);
                IterationOutcome::Faulted { reason }
            }
        };

        let record = IterationRecord {
            iteration: self.iteration,
            run_key: self.run_key.clone(),
            recorded_at: Utc::now(),
            symbol: self.config.symbol.clone(),
            quote: self.config.quote.clone(),
            price: trace.price,
            average: trace.average,
            position: self.state.position(),
            action: trace.action,
            outcome: outcome.clone(),
        };
        // The sink is outside the iteration boundary, so it gets its own guard.
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.audit.record(&record))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Audit write failed: {:#}", e),
            Err(panic) => error!("Audit sink panicked: {}", panic_message(panic.as_ref())),
        }

        outcome
    }

    async fn step(&mut self, trace: &mut IterationTrace) -> Result<IterationOutcome, StrategyError> {
        let position = self.state.position();
        info!("Executing MA crossover | position: {}", position);

        let price = self.evaluator.current_price().await?;
        trace.price = Some(price.value);
        let average = self.evaluator.moving_average().await?;
        trace.average = Some(average.value);

        let decision = decide(price.value, average.value, position);
        trace.action = Some(decision.action);

        let side = match decision.action {
            Action::Buy => {
                info!("📈 BUY SIGNAL: price {} > MA {}", decision.price, decision.average);
                Side::Buy
            }
            Action::Sell => {
                info!("📉 SELL SIGNAL: price {} < MA {}", decision.price, decision.average);
                Side::Sell
            }
            Action::Hold => {
                match position {
                    Position::Long => info!(
                        "HOLDING: price {} vs MA {}. No action.",
                        decision.price, decision.average
                    ),
                    Position::Flat => info!(
                        "WAITING: price {} vs MA {}. No action.",
                        decision.price, decision.average
                    ),
                }
                return Ok(IterationOutcome::Held);
            }
        };

        let quantity = self.config.trade_quantity;
        let result = match side {
            Side::Buy => self.dispatcher.submit_buy(quantity, price.value).await,
            Side::Sell => self.dispatcher.submit_sell(quantity, price.value).await,
        };
        self.state.apply_result(side, &result)?;

        Ok(IterationOutcome::Executed {
            side,
            order_id: result.order_id().unwrap_or("N/A").to_string(),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
