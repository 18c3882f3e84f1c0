// src/main.rs
use crate::config::{AppConfig, Credentials};
use crate::connectors::paper::PaperGateway;
use crate::connectors::poloniex::PoloniexClient;
use crate::connectors::traits::{MarketDataProvider, OrderGateway};
use crate::core::audit::{TracingAuditSink, AUDIT_TARGET};
use crate::core::engine::TradingEngine;
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Targets, prelude::*, EnvFilter};

mod config;
mod connectors;
mod core;
mod error;
mod strategies;
mod types;
mod utils;

#[cfg(test)]
mod testkit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration (fatal before the loop if anything is off)
    let config = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Fatal configuration error: {}", e);
            return Err(e.into());
        }
    };

    let _audit_guard = init_tracing(&config.audit_dir);

    let credentials = match Credentials::from_env() {
        Ok(creds) => creds,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    println!("========================================");
    println!("     THE CROSSOVER BOT - v0.1.0");
    println!("========================================");
    println!("Target: {}/{}", config.symbol, config.quote);
    println!(
        "Rule:   price vs MA({}) on {}",
        config.strategy.ma_period, config.strategy.timeframe
    );
    println!(
        "Mode:   {}",
        if config.live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 PAPER TRADING"
        }
    );
    println!("========================================");

    // 2. Initialize Components
    let client =
        PoloniexClient::new(&credentials, config.base_url.clone()).with_amount_step(config.amount_step);
    client
        .connect()
        .await
        .context("Exchange is unreachable")?;

    let market: Arc<dyn MarketDataProvider> = Arc::new(client.clone());
    let gateway: Arc<dyn OrderGateway> = if config.live_trading {
        Arc::new(client)
    } else {
        Arc::new(PaperGateway)
    };
    let audit = Arc::new(TracingAuditSink::new(credentials.session_id.clone()));

    info!("Session {} ready", credentials.session_id);

    // 3. Run Engine until Ctrl+C
    let mut engine = TradingEngine::new(config, market, gateway, audit);
    engine.run(shutdown_signal()).await;

    Ok(())
}

/// Stdout gets everything except audit records; the audit target goes to a
/// daily rolling file. The guard must live until exit to flush the writer.
fn init_tracing(audit_dir: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(audit_dir, "audit.log");
    let (audit_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,audit=off")),
    );
    let audit_layer = tracing_subscriber::fmt::layer()
        .with_writer(audit_writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(Targets::new().with_target(AUDIT_TARGET, Level::INFO));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(audit_layer)
        .init();

    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the loop can only be stopped by killing the process.
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
