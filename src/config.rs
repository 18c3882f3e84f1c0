// src/config.rs

use crate::error::ConfigError;
use crate::types::Timeframe;
use crate::utils::precision::normalize_quantity;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Number of candles in the moving-average window.
    pub ma_period: usize,
    pub timeframe: Timeframe,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub symbol: String,
    pub quote: String,
    pub trade_quantity: Decimal,
    pub quantity_step: Decimal,
    /// Quote-currency lot for MARKET BUY amounts.
    pub amount_step: Decimal,
    pub poll_interval_secs: u64,
    pub live_trading: bool,
    pub audit_dir: String,
    pub base_url: String,
    pub strategy: StrategyConfig,
}

impl AppConfig {
    /// Layers: built-in defaults, optional `Settings` file, `APP_*` environment.
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder
            .set_default("symbol", "BTC")?
            .set_default("quote", "USDT")?
            .set_default("trade_quantity", "0.0005")?
            .set_default("quantity_step", "0.0001")?
            .set_default("amount_step", "0.01")?
            .set_default("poll_interval_secs", 60)?
            .set_default("live_trading", false)?
            .set_default("audit_dir", "logs")?
            .set_default("base_url", "https://api.poloniex.com")?
            .set_default("strategy.ma_period", 10)?
            .set_default("strategy.timeframe", "5m")?
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        if self.symbol.trim().is_empty() || self.quote.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol and quote must be set".into()));
        }
        if self.strategy.ma_period == 0 {
            return Err(ConfigError::Invalid("strategy.ma_period must be >= 1".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be >= 1".into()));
        }
        if self.quantity_step.is_sign_negative() || self.amount_step.is_sign_negative() {
            return Err(ConfigError::Invalid(
                "quantity_step and amount_step must not be negative".into(),
            ));
        }

        let quantity = normalize_quantity(self.trade_quantity, self.quantity_step);
        if quantity <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "trade_quantity {} rounds to {} with step {}",
                self.trade_quantity, quantity, self.quantity_step
            )));
        }
        self.trade_quantity = quantity;
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Exchange credentials and the session identifier, read once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    /// Reserved. Poloniex v3 signs with key + secret only; kept so the same
    /// `.env` works for venues that need it.
    pub passphrase: String,
    pub session_id: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `API_KEY`, `SECRET_KEY` and `SESSION_ID` are required; `PASSPHRASE` is optional.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).unwrap_or_default();

        let creds = Self {
            api_key: read("API_KEY"),
            secret_key: read("SECRET_KEY"),
            passphrase: read("PASSPHRASE"),
            session_id: read("SESSION_ID"),
        };

        let missing: Vec<&'static str> = [
            ("API_KEY", &creds.api_key),
            ("SECRET_KEY", &creds.secret_key),
            ("SESSION_ID", &creds.session_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }
        Ok(creds)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("passphrase", &"***")
            .field("session_id", &self.session_id)
            .finish()
    }
}
