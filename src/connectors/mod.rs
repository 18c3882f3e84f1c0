pub mod messages;
pub mod paper;
pub mod poloniex;
pub mod traits;
