//! Decision engine and the trading session that runs it.
//!
//! [`DecisionEngine`] holds the pure parts: sentiment with fallback, sizing,
//! and the trading rule. [`TradingSession`] owns the gateways and performs
//! the one order a cycle may submit.

pub mod decision;
pub mod session;

pub use decision::{BracketPolicy, DecisionEngine, DecisionPolicy, Plan};
pub use session::{CycleState, SessionSnapshot, TradingSession};
