//! Domain types for the decision core.

pub mod account;
pub mod bar;
pub mod decision;
pub mod ids;
pub mod news;
pub mod option;
pub mod order;
pub mod position;
pub mod quote;

pub use account::AccountState;
pub use bar::Bar;
pub use decision::{SentimentLabel, SentimentResult, SentimentSource, TradeAction, TradeDecision};
pub use ids::OrderId;
pub use news::NewsHeadline;
pub use option::{
    OptionChain, OptionOrderReceipt, OptionOrderRequest, OptionQuote, OptionType, StrikeRow,
};
pub use order::{BracketLevels, OrderReceipt, OrderRequest, OrderSide, OrderStatus};
pub use position::Position;
pub use quote::{Quote, QuoteSource};

/// Symbol type alias
pub type Symbol = String;

/// Normalize a user-supplied ticker: trimmed and upper-cased.
pub fn normalize_symbol(symbol: &str) -> Symbol {
    symbol.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_symbol("  spy "), "SPY");
        assert_eq!(normalize_symbol("Nvda"), "NVDA");
    }
}
