//! Option chain construction and simulated option pricing.

use crate::domain::{OptionChain, OptionQuote, OptionType, StrikeRow};
use chrono::NaiveDate;

/// Strikes on each side of the money in a generated chain.
const STRIKES_EACH_SIDE: i32 = 10;
/// Most strikes shown from a live contract listing.
pub const MAX_LISTED_STRIKES: usize = 21;
/// Listed strikes further than this from spot are dropped.
pub const LISTED_STRIKE_RANGE: f64 = 50.0;
/// Flat time value assumed for listed contracts without a quote feed.
const LISTED_TIME_VALUE: f64 = 2.5;

fn strike_spacing(spot: f64) -> f64 {
    if spot > 200.0 {
        10.0
    } else if spot > 100.0 {
        5.0
    } else {
        2.5
    }
}

fn row(spot: f64, strike: f64, time_value: f64) -> StrikeRow {
    let call = (OptionType::Call.intrinsic(spot, strike) + time_value).max(0.01);
    let put = (OptionType::Put.intrinsic(spot, strike) + time_value).max(0.01);
    StrikeRow {
        strike,
        call: OptionQuote::around(call),
        put: OptionQuote::around(put),
    }
}

/// Synthetic chain of 21 strikes centred on `spot`.
///
/// Time value is 3.0 at the money and grows by 0.2 per strike away from it.
/// Non-positive strikes are dropped for very cheap underlyings.
pub fn generated_chain(symbol: &str, spot: f64) -> OptionChain {
    let spacing = strike_spacing(spot);
    let strikes = (-STRIKES_EACH_SIDE..=STRIKES_EACH_SIDE)
        .filter_map(|i| {
            let strike = ((spot + i as f64 * spacing) * 2.0).round() / 2.0;
            let time_value = 3.0 + 2.0 * i.unsigned_abs() as f64 / 10.0;
            (strike > 0.0).then(|| row(spot, strike, time_value))
        })
        .collect();
    OptionChain {
        symbol: symbol.to_string(),
        current_price: spot,
        strikes,
        data_source: "generated".into(),
        note: None,
    }
}

/// Chain from a raw list of listed strikes: de-duplicated, within range of
/// spot, sorted ascending, capped.
pub fn chain_from_listed(symbol: &str, spot: f64, listed: &[f64]) -> OptionChain {
    let mut strikes: Vec<f64> = Vec::new();
    for &s in listed {
        if s.is_finite() && s > 0.0 && !strikes.contains(&s) {
            strikes.push(s);
        }
    }
    strikes.retain(|s| (s - spot).abs() <= LISTED_STRIKE_RANGE);
    strikes.sort_by(|a, b| a.total_cmp(b));
    strikes.truncate(MAX_LISTED_STRIKES);

    OptionChain {
        symbol: symbol.to_string(),
        current_price: spot,
        strikes: strikes
            .into_iter()
            .map(|s| row(spot, s, LISTED_TIME_VALUE))
            .collect(),
        data_source: "alpaca_contracts".into(),
        note: None,
    }
}

/// Rough premium per share: intrinsic value plus ~2% of strike per month to
/// expiry, with a 0.50 floor on the time value.
pub fn simulated_premium(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    today: NaiveDate,
    expiration: NaiveDate,
) -> f64 {
    let days = (expiration - today).num_days() as f64;
    let time_value = (days / 30.0 * strike * 0.02).max(0.5);
    let premium = option_type.intrinsic(spot, strike) + time_value;
    (premium * 100.0).round() / 100.0
}

/// Premium for `quantity` contracts of 100 shares.
pub fn contract_cost(premium: f64, quantity: u64) -> f64 {
    ((premium * quantity as f64 * 100.0) * 100.0).round() / 100.0
}
