//! Alpaca trading API broker.
//!
//! Orders are sent once; a failed POST is reported, never retried.

use super::credentials::{CredentialProvider, Credentials};
use super::options::chain_from_listed;
use super::{validate_order, Broker, BrokerError};
use crate::domain::{
    AccountState, OptionChain, OptionOrderReceipt, OptionOrderRequest, OrderId, OrderReceipt,
    OrderRequest, OrderStatus, Position,
};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{info, warn};

pub const ALPACA_PAPER_URL: &str = "https://paper-api.alpaca.markets";
pub const ALPACA_LIVE_URL: &str = "https://api.alpaca.markets";

/// Alpaca encodes most numbers as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Num {
    Str(String),
    Float(f64),
}

fn num<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match Num::deserialize(d)? {
        Num::Float(f) => Ok(f),
        Num::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn opt_num<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match Option::<Num>::deserialize(d)? {
        None => Ok(None),
        Some(Num::Float(f)) => Ok(Some(f)),
        Some(Num::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Num::Str(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    #[serde(deserialize_with = "num")]
    cash: f64,
    #[serde(deserialize_with = "num")]
    buying_power: f64,
    #[serde(deserialize_with = "num")]
    portfolio_value: f64,
    #[serde(default)]
    daytrade_count: u32,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    symbol: String,
    #[serde(deserialize_with = "num")]
    qty: f64,
    #[serde(deserialize_with = "num")]
    avg_entry_price: f64,
    #[serde(deserialize_with = "num")]
    market_value: f64,
    #[serde(deserialize_with = "num")]
    unrealized_pl: f64,
    /// Fraction, not percent.
    #[serde(deserialize_with = "num")]
    unrealized_plpc: f64,
}

impl From<PositionResponse> for Position {
    fn from(p: PositionResponse) -> Self {
        Position {
            symbol: p.symbol,
            quantity: p.qty.trunc() as i64,
            avg_entry_price: p.avg_entry_price,
            market_value: p.market_value,
            unrealized_pl: p.unrealized_pl,
            unrealized_pl_pct: p.unrealized_plpc * 100.0,
        }
    }
}

#[derive(Debug, Serialize)]
struct PriceLevel {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OrderBody {
    symbol: String,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<PriceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<PriceLevel>,
}

impl OrderBody {
    fn equity(order: &OrderRequest) -> Self {
        let bracket = order.bracket;
        Self {
            symbol: order.symbol.clone(),
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: "market",
            time_in_force: if bracket.is_some() { "gtc" } else { "day" },
            order_class: bracket.map(|_| "bracket"),
            take_profit: bracket.map(|b| PriceLevel {
                limit_price: Some(b.take_profit),
                stop_price: None,
            }),
            stop_loss: bracket.map(|b| PriceLevel {
                limit_price: None,
                stop_price: Some(b.stop_loss),
            }),
        }
    }

    fn option(order: &OptionOrderRequest) -> Self {
        Self {
            symbol: order.occ_symbol(),
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: "market",
            time_in_force: "day",
            order_class: None,
            take_profit: None,
            stop_loss: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default, deserialize_with = "opt_num")]
    filled_avg_price: Option<f64>,
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ContractsResponse {
    #[serde(default)]
    option_contracts: Vec<Contract>,
}

#[derive(Debug, Deserialize)]
struct Contract {
    #[serde(deserialize_with = "num")]
    strike_price: f64,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

pub struct LiveBroker {
    client: Client,
    credentials: Credentials,
    base_url: String,
}

impl LiveBroker {
    pub fn new(
        credentials: &dyn CredentialProvider,
        paper: bool,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            credentials: credentials.credentials()?,
            base_url: if paper { ALPACA_PAPER_URL } else { ALPACA_LIVE_URL }.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        self.credentials
            .alpaca_headers()
            .into_iter()
            .fold(req, |r, (k, v)| r.header(k, v))
    }

    fn send(&self, req: RequestBuilder) -> Result<Response, BrokerError> {
        let resp = self
            .authed(req)
            .send()
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<ApiMessage>()
            .map(|m| m.message)
            .unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => BrokerError::Credentials(format!("HTTP 401 {message}")),
            StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY => {
                BrokerError::OrderRejected(format!("HTTP {status}: {message}"))
            }
            StatusCode::NOT_FOUND => BrokerError::InvalidOrder(format!("not found: {message}")),
            s => BrokerError::Unavailable(format!("HTTP {s}: {message}")),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let url = format!("{}{path}", self.base_url);
        self.send(self.client.get(url))?
            .json()
            .map_err(|e| BrokerError::Unavailable(format!("unexpected response from {path}: {e}")))
    }

    fn post_order(&self, body: &OrderBody) -> Result<OrderResponse, BrokerError> {
        let url = format!("{}/v2/orders", self.base_url);
        self.send(self.client.post(url).json(body))?
            .json()
            .map_err(|e| BrokerError::Unavailable(format!("unexpected order response: {e}")))
    }
}

impl Broker for LiveBroker {
    fn name(&self) -> &str {
        "alpaca"
    }

    fn account(&self) -> Result<AccountState, BrokerError> {
        let a: AccountResponse = self.get("/v2/account")?;
        let mut state = AccountState::new(a.cash, a.buying_power, a.portfolio_value);
        state.day_trade_count = a.daytrade_count;
        Ok(state)
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        let raw: Vec<PositionResponse> = self.get("/v2/positions")?;
        Ok(raw.into_iter().map(Position::from).collect())
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<OrderReceipt, BrokerError> {
        validate_order(order)?;
        let resp = self.post_order(&OrderBody::equity(order)).map_err(|e| {
            warn!(symbol = %order.symbol, side = %order.side, error = %e, "order failed");
            e
        })?;
        info!(id = %resp.id, side = %order.side, quantity = order.quantity, symbol = %order.symbol, "order placed");
        Ok(OrderReceipt {
            id: OrderId::new(resp.id),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            status: OrderStatus::parse(&resp.status),
            filled_price: resp.filled_avg_price,
            broker: self.name().to_string(),
            submitted_at: resp.submitted_at.unwrap_or_else(Utc::now),
        })
    }

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError> {
        let url = format!("{}/v2/orders/{id}", self.base_url);
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn submit_option_order(
        &self,
        order: &OptionOrderRequest,
    ) -> Result<OptionOrderReceipt, BrokerError> {
        order.validate().map_err(BrokerError::InvalidOrder)?;
        let resp = self.post_order(&OrderBody::option(order))?;
        info!(id = %resp.id, option = %order.occ_symbol(), quantity = order.quantity, "option order placed");
        Ok(OptionOrderReceipt {
            id: OrderId::new(resp.id),
            status: resp.status,
            symbol: order.symbol.clone(),
            option_symbol: order.occ_symbol(),
            option_type: order.option_type,
            strike: order.strike,
            expiration: order.expiration,
            side: order.side,
            quantity: order.quantity,
            price: resp.filled_avg_price,
            total_cost: resp
                .filled_avg_price
                .map(|p| super::options::contract_cost(p, order.quantity)),
            broker: self.name().to_string(),
            submitted_at: resp.submitted_at.unwrap_or_else(Utc::now),
        })
    }

    fn option_chain(&self, symbol: &str, spot: f64) -> Result<OptionChain, BrokerError> {
        let today = Utc::now().date_naive();
        let path = format!(
            "/v2/options/contracts?underlying_symbols={symbol}&status=active&expiration_date_gte={today}&limit=100"
        );
        let resp: ContractsResponse = self.get(&path)?;
        let listed: Vec<f64> = resp.option_contracts.iter().map(|c| c.strike_price).collect();
        Ok(chain_from_listed(symbol, spot, &listed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BracketLevels, OrderSide};

    #[test]
    fn account_numbers_parse_from_strings() {
        let a: AccountResponse = serde_json::from_str(
            r#"{"cash":"1000.50","buying_power":"2001","portfolio_value":1500.0,"daytrade_count":2}"#,
        )
        .unwrap();
        assert_eq!(a.cash, 1000.5);
        assert_eq!(a.buying_power, 2001.0);
        assert_eq!(a.daytrade_count, 2);
    }

    #[test]
    fn position_percent_is_scaled() {
        let p: PositionResponse = serde_json::from_str(
            r#"{"symbol":"SPY","qty":"10","avg_entry_price":"400","market_value":"4400",
            "unrealized_pl":"400","unrealized_plpc":"0.1"}"#,
        )
        .unwrap();
        let pos = Position::from(p);
        assert_eq!(pos.quantity, 10);
        assert!((pos.unrealized_pl_pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn bracket_order_body() {
        let order = OrderRequest::market("SPY", OrderSide::Buy, 5)
            .with_bracket(BracketLevels::default_long(100.0));
        let json = serde_json::to_value(OrderBody::equity(&order)).unwrap();
        assert_eq!(json["order_class"], "bracket");
        assert_eq!(json["take_profit"]["limit_price"], 120.0);
        assert_eq!(json["stop_loss"]["stop_price"], 95.0);
        assert_eq!(json["qty"], "5");
    }

    #[test]
    fn plain_order_body_has_no_bracket() {
        let order = OrderRequest::market("SPY", OrderSide::Sell, 2);
        let json = serde_json::to_value(OrderBody::equity(&order)).unwrap();
        assert!(json.get("order_class").is_none());
        assert_eq!(json["time_in_force"], "day");
        assert_eq!(json["side"], "sell");
    }

    #[test]
    fn order_response_with_null_fill() {
        let r: OrderResponse = serde_json::from_str(
            r#"{"id":"abc","status":"accepted","filled_avg_price":null,"submitted_at":"2024-03-01T14:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(r.filled_avg_price, None);
    }
}
