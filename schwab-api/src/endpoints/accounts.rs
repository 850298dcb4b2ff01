use super::Instrument;
use crate::macros::setter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Request, RequestData};

// Common

/// Pairs a plain account number with the hash that identifies it in URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountNumber {
    pub account_number: String,
    pub hash_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub securities_account: SecuritiesAccount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritiesAccount {
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub account_number: String,
    #[serde(default)]
    pub round_trips: i64,
    #[serde(default)]
    pub is_day_trader: bool,
    /// Only present when positions were requested
    #[serde(default)]
    pub positions: Vec<Position>,
    pub current_balances: Option<Balances>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Cash,
    Margin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub short_quantity: f64,
    #[serde(default)]
    pub long_quantity: f64,
    pub average_price: f64,
    pub market_value: f64,
    #[serde(default)]
    pub current_day_profit_loss: f64,
    pub instrument: Instrument,
}

impl Position {
    /// Net quantity, negative for short positions.
    pub fn quantity(&self) -> f64 {
        self.long_quantity - self.short_quantity
    }

    pub fn cost_basis(&self) -> f64 {
        self.average_price * self.quantity()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    pub liquidation_value: Option<f64>,
    pub cash_balance: Option<f64>,
    pub long_market_value: Option<f64>,
    pub buying_power: Option<f64>,
}

/// `fields=positions` query shared by the account requests
#[derive(Debug, Clone, Serialize)]
pub struct FieldsQuery {
    pub fields: &'static str,
}

const WITH_POSITIONS: FieldsQuery = FieldsQuery {
    fields: "positions",
};

// Requests

#[derive(Default, Debug, Clone, Serialize)]
pub struct ListAccountNumbers;

impl Request for ListAccountNumbers {
    type Data = ();
    type Response = Vec<AccountNumber>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/trader/v1/accounts/accountNumbers".into()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListAccounts {
    include_positions: bool,
}

impl Default for ListAccounts {
    fn default() -> Self {
        Self {
            include_positions: true,
        }
    }
}

impl ListAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(include_positions: bool);
}

impl Request for ListAccounts {
    type Data = FieldsQuery;
    type Response = Vec<Account>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/trader/v1/accounts".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        if self.include_positions {
            RequestData::Query(&WITH_POSITIONS)
        } else {
            RequestData::Empty
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetAccount {
    account_hash: String,
    include_positions: bool,
}

impl GetAccount {
    pub fn new(account_hash: impl Into<String>) -> Self {
        Self {
            account_hash: account_hash.into(),
            include_positions: true,
        }
    }

    setter!(include_positions: bool);
}

impl Request for GetAccount {
    type Data = FieldsQuery;
    type Response = Account;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/trader/v1/accounts/{}", self.account_hash).into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        if self.include_positions {
            RequestData::Query(&WITH_POSITIONS)
        } else {
            RequestData::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::AssetType;

    const ACCOUNT: &str = r#"{
        "securitiesAccount": {
            "type": "MARGIN",
            "accountNumber": "12345678",
            "roundTrips": 0,
            "isDayTrader": false,
            "isClosingOnlyRestricted": false,
            "positions": [
                {
                    "shortQuantity": 0.0,
                    "averagePrice": 150.25,
                    "currentDayProfitLoss": 12.5,
                    "longQuantity": 10.0,
                    "marketValue": 1715.0,
                    "instrument": {
                        "assetType": "EQUITY",
                        "cusip": "037833100",
                        "symbol": "AAPL",
                        "netChange": 1.25
                    }
                }
            ],
            "currentBalances": {
                "liquidationValue": 2500.0,
                "cashBalance": 785.0,
                "buyingPower": 1570.0
            }
        }
    }"#;

    #[test]
    fn deserializes_account_with_positions() {
        let account: Account = serde_json::from_str(ACCOUNT).unwrap();
        let securities = account.securities_account;

        assert_eq!(securities.account_type, AccountType::Margin);
        assert_eq!(securities.account_number, "12345678");
        assert_eq!(securities.positions.len(), 1);

        let position = &securities.positions[0];
        assert_eq!(position.instrument.symbol, "AAPL");
        assert_eq!(position.instrument.asset_type, AssetType::Equity);
        assert_eq!(position.quantity(), 10.0);
        assert_eq!(position.cost_basis(), 1502.5);

        let balances = securities.current_balances.unwrap();
        assert_eq!(balances.liquidation_value, Some(2500.0));
        assert_eq!(balances.long_market_value, None);
    }

    #[test]
    fn account_without_positions_has_none() {
        let account: Account = serde_json::from_str(
            r#"{"securitiesAccount":{"type":"CASH","accountNumber":"87654321"}}"#,
        )
        .unwrap();

        assert!(account.securities_account.positions.is_empty());
        assert!(account.securities_account.current_balances.is_none());
    }

    #[test]
    fn deserializes_account_numbers() {
        let numbers: Vec<AccountNumber> = serde_json::from_str(
            r#"[{"accountNumber":"12345678","hashValue":"E5B3F1A9"}]"#,
        )
        .unwrap();

        assert_eq!(numbers[0].hash_value, "E5B3F1A9");
    }

    #[test]
    fn endpoints() {
        assert_eq!(
            ListAccountNumbers.endpoint(),
            "/trader/v1/accounts/accountNumbers"
        );
        assert_eq!(ListAccounts::new().endpoint(), "/trader/v1/accounts");
        assert_eq!(GetAccount::new("E5B3F1A9").endpoint(), "/trader/v1/accounts/E5B3F1A9");
    }

    #[test]
    fn positions_query_can_be_dropped() {
        assert!(matches!(
            ListAccounts::new().data(),
            RequestData::Query(query) if query.fields == "positions"
        ));
        assert!(matches!(
            GetAccount::new("E5B3F1A9").include_positions(false).data(),
            RequestData::Empty
        ));
    }
}
