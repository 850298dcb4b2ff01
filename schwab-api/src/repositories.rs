use crate::endpoints::{
    accounts::{GetAccount, ListAccountNumbers, ListAccounts},
    market_data::{GetPriceHistory, GetQuotes},
};

pub struct AccountRepository;

impl AccountRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn numbers(&self) -> ListAccountNumbers {
        ListAccountNumbers
    }

    /// Every linked account, with positions.
    pub fn list(&self) -> ListAccounts {
        ListAccounts::new()
    }

    /// `account_hash` is the `hash_value` from [`numbers`](Self::numbers), not the account number.
    pub fn get(&self, account_hash: impl Into<String>) -> GetAccount {
        GetAccount::new(account_hash)
    }
}

pub struct MarketDataRepository;

impl MarketDataRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn quotes(&self, symbol: impl Into<String>) -> GetQuotes {
        GetQuotes::new(symbol)
    }

    pub fn price_history(&self, symbol: impl Into<String>) -> GetPriceHistory {
        GetPriceHistory::new(symbol)
    }
}
