use super::{AssetType, EpochMillis};
use crate::macros::setter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;
use tower_api_client::{Request, RequestData};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteEntry {
    pub asset_main_type: AssetType,
    pub symbol: String,
    pub realtime: Option<bool>,
    pub quote: Option<Quote>,
    pub reference: Option<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub last_price: Option<f64>,
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
    pub close_price: Option<f64>,
    pub net_change: Option<f64>,
    pub net_percent_change: Option<f64>,
    pub total_volume: Option<u64>,
    pub quote_time: Option<EpochMillis>,
    #[serde(rename = "52WeekHigh")]
    pub high_52_week: Option<f64>,
    #[serde(rename = "52WeekLow")]
    pub low_52_week: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub description: Option<String>,
    pub exchange_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Month,
    Year,
    Ytd,
}

impl FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "ytd" => Ok(Self::Ytd),
            other => Err(format!(
                "invalid period type '{}': expected day, month, year or ytd",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyType {
    Minute,
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for FrequencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!(
                "invalid frequency type '{}': expected minute, daily, weekly or monthly",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub datetime: EpochMillis,
}

// Requests

/// Quote for a single symbol.
#[derive(Debug, Clone, Serialize)]
pub struct GetQuotes {
    symbol: String,
}

impl GetQuotes {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

impl Request for GetQuotes {
    type Data = ();
    type Response = QuotesResponse;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/marketdata/v1/{}/quotes", self.symbol).into()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPriceHistory {
    symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    period_type: Option<PeriodType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_type: Option<FrequencyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<EpochMillis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<EpochMillis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    need_extended_hours_data: Option<bool>,
}

impl GetPriceHistory {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            period_type: None,
            period: None,
            frequency_type: None,
            frequency: None,
            start_date: None,
            end_date: None,
            need_extended_hours_data: None,
        }
    }

    setter!(opt period_type: PeriodType);
    setter!(opt period: u32);
    setter!(opt frequency_type: FrequencyType);
    setter!(opt frequency: u32);
    setter!(opt start_date: EpochMillis);
    setter!(opt end_date: EpochMillis);
    setter!(opt need_extended_hours_data: bool);
}

impl Request for GetPriceHistory {
    type Data = Self;
    type Response = PriceHistory;

    fn endpoint(&self) -> Cow<'_, str> {
        "/marketdata/v1/pricehistory".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Query(self)
    }
}

// Responses

/// Keyed by the requested symbol.
pub type QuotesResponse = HashMap<String, QuoteEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistory {
    pub symbol: String,
    #[serde(default)]
    pub empty: bool,
    #[serde(default)]
    pub candles: Vec<Candle>,
    pub previous_close: Option<f64>,
}

impl PriceHistory {
    /// Natural log of each close over the previous close.
    pub fn log_returns(&self) -> Vec<f64> {
        self.candles
            .windows(2)
            .filter(|pair| pair[0].close > 0.0 && pair[1].close > 0.0)
            .map(|pair| (pair[1].close / pair[0].close).ln())
            .collect()
    }

    /// Annualized volatility of the last `window` daily log returns.
    ///
    /// `None` until there are `window` returns (and at least two) to work with.
    pub fn annualized_volatility(&self, window: usize) -> Option<f64> {
        let returns = self.log_returns();
        if window < 2 || returns.len() < window {
            return None;
        }

        let recent = &returns[returns.len() - window..];
        let mean = recent.iter().sum::<f64>() / window as f64;
        let variance =
            recent.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (window - 1) as f64;

        Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
    }
}
