pub mod accounts;
pub mod market_data;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, the API's timestamp format.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochMillis(i64);

impl EpochMillis {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> i64 {
        self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl From<i64> for EpochMillis {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<DateTime<Utc>> for EpochMillis {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.timestamp_millis())
    }
}

/// Midnight UTC of the given day.
impl From<NaiveDate> for EpochMillis {
    fn from(value: NaiveDate) -> Self {
        Self(value.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp_millis())
    }
}

impl std::fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            None => write!(f, "{}", self.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Equity,
    #[serde(rename = "OPTION")]
    EquityOption,
    Index,
    MutualFund,
    CashEquivalent,
    FixedIncome,
    Currency,
    CollectiveInvestment,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub asset_type: AssetType,
    pub symbol: String,
    pub cusip: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_millis_from_date_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        assert_eq!(EpochMillis::from(date).inner(), 1_451_606_400_000);
    }

    #[test]
    fn unknown_asset_type_is_other() {
        let instrument: Instrument = serde_json::from_str(
            r#"{"assetType":"FUTURE","symbol":"/ES","cusip":null,"description":null}"#,
        )
        .unwrap();
        assert_eq!(instrument.asset_type, AssetType::Other);

        let option: AssetType = serde_json::from_str(r#""OPTION""#).unwrap();
        assert_eq!(option, AssetType::EquityOption);
    }
}
