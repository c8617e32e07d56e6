use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage format of the PERIOD column (first day of the month).
pub const PERIOD_FORMAT: &str = "%Y-%m-%d";

/// Direction of a trade flow. Stored as `I` / `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeType {
    #[serde(rename = "I")]
    Import,
    #[serde(rename = "E")]
    Export,
}

impl TradeType {
    pub fn code(&self) -> &'static str {
        match self {
            TradeType::Import => "I",
            TradeType::Export => "E",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TradeType::Import => "IMPORT",
            TradeType::Export => "EXPORT",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "I" | "IMPORT" => Ok(TradeType::Import),
            "E" | "EXPORT" => Ok(TradeType::Export),
            other => Err(format!("unknown trade type '{}'", other)),
        }
    }
}

/// One row of an extracted archive file, restricted to the columns we keep.
/// Fields stay as text until the aggregator coerces them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTradeRow {
    #[serde(rename = "PERIOD")]
    pub period: String,
    #[serde(rename = "DECLARANT_ISO")]
    pub declarant: String,
    #[serde(rename = "TRADE_TYPE")]
    pub trade_type: String,
    #[serde(rename = "VALUE_IN_EUROS")]
    pub value: String,
}

/// A typed trade record before grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub period: NaiveDate,
    pub declarant: String,
    pub trade_type: TradeType,
    pub value: f64,
}

/// Summed value for one (declarant, trade type, month) key within one batch.
/// The store may hold several of these per key; totals are always summed at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub period: NaiveDate,
    pub declarant: String,
    pub trade_type: TradeType,
    pub value: f64,
}

impl AggregatedRow {
    pub fn period_label(&self) -> String {
        self.period.format(PERIOD_FORMAT).to_string()
    }
}

/// One month of the derived series handed to the chart front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStat {
    #[serde(rename = "Month")]
    pub month: NaiveDate,
    #[serde(rename = "Trades")]
    pub trades: f64,
    #[serde(rename = "MoM")]
    pub mom: Option<f64>,
    #[serde(rename = "YoY")]
    pub yoy: Option<f64>,
    #[serde(rename = "MovingAvg")]
    pub moving_avg: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_type_parsing() {
        assert_eq!("I".parse::<TradeType>().unwrap(), TradeType::Import);
        assert_eq!(" export ".parse::<TradeType>().unwrap(), TradeType::Export);
        assert!("X".parse::<TradeType>().is_err());
    }

    #[test]
    fn test_monthly_stat_serializes_with_chart_column_names() {
        let stat = MonthlyStat {
            month: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            trades: 150.0,
            mom: None,
            yoy: Some(0.5),
            moving_avg: None,
        };

        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["Month"], "2017-01-01");
        assert_eq!(json["Trades"], 150.0);
        assert!(json["MoM"].is_null());
        assert_eq!(json["YoY"], 0.5);
    }
}
