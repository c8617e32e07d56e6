//! Pure chunk transform: raw archive rows in, per-key sums out.

use crate::core::timeseries::parse_period;
use crate::error::{Error, Result};
use crate::models::{AggregatedRow, RawTradeRow, TradeRecord, TradeType};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Coerce one raw row into a typed record.
pub fn normalize(raw: &RawTradeRow) -> std::result::Result<TradeRecord, String> {
    let period = parse_period(&raw.period)
        .ok_or_else(|| format!("PERIOD '{}' is not a YYYYMM month", raw.period))?;

    let declarant = raw.declarant.trim();
    if declarant.is_empty() {
        return Err("DECLARANT_ISO is empty".to_string());
    }

    let trade_type: TradeType = raw.trade_type.parse()?;

    let value: f64 = raw
        .value
        .trim()
        .parse()
        .map_err(|_| format!("VALUE_IN_EUROS '{}' is not numeric", raw.value))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("VALUE_IN_EUROS '{}' is not a non-negative amount", raw.value));
    }

    Ok(TradeRecord {
        period,
        declarant: declarant.to_string(),
        trade_type,
        value,
    })
}

/// Group a chunk by (declarant, trade type, period) and sum the values.
///
/// Output is ordered by key. The first unparseable row fails the whole chunk.
pub fn aggregate(chunk: &[RawTradeRow]) -> Result<Vec<AggregatedRow>> {
    let mut groups: BTreeMap<(String, TradeType, NaiveDate), f64> = BTreeMap::new();

    for (offset, raw) in chunk.iter().enumerate() {
        let record = normalize(raw).map_err(|reason| Error::MalformedRow {
            row: offset + 1,
            reason,
        })?;
        *groups
            .entry((record.declarant, record.trade_type, record.period))
            .or_insert(0.0) += record.value;
    }

    Ok(groups
        .into_iter()
        .map(|((declarant, trade_type, period), value)| AggregatedRow {
            period,
            declarant,
            trade_type,
            value,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn raw(period: &str, declarant: &str, trade_type: &str, value: &str) -> RawTradeRow {
        RawTradeRow {
            period: period.to_string(),
            declarant: declarant.to_string(),
            trade_type: trade_type.to_string(),
            value: value.to_string(),
        }
    }

    fn sample_chunk() -> Vec<RawTradeRow> {
        vec![
            raw("201701", "FR", "I", "100"),
            raw("201701", "FR", "I", "50.5"),
            raw("201702", "FR", "I", "200"),
            raw("201701", "FR", "E", "75"),
            raw("201701", "DE", "I", "10"),
            raw("201701", "DE", "I", "0"),
        ]
    }

    #[test]
    fn test_sum_is_conserved() {
        let chunk = sample_chunk();
        let input_total: f64 = chunk.iter().map(|r| r.value.parse::<f64>().unwrap()).sum();

        let rows = aggregate(&chunk).unwrap();
        let output_total: f64 = rows.iter().map(|r| r.value).sum();

        assert_relative_eq!(input_total, output_total);
    }

    #[test]
    fn test_one_row_per_distinct_key() {
        let chunk = sample_chunk();
        let keys: HashSet<_> = chunk
            .iter()
            .map(|r| (r.declarant.clone(), r.trade_type.clone(), r.period.clone()))
            .collect();

        let rows = aggregate(&chunk).unwrap();
        assert_eq!(rows.len(), keys.len());

        let fr_jan = rows
            .iter()
            .find(|r| r.declarant == "FR" && r.trade_type == TradeType::Import && r.period_label() == "2017-01-01")
            .unwrap();
        assert_relative_eq!(fr_jan.value, 150.5);
    }

    #[test]
    fn test_same_input_same_output() {
        let chunk = sample_chunk();
        assert_eq!(aggregate(&chunk).unwrap(), aggregate(&chunk).unwrap());
    }

    #[test]
    fn test_empty_chunk() {
        assert!(aggregate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_unparseable_value_fails_chunk() {
        let chunk = vec![raw("201701", "FR", "I", "100"), raw("201701", "FR", "I", "n/a")];
        match aggregate(&chunk) {
            Err(Error::MalformedRow { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_period_and_trade_type_are_rejected() {
        assert!(normalize(&raw("2017-01", "FR", "I", "1")).is_err());
        assert!(normalize(&raw("201701", "FR", "X", "1")).is_err());
        assert!(normalize(&raw("201701", " ", "I", "1")).is_err());
        assert!(normalize(&raw("201701", "FR", "I", "-5")).is_err());
    }

    #[test]
    fn test_normalize_trims_and_coerces() {
        let record = normalize(&raw(" 201803", " NL ", "e", " 12.25 ")).unwrap();
        assert_eq!(record.declarant, "NL");
        assert_eq!(record.trade_type, TradeType::Export);
        assert_eq!(record.period, NaiveDate::from_ymd_opt(2018, 3, 1).unwrap());
        assert_relative_eq!(record.value, 12.25);
    }
}
