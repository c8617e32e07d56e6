//! Query layer over the trade table: monthly totals and their derived series.

use crate::analysis::statistics::{derive_monthly_stats, YEAR_WINDOW};
use crate::core::timeseries::{first_of_month, parse_month_label, shift_months};
use crate::db::{quote_identifier, Table, TradeStore};
use crate::error::{Error, Result};
use crate::models::{MonthlyStat, TradeType, PERIOD_FORMAT};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Monthly series for one declarant and direction, restricted to the months of
/// `[start, end]`. The query reaches one year further back so YoY and the moving
/// average are already defined at the start of the window.
pub async fn fetch_trades(
    store: &mut TradeStore,
    declarant: &str,
    trade_type: TradeType,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<MonthlyStat>> {
    let name = store.table_name().to_string();
    let table = quote_identifier(&name)?;
    if !store.table_exists(&name).await? {
        debug!(table = %name, "Trade table missing, returning empty series");
        return Ok(Vec::new());
    }

    let visible_start = first_of_month(start);
    let visible_end = first_of_month(end);
    let query_start = shift_months(visible_start, -(YEAR_WINDOW as i32))
        .ok_or_else(|| Error::invalid_argument(format!("start date {} is out of range", start)))?;

    let sql = format!(
        r#"
        SELECT
            PERIOD AS Month,
            SUM(VALUE_IN_EUROS) AS Trades
        FROM {}
        WHERE PERIOD BETWEEN $1 AND $2
        AND DECLARANT_ISO = $3
        AND TRADE_TYPE = $4
        GROUP BY Month
        ORDER BY Month ASC
        "#,
        table
    );
    let query_start_label = query_start.format(PERIOD_FORMAT).to_string();
    let query_end_label = visible_end.format(PERIOD_FORMAT).to_string();

    let result = store
        .query_with(
            &sql,
            &[query_start_label.as_str(), query_end_label.as_str(), declarant, trade_type.code()],
        )
        .await?;
    let series = monthly_totals(&result)?;
    debug!(declarant, trade_type = %trade_type, months = series.len(), "Fetched monthly totals");

    Ok(derive_monthly_stats(&series)
        .into_iter()
        .filter(|stat| stat.month >= visible_start && stat.month <= visible_end)
        .collect())
}

/// Turn `Month` / `Trades` rows into an ascending series.
/// Labels that name the same month are summed together.
fn monthly_totals(table: &Table) -> Result<Vec<(NaiveDate, f64)>> {
    let months = table.column("Month")?;
    let trades = table.column("Trades")?;

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (label, value) in months.into_iter().zip(trades) {
        let raw = label
            .as_str()
            .ok_or_else(|| Error::Data(format!("month label {:?} is not text", label)))?;
        let month = parse_month_label(raw)
            .ok_or_else(|| Error::Data(format!("cannot parse month label '{}'", raw)))?;
        *totals.entry(month).or_insert(0.0) += value.as_f64().unwrap_or(0.0);
    }

    Ok(totals.into_iter().collect())
}

/// Every declarant code present in the store. Empty when nothing was loaded yet.
pub async fn list_declarants(store: &mut TradeStore) -> Result<BTreeSet<String>> {
    let name = store.table_name().to_string();
    let table = quote_identifier(&name)?;
    if !store.table_exists(&name).await? {
        return Ok(BTreeSet::new());
    }

    let result = store
        .query(&format!("SELECT DISTINCT DECLARANT_ISO FROM {}", table))
        .await?;
    Ok(result
        .rows()
        .iter()
        .filter_map(|row| row.first().and_then(|cell| cell.as_str()).map(str::to_string))
        .collect())
}

/// Stored row count and period span for one declarant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeclarantSummary {
    pub declarant: String,
    pub rows: i64,
    pub first_period: Option<String>,
    pub last_period: Option<String>,
}

pub async fn summarize_declarants(store: &mut TradeStore) -> Result<Vec<DeclarantSummary>> {
    let name = store.table_name().to_string();
    let table = quote_identifier(&name)?;
    if !store.table_exists(&name).await? {
        return Ok(Vec::new());
    }

    let result = store
        .query(&format!(
            r#"
            SELECT
                DECLARANT_ISO,
                COUNT(*) AS total_rows,
                MIN(PERIOD) AS first_period,
                MAX(PERIOD) AS last_period
            FROM {}
            GROUP BY DECLARANT_ISO
            ORDER BY DECLARANT_ISO
            "#,
            table
        ))
        .await?;

    let mut summaries = Vec::with_capacity(result.len());
    for row in result.rows() {
        summaries.push(DeclarantSummary {
            declarant: row[0].as_str().unwrap_or_default().to_string(),
            rows: row[1].as_f64().unwrap_or(0.0) as i64,
            first_period: row[2].as_str().map(str::to_string),
            last_period: row[3].as_str().map(str::to_string),
        });
    }
    Ok(summaries)
}
