use crate::models::MonthlyStat;
use chrono::NaiveDate;

/// Months in the YoY lookback and the moving-average window.
pub const YEAR_WINDOW: usize = 12;

/// Calculate the fractional change of each value against the value `periods` rows earlier.
/// Rows without a predecessor, or with a zero predecessor, get `None`.
pub fn calculate_pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &current)| {
            if periods == 0 || i < periods {
                return None;
            }
            let base = values[i - periods];
            if base == 0.0 {
                None
            } else {
                Some(current / base - 1.0)
            }
        })
        .collect()
}

/// Calculate the mean of the `window` rows preceding each row.
/// Rows with fewer than `window` predecessors get `None`.
pub fn calculate_trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if window == 0 || i < window {
                return None;
            }
            let slice = &values[i - window..i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Derive MoM, YoY and the 12-month moving average for a month-ordered series.
pub fn derive_monthly_stats(series: &[(NaiveDate, f64)]) -> Vec<MonthlyStat> {
    let trades: Vec<f64> = series.iter().map(|(_, v)| *v).collect();

    let mom = calculate_pct_change(&trades, 1);
    let yoy = calculate_pct_change(&trades, YEAR_WINDOW);
    let moving_avg = calculate_trailing_mean(&trades, YEAR_WINDOW);

    series
        .iter()
        .enumerate()
        .map(|(i, &(month, value))| MonthlyStat {
            month,
            trades: value,
            mom: mom[i],
            yoy: yoy[i],
            moving_avg: moving_avg[i],
        })
        .collect()
}
