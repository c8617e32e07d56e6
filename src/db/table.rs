use crate::error::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// A dynamically typed SQLite value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(v) => Some(*v as f64),
            Cell::Real(v) => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// Rows returned by an arbitrary query, with their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    pub(crate) fn from_rows(columns: Vec<String>, rows: &[SqliteRow]) -> Result<Self> {
        let mut cells = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(row.len());
            for idx in 0..row.len() {
                values.push(decode_cell(row, idx)?);
            }
            cells.push(values);
        }

        Ok(Self { columns, rows: cells })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// All cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::invalid_argument(format!("no column named '{}'", name)))?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

fn decode_cell(row: &SqliteRow, idx: usize) -> Result<Cell> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Cell::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let cell = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Cell::Integer(row.try_get(idx)?),
        "REAL" => Cell::Real(row.try_get(idx)?),
        "BLOB" => Cell::Blob(row.try_get(idx)?),
        _ => Cell::Text(row.try_get(idx)?),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = Table::new(
            vec!["Month".to_string(), "Trades".to_string()],
            vec![
                vec![Cell::Text("2017-01-01".into()), Cell::Real(150.0)],
                vec![Cell::Text("2017-02-01".into()), Cell::Integer(200)],
            ],
        );

        let trades: Vec<f64> = table
            .column("trades")
            .unwrap()
            .into_iter()
            .filter_map(Cell::as_f64)
            .collect();
        assert_eq!(trades, vec![150.0, 200.0]);
        assert!(table.column("Missing").is_err());
    }
}
