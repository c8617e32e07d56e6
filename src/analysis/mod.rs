pub mod statistics;
pub mod trades;

pub use trades::{fetch_trades, list_declarants, summarize_declarants, DeclarantSummary};
