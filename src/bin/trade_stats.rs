//! Query the loaded trade table: monthly totals with MoM, YoY and the
//! 12-month moving average for one declarant and direction.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use trade_analyzer_lib::analysis::{fetch_trades, list_declarants};
use trade_analyzer_lib::config::{DEFAULT_DB_PATH, DEFAULT_TABLE};
use trade_analyzer_lib::core::timeseries::parse_date_arg;
use trade_analyzer_lib::db::TradeStore;
use trade_analyzer_lib::{MonthlyStat, StoreConfig, TradeType};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "trade_stats", version, about = "Monthly trade statistics for one declarant")]
struct Cli {
    /// Declarant ISO code, e.g. FR
    #[arg(long, required_unless_present = "list_declarants")]
    declarant: Option<String>,

    /// I, E, IMPORT or EXPORT
    #[arg(long, default_value = "I")]
    trade_type: TradeType,

    #[arg(long, default_value = "2015-01-01", value_parser = parse_date_arg)]
    start: NaiveDate,

    #[arg(long, default_value = "2018-05-01", value_parser = parse_date_arg)]
    end: NaiveDate,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the declarant codes present in the store and exit
    #[arg(long)]
    list_declarants: bool,

    #[arg(long, env = "TRADES_DB_NAME", default_value = DEFAULT_DB_PATH)]
    db_name: PathBuf,

    #[arg(long, env = "TRADES_TABLE_NAME", default_value = DEFAULT_TABLE)]
    table_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    trade_analyzer_lib::init_tracing("trade_analyzer_lib=warn,sqlx=warn");
    let cli = Cli::parse();

    let mut store = TradeStore::open(&StoreConfig {
        db_path: cli.db_name.clone(),
        table_name: cli.table_name.clone(),
    });
    let result = run(&cli, &mut store).await;
    store.close().await;
    result
}

async fn run(cli: &Cli, store: &mut TradeStore) -> Result<()> {
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    if cli.list_declarants {
        for declarant in list_declarants(store).await? {
            writeln!(out, "{}", declarant)?;
        }
        return Ok(());
    }

    let declarant = cli.declarant.as_deref().unwrap_or_default();
    let stats = fetch_trades(store, declarant, cli.trade_type, cli.start, cli.end).await?;
    if stats.is_empty() {
        eprintln!("No {} data for {} between {} and {}", cli.trade_type.label(), declarant, cli.start, cli.end);
    }

    match cli.format {
        Format::Table => write_table(&mut out, &stats)?,
        Format::Csv => write_csv(&mut out, &stats)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, &stats)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn write_csv(out: &mut dyn Write, stats: &[MonthlyStat]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for stat in stats {
        writer.serialize(stat)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_table(out: &mut dyn Write, stats: &[MonthlyStat]) -> Result<()> {
    writeln!(out, "{:<10} | {:>18} | {:>9} | {:>9} | {:>18}", "Month", "Trades", "MoM", "YoY", "MovingAvg")?;
    writeln!(out, "{}", "-".repeat(76))?;
    for stat in stats {
        writeln!(
            out,
            "{:<10} | {:>18.2} | {:>9} | {:>9} | {:>18}",
            stat.month.format("%Y-%m").to_string(),
            stat.trades,
            percent(stat.mom),
            percent(stat.yoy),
            stat.moving_avg.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string()),
        )?;
    }
    Ok(())
}

fn percent(change: Option<f64>) -> String {
    change
        .map(|c| format!("{:+.2}%", c * 100.0))
        .unwrap_or_else(|| "-".to_string())
}
