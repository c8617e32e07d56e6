use clap::Parser;
use std::path::PathBuf;
use trade_analyzer_lib::analysis::summarize_declarants;
use trade_analyzer_lib::config::{DEFAULT_DB_PATH, DEFAULT_TABLE};
use trade_analyzer_lib::core::orchestrator::index_name;
use trade_analyzer_lib::db::TradeStore;
use trade_analyzer_lib::StoreConfig;

/// Per-declarant row counts and period span of the trade table.
#[derive(Parser, Debug)]
#[command(name = "inspect_db")]
struct Cli {
    #[arg(long, env = "TRADES_DB_NAME", default_value = DEFAULT_DB_PATH)]
    db_name: PathBuf,

    #[arg(long, env = "TRADES_TABLE_NAME", default_value = DEFAULT_TABLE)]
    table_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    trade_analyzer_lib::init_tracing("warn");
    let cli = Cli::parse();

    let mut store = TradeStore::open(&StoreConfig {
        db_path: cli.db_name,
        table_name: cli.table_name,
    });
    println!("🔍 Inspecting {} (table '{}')", store.db_path().display(), store.table_name());

    let result = report(&mut store).await;
    store.close().await;
    result
}

async fn report(store: &mut TradeStore) -> anyhow::Result<()> {
    let summaries = summarize_declarants(store).await?;
    if summaries.is_empty() {
        println!("No trade data loaded yet.");
        return Ok(());
    }

    println!("\n{:<10} | {:<10} | {:<12} | {:<12}", "Declarant", "Rows", "First", "Last");
    println!("{}", "-".repeat(52));
    let mut total = 0;
    for s in &summaries {
        println!(
            "{:<10} | {:<10} | {:<12} | {:<12}",
            s.declarant,
            s.rows,
            s.first_period.as_deref().unwrap_or("-"),
            s.last_period.as_deref().unwrap_or("-"),
        );
        total += s.rows;
    }

    let table = store.table_name().to_string();
    let indexed = store.index_exists(&index_name(&table)).await?;
    println!("\n{} declarants, {} rows, index {}", summaries.len(), total, if indexed { "present" } else { "missing" });
    Ok(())
}
