use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use trade_analyzer_lib::analysis::fetch_trades;
use trade_analyzer_lib::core::orchestrator::{index_name, Orchestrator};
use trade_analyzer_lib::db::TradeStore;
use trade_analyzer_lib::fetcher::ArchiveSource;
use trade_analyzer_lib::{Error, IngestConfig, Result, StoreConfig, TradeType};

const HEADER: &str = "DECLARANT,DECLARANT_ISO,PARTNER_ISO,TRADE_TYPE,PRODUCT_NC,PERIOD,VALUE_IN_EUROS,QUANTITY_IN_KG";

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Writes one small archive file per month, or fails with a 404 for the listed months.
struct FakeComext {
    dir: PathBuf,
    missing: HashSet<NaiveDate>,
}

#[async_trait]
impl ArchiveSource for FakeComext {
    fn name(&self) -> &str {
        "fake-comext"
    }

    async fn fetch_and_extract(&self, month: NaiveDate) -> Result<()> {
        if self.missing.contains(&month) {
            return Err(Error::RemoteFetch { status_code: 404 });
        }
        let period = month.format("%Y%m");
        let m = month.month() as f64;
        let body = format!(
            "{HEADER}\n\
             001,FR,US,I,01012100,{period},{},10\n\
             001,FR,DE,I,01012900,{period},50,5\n\
             004,DE,FR,E,01012100,{period},7.5,1\n",
            100.0 * m
        );
        std::fs::write(self.dir.join(format!("full{}.dat", period)), body)?;
        Ok(())
    }
}

fn config(workspace: &Path) -> IngestConfig {
    IngestConfig {
        extract_dir: workspace.join("extracted"),
        store: StoreConfig {
            db_path: workspace.join("eurostat.db"),
            table_name: "trades".to_string(),
        },
        start_date: ymd(2017, 1, 1),
        end_date: ymd(2017, 11, 1),
        chunk_size: 2,
        workers: 3,
        ..IngestConfig::default()
    }
}

#[tokio::test]
async fn test_run_skips_failed_months_and_loads_the_rest() {
    let workspace = TempDir::new().unwrap();
    let config = config(workspace.path());
    std::fs::create_dir_all(&config.extract_dir).unwrap();
    let missing: HashSet<_> = [ymd(2017, 2, 1), ymd(2017, 5, 1), ymd(2017, 8, 1)].into_iter().collect();
    let source = FakeComext {
        dir: config.extract_dir.clone(),
        missing: missing.clone(),
    };

    let report = Orchestrator::new(config.clone(), Arc::new(source)).run().await.unwrap();

    assert_eq!(report.months_requested, 10);
    assert_eq!(report.months_fetched, 7);
    assert_eq!(report.months_failed, vec![ymd(2017, 2, 1), ymd(2017, 5, 1), ymd(2017, 8, 1)]);
    assert_eq!(report.files_processed, 7);
    // Three rows per file in chunks of two: the two FR rows collapse, DE stands alone.
    assert_eq!(report.chunks_loaded, 14);
    assert_eq!(report.rows_loaded, 14);
    assert_eq!(report.files_removed, 0);
    assert_eq!(std::fs::read_dir(&config.extract_dir).unwrap().count(), 7);

    let mut store = TradeStore::open(&config.store);
    assert!(store.index_exists(&index_name("trades")).await.unwrap());

    let stats = fetch_trades(&mut store, "FR", TradeType::Import, ymd(2017, 1, 1), ymd(2017, 10, 1))
        .await
        .unwrap();
    let months: Vec<u32> = stats.iter().map(|s| s.month.month()).collect();
    assert_eq!(months, vec![1, 3, 4, 6, 7, 9, 10]);
    for stat in &stats {
        assert_eq!(stat.trades, 100.0 * stat.month.month() as f64 + 50.0);
    }

    let exports = fetch_trades(&mut store, "DE", TradeType::Export, ymd(2017, 1, 1), ymd(2017, 10, 1))
        .await
        .unwrap();
    assert!(exports.iter().all(|s| s.trades == 7.5));
    store.close().await;
}

#[tokio::test]
async fn test_clear_dir_removes_processed_files() {
    let workspace = TempDir::new().unwrap();
    let config = IngestConfig {
        clear_dir: true,
        ..config(workspace.path())
    };
    std::fs::create_dir_all(&config.extract_dir).unwrap();
    let source = FakeComext {
        dir: config.extract_dir.clone(),
        missing: HashSet::new(),
    };

    let report = Orchestrator::new(config.clone(), Arc::new(source)).run().await.unwrap();

    assert_eq!(report.files_processed, 10);
    assert_eq!(report.files_removed, 10);
    assert!(config.extract_dir.is_dir());
    assert_eq!(std::fs::read_dir(&config.extract_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_malformed_file_aborts_the_run() {
    let workspace = TempDir::new().unwrap();
    let config = IngestConfig {
        skip_fetch: true,
        clear_dir: true,
        ..config(workspace.path())
    };
    std::fs::create_dir_all(&config.extract_dir).unwrap();
    let bad = config.extract_dir.join("full201701.dat");
    std::fs::write(&bad, format!("{HEADER}\n001,FR,US,I,01012100,201701,lots,10\n")).unwrap();
    let source = FakeComext {
        dir: config.extract_dir.clone(),
        missing: HashSet::new(),
    };

    let err = Orchestrator::new(config, Arc::new(source)).run().await.unwrap_err();

    match err {
        Error::Ingest { file, source } => {
            assert_eq!(file, bad);
            assert!(matches!(*source, Error::MalformedRow { row: 1, .. }));
        }
        other => panic!("expected an ingest error, got {other:?}"),
    }
    // Nothing is cleaned up after a failed run.
    assert!(bad.exists());
}

#[tokio::test]
async fn test_skip_fetch_loads_existing_files() {
    let workspace = TempDir::new().unwrap();
    let config = IngestConfig {
        skip_fetch: true,
        ..config(workspace.path())
    };
    std::fs::create_dir_all(&config.extract_dir).unwrap();
    std::fs::write(
        config.extract_dir.join("full201703.dat"),
        format!("{HEADER}\n001,FR,US,I,01012100,201703,300,10\n"),
    )
    .unwrap();
    let source = FakeComext {
        dir: config.extract_dir.clone(),
        // Every month would fail if the fetch phase ran.
        missing: trade_analyzer_lib::core::timeseries::month_range(config.start_date, config.end_date)
            .into_iter()
            .collect(),
    };

    let report = Orchestrator::new(config, Arc::new(source)).run().await.unwrap();

    assert_eq!(report.months_fetched, 0);
    assert!(report.months_failed.is_empty());
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.rows_loaded, 1);
}

#[tokio::test]
async fn test_invalid_chunk_size_fails_before_fetching() {
    let workspace = TempDir::new().unwrap();
    let config = IngestConfig {
        chunk_size: 0,
        ..config(workspace.path())
    };
    let source = FakeComext {
        dir: config.extract_dir.clone(),
        missing: HashSet::new(),
    };

    let err = Orchestrator::new(config.clone(), Arc::new(source)).run().await.unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(!config.extract_dir.exists());
}

#[tokio::test]
async fn test_unparseable_base_url_fails_the_run() {
    let workspace = TempDir::new().unwrap();
    let config = IngestConfig {
        base_url: "not a url".to_string(),
        start_date: ymd(2017, 1, 1),
        end_date: ymd(2017, 4, 1),
        ..config(workspace.path())
    };

    let err = Orchestrator::from_config(config.clone()).run().await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(!config.store.db_path.exists());
}

#[tokio::test]
async fn test_keyword_table_name_loads_and_queries() {
    let workspace = TempDir::new().unwrap();
    let mut config = config(workspace.path());
    config.store.table_name = "order".to_string();
    std::fs::create_dir_all(&config.extract_dir).unwrap();
    let source = FakeComext {
        dir: config.extract_dir.clone(),
        missing: HashSet::new(),
    };

    let report = Orchestrator::new(config.clone(), Arc::new(source)).run().await.unwrap();
    assert_eq!(report.files_processed, 10);

    let mut store = TradeStore::open(&config.store);
    assert!(store.index_exists(&index_name("order")).await.unwrap());
    let stats = fetch_trades(&mut store, "FR", TradeType::Import, ymd(2017, 1, 1), ymd(2017, 2, 1))
        .await
        .unwrap();
    let trades: Vec<f64> = stats.iter().map(|s| s.trades).collect();
    assert_eq!(trades, vec![150.0, 250.0]);
    store.close().await;
}
