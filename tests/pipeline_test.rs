use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use gdp_etl::audit::TIMESTAMP_FORMAT;
use gdp_etl::constants::*;
use gdp_etl::error::EtlError;
use gdp_etl::fetch::{DocumentFetcher, FileFetcher};
use gdp_etl::load::{read_csv, read_table};
use gdp_etl::pipeline::query_existing;
use gdp_etl::storage::Storage;
use gdp_etl::types::{FieldNames, RawDocument};
use gdp_etl::{EtlConfig, Pipeline, PipelineState};
use tempfile::tempdir;

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("gdp_page.html")
}

fn config_in(dir: &Path) -> EtlConfig {
    EtlConfig {
        source_url: fixture_path().to_string_lossy().into_owned(),
        csv_path: dir.join("Countries_by_GDP.csv"),
        db_path: dir.join("World_Economies.db"),
        log_path: dir.join("etl_project_log.txt"),
        ..EtlConfig::default()
    }
}

struct StaticFetcher(&'static str);

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, _source: &str) -> gdp_etl::Result<RawDocument> {
        Ok(RawDocument::new(self.0))
    }
}

#[tokio::test]
async fn test_full_run_over_fixture() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_in(temp_dir.path());
    let mut pipeline = Pipeline::new(config.clone())?;
    let mut out: Vec<u8> = Vec::new();

    let summary = pipeline.run(&FileFetcher, &mut out).await?;

    assert_eq!(summary.final_state, PipelineState::StorageClosed);
    assert_eq!(pipeline.state(), PipelineState::StorageClosed);
    assert_eq!(summary.rows_extracted, 6);
    assert_eq!(summary.rows_loaded, 6);
    assert_eq!(summary.rows_matched, 4);

    // Flat file
    let csv_text = std::fs::read_to_string(&config.csv_path)?;
    assert_eq!(
        csv_text,
        ",Country,GDP_USD_billions\n\
         0,United States,26854.60\n\
         1,China,19373.59\n\
         2,Germany,4308.85\n\
         3,Iceland,30.57\n\
         4,Peru,100.00\n\
         5,Tuvalu,0.06\n"
    );

    // Table matches the flat file row for row
    let storage = Storage::open(&config.db_path)?;
    let table = read_table(&storage, &config.table_name, &config.field_names)?;
    assert_eq!(table, read_csv(&config.csv_path)?);
    storage.close()?;

    // Console echo
    let console = String::from_utf8(out)?;
    let mut lines = console.lines();
    assert_eq!(
        lines.next(),
        Some("SELECT * from Countries_by_GDP WHERE GDP_USD_billions >= 100")
    );
    let body: Vec<&str> = lines.collect();
    assert_eq!(body.len(), 5);
    assert!(body[1].contains("United States") && body[1].contains("26854.60"));
    assert!(body[4].contains("Peru") && body[4].contains("100.00"));
    assert!(!console.contains("Iceland"));

    // Audit trail
    let audit = std::fs::read_to_string(&config.log_path)?;
    let messages: Vec<&str> = audit
        .lines()
        .map(|l| {
            let (stamp, message) = l.split_once(" : ").expect("audit line separator");
            assert!(chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());
            message
        })
        .collect();
    assert_eq!(
        messages,
        vec![
            MSG_PRELIMINARIES,
            MSG_EXTRACTED,
            MSG_TRANSFORMED,
            MSG_CSV_SAVED,
            MSG_STORAGE_OPEN,
            MSG_TABLE_LOADED,
            MSG_COMPLETE,
            MSG_STORAGE_CLOSED,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_audit_appends() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_in(temp_dir.path());

    Pipeline::new(config.clone())?.run(&FileFetcher, &mut std::io::sink()).await?;
    let first_csv = std::fs::read(&config.csv_path)?;
    let storage = Storage::open(&config.db_path)?;
    let first_table = read_table(&storage, &config.table_name, &config.field_names)?;
    storage.close()?;

    Pipeline::new(config.clone())?.run(&FileFetcher, &mut std::io::sink()).await?;
    let second_csv = std::fs::read(&config.csv_path)?;
    let storage = Storage::open(&config.db_path)?;
    let second_table = read_table(&storage, &config.table_name, &config.field_names)?;
    storage.close()?;

    assert_eq!(first_csv, second_csv);
    assert_eq!(first_table, second_table);
    assert_eq!(second_table.len(), 6);

    let audit = std::fs::read_to_string(&config.log_path)?;
    assert_eq!(audit.lines().count(), 16);
    Ok(())
}

#[tokio::test]
async fn test_structure_error_stops_after_fetch() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_in(temp_dir.path());
    let mut pipeline = Pipeline::new(config.clone())?;
    let fetcher = StaticFetcher("<html><body><table><tbody><tr><td>only one</td></tr></tbody></table></body></html>");

    let err = pipeline.run(&fetcher, &mut std::io::sink()).await.unwrap_err();

    assert!(matches!(err, EtlError::Structure(_)));
    assert_eq!(pipeline.state(), PipelineState::Fetched);
    assert!(!config.csv_path.exists());
    assert!(!config.db_path.exists());

    let audit = std::fs::read_to_string(&config.log_path)?;
    assert_eq!(audit.lines().count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_parse_error_stops_after_extraction() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_in(temp_dir.path());
    let mut pipeline = Pipeline::new(config.clone())?;
    let fetcher = StaticFetcher(
        "<table><tbody><tr><td>a</td></tr></tbody></table>\
         <table><tbody><tr><td>b</td></tr></tbody></table>\
         <table><tbody>\
           <tr><td><a href=\"/wiki/Narnia\">Narnia</a></td><td>Fiction</td><td>unknown</td></tr>\
         </tbody></table>",
    );

    let err = pipeline.run(&fetcher, &mut std::io::sink()).await.unwrap_err();

    assert!(matches!(err, EtlError::Parse { .. }));
    assert_eq!(pipeline.state(), PipelineState::Extracted);
    assert!(!config.csv_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_storage_failure_keeps_csv() -> Result<()> {
    let temp_dir = tempdir()?;
    let blocker = temp_dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"x")?;
    let config = EtlConfig {
        db_path: blocker.join("World_Economies.db"),
        ..config_in(temp_dir.path())
    };
    let mut pipeline = Pipeline::new(config.clone())?;

    let err = pipeline
        .run(&FileFetcher, &mut std::io::sink())
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::StorageOpen { .. }));
    assert_eq!(pipeline.state(), PipelineState::CsvWritten);
    assert_eq!(read_csv(&config.csv_path)?.len(), 6);
    Ok(())
}

#[tokio::test]
async fn test_query_existing_with_new_threshold() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_in(temp_dir.path());
    Pipeline::new(config.clone())?.run(&FileFetcher, &mut std::io::sink()).await?;

    let config = EtlConfig {
        query_threshold: 10_000.0,
        ..config
    };
    let mut out: Vec<u8> = Vec::new();
    let output = query_existing(&config, &mut out)?;

    let names: Vec<_> = output.rows.iter().map(|r| r.country.as_str()).collect();
    assert_eq!(names, ["United States", "China"]);
    assert!(String::from_utf8(out)?.starts_with(
        "SELECT * from Countries_by_GDP WHERE GDP_USD_billions >= 10000\n"
    ));
    assert_eq!(config.field_names, FieldNames::default());
    Ok(())
}
