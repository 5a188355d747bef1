use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::audit::AuditLog;
use crate::config::EtlConfig;
use crate::constants::*;
use crate::error::Result;
use crate::extract::extract;
use crate::fetch::DocumentFetcher;
use crate::load::{load_table, write_csv};
use crate::query::{run_query, QueryOutput};
use crate::storage::Storage;
use crate::transform::transform;

/// Where a run is. States only move forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Init,
    Fetched,
    Extracted,
    Transformed,
    CsvWritten,
    StorageOpen,
    TableLoaded,
    Queried,
    StorageClosed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rows_extracted: usize,
    pub rows_loaded: usize,
    pub rows_matched: usize,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub final_state: PipelineState,
}

pub struct Pipeline {
    config: EtlConfig,
    audit: AuditLog,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: EtlConfig) -> Result<Self> {
        config.validate()?;
        let audit = AuditLog::new(config.log_path.clone());
        Ok(Self {
            config,
            audit,
            state: PipelineState::Init,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.state, "pipeline state must move forward");
        info!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    /// Fetch, extract, transform, load both sinks and run the threshold
    /// query, writing the query echo to `out`.
    ///
    /// Any failure stops the run where it is: sinks already written stay
    /// written, and [`Pipeline::state`] reports the last completed phase.
    #[instrument(skip_all, fields(source = %self.config.source_url))]
    pub async fn run<W: Write>(
        &mut self,
        fetcher: &dyn DocumentFetcher,
        out: &mut W,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let result = self.run_phases(fetcher, out).await;
        match &result {
            Ok(summary) => info!(
                rows = summary.rows_loaded,
                matched = summary.rows_matched,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Pipeline finished"
            ),
            Err(e) => error!(state = %self.state, "Pipeline aborted: {}", e),
        }
        result
    }

    async fn run_phases<W: Write>(
        &mut self,
        fetcher: &dyn DocumentFetcher,
        out: &mut W,
    ) -> Result<RunSummary> {
        self.audit.log_progress(MSG_PRELIMINARIES)?;

        let document = fetcher.fetch(&self.config.source_url).await?;
        self.advance(PipelineState::Fetched);

        let rows = extract(document, &self.config.table_selector)?;
        let rows_extracted = rows.len();
        self.advance(PipelineState::Extracted);
        self.audit.log_progress(MSG_EXTRACTED)?;

        let records = transform(rows)?;
        self.advance(PipelineState::Transformed);
        self.audit.log_progress(MSG_TRANSFORMED)?;

        write_csv(&records, &self.config.csv_path, &self.config.field_names)?;
        self.advance(PipelineState::CsvWritten);
        self.audit.log_progress(MSG_CSV_SAVED)?;

        // Dropped on every early return below, which closes the connection
        let mut storage = Storage::open(&self.config.db_path)?;
        self.advance(PipelineState::StorageOpen);
        self.audit.log_progress(MSG_STORAGE_OPEN)?;

        let rows_loaded = load_table(
            &mut storage,
            &self.config.table_name,
            &self.config.field_names,
            &records,
        )?;
        self.advance(PipelineState::TableLoaded);
        self.audit.log_progress(MSG_TABLE_LOADED)?;

        let output = run_query(
            &storage,
            &self.config.table_name,
            &self.config.field_names,
            self.config.query_threshold,
            out,
        )?;
        self.advance(PipelineState::Queried);
        self.audit.log_progress(MSG_COMPLETE)?;

        storage.close()?;
        self.advance(PipelineState::StorageClosed);
        self.audit.log_progress(MSG_STORAGE_CLOSED)?;

        Ok(RunSummary {
            rows_extracted,
            rows_loaded,
            rows_matched: output.rows.len(),
            csv_path: self.config.csv_path.clone(),
            db_path: self.config.db_path.clone(),
            table_name: self.config.table_name.clone(),
            final_state: self.state,
        })
    }
}

/// Runs only the threshold query against a database from an earlier run.
pub fn query_existing<W: Write>(config: &EtlConfig, out: &mut W) -> Result<QueryOutput> {
    config.validate()?;
    let storage = Storage::open(&config.db_path)?;
    let output = run_query(
        &storage,
        &config.table_name,
        &config.field_names,
        config.query_threshold,
        out,
    )?;
    storage.close()?;
    Ok(output)
}
