use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use gdp_etl::config::EtlConfig;
use gdp_etl::fetch::fetcher_for;
use gdp_etl::logging;
use gdp_etl::pipeline::{query_existing, Pipeline};

#[derive(Parser)]
#[command(name = "gdp_etl")]
#[command(about = "Extract country GDP figures into CSV and SQLite")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory for diagnostic logs
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract, transform and load pipeline
    Run(ConfigArgs),
    /// Run only the threshold query against an existing database
    Query(ConfigArgs),
    /// Print the effective configuration as TOML
    PrintConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Page URL or local file to extract from
    #[arg(long)]
    source_url: Option<String>,
    #[arg(long)]
    csv_path: Option<PathBuf>,
    #[arg(long)]
    db_path: Option<PathBuf>,
    #[arg(long)]
    table_name: Option<String>,
    /// Audit trail file
    #[arg(long)]
    log_path: Option<PathBuf>,
    /// Minimum GDP in billions for the query
    #[arg(long)]
    threshold: Option<f64>,
}

impl ConfigArgs {
    /// File, then environment, then command line.
    fn resolve(self) -> anyhow::Result<EtlConfig> {
        let mut config = match &self.config {
            Some(path) => EtlConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => EtlConfig::default(),
        };
        config.apply_env_overrides()?;

        if let Some(v) = self.source_url {
            config.source_url = v;
        }
        if let Some(v) = self.csv_path {
            config.csv_path = v;
        }
        if let Some(v) = self.db_path {
            config.db_path = v;
        }
        if let Some(v) = self.table_name {
            config.table_name = v;
        }
        if let Some(v) = self.log_path {
            config.log_path = v;
        }
        if let Some(v) = self.threshold {
            config.query_threshold = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Run(args) => {
            let config = args.resolve()?;
            let fetcher = fetcher_for(&config.source_url);
            let mut pipeline = Pipeline::new(config)?;
            let summary = pipeline
                .run(fetcher.as_ref(), &mut stdout)
                .await
                .with_context(|| format!("pipeline stopped after state {}", pipeline.state()))?;
            info!(
                extracted = summary.rows_extracted,
                loaded = summary.rows_loaded,
                matched = summary.rows_matched,
                csv = %summary.csv_path.display(),
                db = %summary.db_path.display(),
                table = %summary.table_name,
                "Run complete"
            );
        }
        Commands::Query(args) => {
            let config = args.resolve()?;
            query_existing(&config, &mut stdout).context("running query")?;
        }
        Commands::PrintConfig(args) => {
            let config = args.resolve()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
