//! Default values for a run, matching the archived GDP page the pipeline was built against.

pub const DEFAULT_SOURCE_URL: &str = "https://web.archive.org/web/20230902185326/https://en.wikipedia.org/wiki/List_of_countries_by_GDP_%28nominal%29";
pub const DEFAULT_VALUE_FIELD: &str = "GDP_USD_millions";
pub const DEFAULT_LABEL_FIELD: &str = "Country";
pub const DEFAULT_CSV_PATH: &str = "Countries_by_GDP.csv";
pub const DEFAULT_DB_PATH: &str = "World_Economies.db";
pub const DEFAULT_TABLE_NAME: &str = "Countries_by_GDP";
pub const DEFAULT_LOG_PATH: &str = "etl_project_log.txt";
pub const DEFAULT_QUERY_THRESHOLD: f64 = 100.0;

/// Zero-based position of the GDP table body: the third `tbody` on the page.
pub const DEFAULT_TABLE_POSITION: usize = 2;

/// Cell text used by the source page for "no estimate".
pub const PLACEHOLDER_DASH: &str = "—";

pub const HTTP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

// Audit trail messages, in the order a successful run writes them
pub const MSG_PRELIMINARIES: &str = "Preliminaries complete. Initiating ETL process";
pub const MSG_EXTRACTED: &str = "Data extraction complete. Initiating Transformation process";
pub const MSG_TRANSFORMED: &str = "Data transformation complete. Initiating loading process";
pub const MSG_CSV_SAVED: &str = "Data saved to CSV file";
pub const MSG_STORAGE_OPEN: &str = "SQL Connection initiated.";
pub const MSG_TABLE_LOADED: &str = "Data loaded to Database as table. Running the query";
pub const MSG_COMPLETE: &str = "Process Complete.";
pub const MSG_STORAGE_CLOSED: &str = "SQL Connection closed.";

// Environment overrides
pub const ENV_SOURCE_URL: &str = "GDP_ETL_SOURCE_URL";
pub const ENV_CSV_PATH: &str = "GDP_ETL_CSV_PATH";
pub const ENV_DB_PATH: &str = "GDP_ETL_DB_PATH";
pub const ENV_TABLE_NAME: &str = "GDP_ETL_TABLE_NAME";
pub const ENV_LOG_PATH: &str = "GDP_ETL_LOG_PATH";
pub const ENV_QUERY_THRESHOLD: &str = "GDP_ETL_QUERY_THRESHOLD";
