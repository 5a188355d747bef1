pub mod audit;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod query;
pub mod storage;
pub mod transform;
pub mod types;

pub use config::EtlConfig;
pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, PipelineState, RunSummary};
