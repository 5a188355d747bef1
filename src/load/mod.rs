//! Output sinks for the normalized records. Both replace their target
//! wholesale, so loading the same records twice gives the same result.

pub mod csv_sink;
pub mod table_sink;

pub use csv_sink::{read_csv, write_csv};
pub use table_sink::{load_table, read_table};
