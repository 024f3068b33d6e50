pub mod config;
pub mod error;
pub mod telemetry;
pub mod text;
pub mod types;

pub use config::{DedupConfig, PriorityTable};
pub use error::{ConfigError, DedupError, IngestError, NormalizeError, SelectionError};
pub use types::*;
