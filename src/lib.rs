pub mod error;
pub mod config;
pub mod context;
pub mod record;
pub mod signature;
pub mod stats;
pub mod features;
pub mod baseline;
pub mod errors;
pub mod patterns;
pub mod trends;
pub mod temporal;
pub mod anomaly;
pub mod detectors;
pub mod merge;
pub mod report;

pub use anomaly::{Anomaly, AnomalyKind, Severity};
pub use baseline::Baseline;
pub use config::Config;
pub use context::LogContext;
pub use record::{Batch, LogRecord};
pub use report::{analyze_batch, AnalyticsReport};
