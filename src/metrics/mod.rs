pub mod export;
pub mod logger;

pub use logger::{MetricsSnapshot, QualityMetricsLogger, SharedQualityLogger};
