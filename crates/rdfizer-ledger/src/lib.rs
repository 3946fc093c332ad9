//! Run-metrics ledger: canonical CSV schema, per-run upsert with backup on
//! schema drift, and the JSON / text side artifacts.

#![deny(missing_docs)]

pub mod artifacts;
pub mod ledger;
pub mod record;
pub mod schema;

pub use artifacts::{
    compression_metrics_document, metrics_json_name, time_log_name, write_compression_artifacts,
    ArtifactPaths,
};
pub use ledger::{
    apply_compression, backup_path, update_metrics_csv, HeaderState, LedgerRow, LedgerUpdate,
    MetricsLedger, RowIdentity,
};
pub use record::CompressionRecord;
pub use schema::{format_seconds, header_is_canonical, METRICS_HEADER, NULL_FIELD};

/// File name of the ledger inside the metrics directory.
pub const LEDGER_FILE_NAME: &str = "metrics.csv";
