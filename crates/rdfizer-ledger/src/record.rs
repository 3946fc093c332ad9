//! Input record shared by the ledger and the side artifacts.

use std::path::PathBuf;

use rdfizer_core::{CompressionMethod, MethodResult};
use serde::{Deserialize, Serialize};

/// Everything the ledger and the side artifacts need about one
/// (run, output) compression pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionRecord {
    /// Run key shared by every artifact of the run.
    pub run_id: String,
    /// Run start, ISO-8601.
    pub timestamp: String,
    /// Output key within the run.
    pub output_name: String,
    /// Directory holding the output's RDF and compressed artifacts.
    pub output_dir: PathBuf,
    /// RDF file the methods compressed.
    pub source_rdf_path: PathBuf,
    /// Size of the source RDF before any cleanup.
    pub combined_size_bytes: u64,
    /// Methods requested, in run order.
    pub methods: Vec<CompressionMethod>,
    /// Results for the methods that actually ran, in run order.
    pub results: Vec<MethodResult>,
}

impl CompressionRecord {
    /// Result of `method`, if it ran.
    pub fn result_for(&self, method: CompressionMethod) -> Option<&MethodResult> {
        self.results.iter().find(|result| result.method == method)
    }
}
