//! Compression-only mode over an existing `.nt` / `.nq` file.

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{io_error, CompressionMethod, ErrorInfo, ExecContext, MethodResult, RdfizerError};
use rdfizer_ledger::{update_metrics_csv, write_compression_artifacts, CompressionRecord};
use tracing::info;

use crate::compression::{file_size, run_compression_methods, CompressionOutcome};
use crate::container::ContainerRuntime;
use crate::session::RunIdentity;

/// Inputs of [`run_compress_mode`].
#[derive(Debug, Clone, Copy)]
pub struct CompressRun<'a> {
    /// Existing `.nt` / `.nq` input.
    pub rdf_path: &'a Path,
    /// Parent of the per-output directory.
    pub out_dir: &'a Path,
    /// Destination of the side artifacts.
    pub metrics_dir: &'a Path,
    /// `metrics.csv` to upsert.
    pub ledger_path: &'a Path,
    /// Methods in run order; empty for `none`.
    pub methods: &'a [CompressionMethod],
    /// Keys of the ledger row.
    pub identity: &'a RunIdentity,
    /// Runs the compressors.
    pub runtime: &'a ContainerRuntime,
}

/// Result of [`run_compress_mode`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompressReport {
    /// Stem of the input file.
    pub output_name: String,
    /// `<out_dir>/<output_name>`.
    pub output_dir: PathBuf,
    /// One entry per method that ran.
    pub results: Vec<MethodResult>,
}

/// Checks that `path` is an existing `.nt` or `.nq` file.
pub fn validate_rdf_input(path: &Path) -> Result<(), RdfizerError> {
    if !path.is_file() {
        return Err(RdfizerError::Validation(
            ErrorInfo::new(
                "rdf_input_not_found",
                format!("RDF input file not found: {}", path.display()),
            )
            .with_context("path", path.display().to_string()),
        ));
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("nt") | Some("nq") => Ok(()),
        _ => Err(RdfizerError::Validation(
            ErrorInfo::new("rdf_input_extension", "Compression input must be a .nq or .nt file")
                .with_context("path", path.display().to_string()),
        )),
    }
}

/// Compresses one RDF file and records the run in the ledger.
///
/// An empty method list runs nothing and still records a `none` row.
pub fn run_compress_mode(
    ctx: &mut ExecContext<'_>,
    run: CompressRun<'_>,
) -> Result<CompressReport, RdfizerError> {
    info!("Step 3/3: Compressing RDF input");
    validate_rdf_input(run.rdf_path)?;

    let output_name = run
        .rdf_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_dir = run.out_dir.join(&output_name);

    let outcome = if run.methods.is_empty() {
        info!("No compression methods selected (`none`). Nothing to do.");
        CompressionOutcome::default()
    } else {
        fs::create_dir_all(run.out_dir).map_err(|err| io_error("create_dir", run.out_dir, err))?;
        run_compression_methods(ctx, run.runtime, run.rdf_path, run.out_dir, run.methods)?
    };

    let record = record_for(&run, &output_name, &output_dir, outcome.results.clone());
    write_compression_artifacts(run.metrics_dir, &record)?;
    update_metrics_csv(run.ledger_path, &record)?;
    if let Some(err) = outcome.error() {
        return Err(err);
    }
    for result in &outcome.results {
        info!(
            method = result.method.token(),
            output = %result.output_path.display(),
            size_bytes = result.output_size_bytes,
            "compressed output"
        );
    }
    info!("Conversion process finished.");
    Ok(CompressReport {
        output_name,
        output_dir,
        results: outcome.results,
    })
}

fn record_for(
    run: &CompressRun<'_>,
    output_name: &str,
    output_dir: &Path,
    results: Vec<MethodResult>,
) -> CompressionRecord {
    CompressionRecord {
        run_id: run.identity.run_id.clone(),
        timestamp: run.identity.timestamp.clone(),
        output_name: output_name.to_string(),
        output_dir: output_dir.to_path_buf(),
        source_rdf_path: run.rdf_path.to_path_buf(),
        combined_size_bytes: file_size(run.rdf_path).unwrap_or(0),
        methods: run.methods.to_vec(),
        results,
    }
}
