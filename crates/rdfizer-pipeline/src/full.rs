//! Full mode: per input, TSV conversion, triplet matching, rules rendering,
//! RDF conversion, compression, metrics and cleanup.

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{
    io_error, slugify, CompressionMethod, ErrorInfo, ExecContext,
    MethodResult, RdfizerError,
};
use rdfizer_ledger::{update_metrics_csv, write_compression_artifacts, CompressionRecord};
use tracing::info;

use crate::cleanup::{remove_file_with_fallback, MountScope, ScratchDir, ScratchOutcome};
use crate::compression::{file_size, run_compression_methods, select_source_rdf};
use crate::config::PipelineConfig;
use crate::container::{
    ContainerRuntime, Mount, CONVERSION_SCRIPT, IN_MOUNT, METRICS_MOUNT, OUT_MOUNT,
    RMLSTREAMER_JAR, RULES_MOUNT, TSV_MOUNT, TSV_SCRIPT,
};
use crate::rules::{RulesTemplate, GENERATED_RULES_DIR};
use crate::session::RunIdentity;
use crate::snapshot::{InputFile, InputSnapshot};
use crate::triplet::{discover_tsv_triplets, match_input_triplet, Triplet};

/// Inputs of [`run_full_mode`].
#[derive(Debug, Clone, Copy)]
pub struct FullRun<'a> {
    /// Inputs fixed at run start.
    pub snapshot: &'a InputSnapshot,
    /// Template rendered once per input.
    pub rules: &'a RulesTemplate,
    /// Directories and keep flags.
    pub config: &'a PipelineConfig,
    /// Methods in run order; empty for `none`.
    pub methods: &'a [CompressionMethod],
    /// Keys of every ledger row the run writes.
    pub identity: &'a RunIdentity,
    /// Runs the container steps.
    pub runtime: &'a ContainerRuntime,
}

/// What happened to the raw RDF after compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfRetention {
    /// Deleted once compressed.
    Removed,
    /// Nothing was there to remove.
    CleanupSkipped,
    /// No methods ran, so the RDF is the only output.
    KeptNoCompression,
    /// `keep_rdf` was set.
    KeptByRequest,
}

/// Per-output summary.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSummary {
    /// Input prefix.
    pub prefix: String,
    /// Slug naming the output directory and files.
    pub output_name: String,
    /// RDF the methods compressed.
    pub source_rdf: PathBuf,
    /// Its size before cleanup.
    pub source_size_bytes: u64,
    /// Per-method results.
    pub results: Vec<MethodResult>,
    /// Fate of the raw RDF.
    pub rdf: RdfRetention,
}

/// Result of [`run_full_mode`].
#[derive(Debug, Clone, PartialEq)]
pub struct FullReport {
    /// One summary per input, in snapshot order.
    pub outputs: Vec<OutputSummary>,
    /// TSV scratch directory cleanup.
    pub tsv_dir: ScratchOutcome,
    /// Rendered rules directory cleanup.
    pub generated_rules: ScratchOutcome,
}

/// Output name for a prefix: its slug, `vcf` when nothing usable is left.
/// Matches the rendered rules file name.
pub fn output_name_for(prefix: &str) -> String {
    slugify(prefix)
}

fn create_dir(path: &Path) -> Result<(), RdfizerError> {
    fs::create_dir_all(path).map_err(|err| io_error("create_dir", path, err))
}

/// Runs every input of the snapshot to completion, in order.
///
/// Stops at the first failing step. Compression results captured before a
/// failure are written to the ledger before the error is returned.
pub fn run_full_mode(
    ctx: &mut ExecContext<'_>,
    run: FullRun<'_>,
) -> Result<FullReport, RdfizerError> {
    info!("Step 3/5: Processing per-input pipeline (TSV -> RDF -> compression)");
    let config = run.config;
    let tsv = ScratchDir::track(&config.tsv_dir)?;
    create_dir(&config.out_dir)?;
    create_dir(&config.metrics_dir)?;
    let rules_dir = ScratchDir::track_fresh(config.metrics_dir.join(GENERATED_RULES_DIR))?;

    let total = run.snapshot.len();
    let mut outputs = Vec::with_capacity(total);
    for (idx, input) in run.snapshot.files.iter().enumerate() {
        info!(
            "Input {}/{total}: {}",
            idx + 1,
            input
                .host_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        let summary = process_input(ctx, &run, input, tsv.path(), rules_dir.path())?;
        outputs.push(summary);
    }

    let tsv_outcome = tsv.finish(config.keep_tsv);
    let rules_outcome = rules_dir.finish(config.keep_tsv);
    info!("Conversion process finished.");
    Ok(FullReport {
        outputs,
        tsv_dir: tsv_outcome,
        generated_rules: rules_outcome,
    })
}

fn process_input(
    ctx: &mut ExecContext<'_>,
    run: &FullRun<'_>,
    input: &InputFile,
    tsv_dir: &Path,
    rules_dir: &Path,
) -> Result<OutputSummary, RdfizerError> {
    let config = run.config;
    let runtime = run.runtime;

    let tsv_cmd = runtime.run_command(
        &[
            Mount::read_only(&run.snapshot.mount_root, IN_MOUNT),
            Mount::read_write(tsv_dir, TSV_MOUNT),
        ],
        None,
        &[],
        &[TSV_SCRIPT, input.container_path.as_str(), TSV_MOUNT],
    );
    let step = ctx.run(&tsv_cmd)?;
    if !step.success() {
        return Err(RdfizerError::step_failed("TSV conversion", step.exit_code));
    }
    info!("  * TSV conversion done");

    let discovered = discover_tsv_triplets(tsv_dir)?;
    let run_prefixes = run.snapshot.expected_prefixes();
    let triplet = match_input_triplet(discovered, &input.prefix, &run_prefixes)?
        .matched
        .into_iter()
        .next()
        .ok_or_else(|| {
            RdfizerError::discovery(
                "expected_triplet_missing",
                format!("no triplet matched prefix '{}'", input.prefix),
            )
        })?;

    let rendered = run.rules.write_for(&triplet, rules_dir)?;
    let rendered_name = rendered
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_name = output_name_for(&triplet.prefix);

    let rdf_cmd = runtime.run_command(
        &[
            Mount::read_only(rules_dir, RULES_MOUNT),
            Mount::read_only(tsv_dir, TSV_MOUNT),
            Mount::read_write(&config.out_dir, OUT_MOUNT),
            Mount::read_write(&config.metrics_dir, METRICS_MOUNT),
        ],
        Some(RULES_MOUNT),
        &[
            ("JAR", RMLSTREAMER_JAR.to_string()),
            ("IN", format!("{RULES_MOUNT}/{rendered_name}")),
            ("OUT_DIR", OUT_MOUNT.to_string()),
            ("OUT_NAME", output_name.clone()),
            ("RUN_ID", run.identity.run_id.clone()),
            ("TIMESTAMP", run.identity.timestamp.clone()),
            ("IN_VCF", run.snapshot.metrics_target.clone()),
            ("LOGDIR", METRICS_MOUNT.to_string()),
        ],
        &[CONVERSION_SCRIPT],
    );
    let step = ctx.run(&rdf_cmd)?;
    if !step.success() {
        return Err(RdfizerError::step_failed(
            &format!("RDF conversion for '{}'", triplet.prefix),
            step.exit_code,
        ));
    }
    info!("  * RDF conversion done");

    let output_dir = config.out_dir.join(&output_name);
    let source_rdf = select_source_rdf(&output_dir, &output_name);
    if !run.methods.is_empty() && !source_rdf.is_file() {
        return Err(RdfizerError::Discovery(
            ErrorInfo::new(
                "rdf_output_missing",
                format!("RDF conversion produced no .nt or .nq for '{output_name}'"),
            )
            .with_context("expected", source_rdf.display().to_string()),
        ));
    }

    let outcome = run_compression_methods(ctx, runtime, &source_rdf, &config.out_dir, run.methods)?;
    let source_size_bytes = file_size(&source_rdf).unwrap_or(0);
    let record = CompressionRecord {
        run_id: run.identity.run_id.clone(),
        timestamp: run.identity.timestamp.clone(),
        output_name: output_name.clone(),
        output_dir: output_dir.clone(),
        source_rdf_path: source_rdf.clone(),
        combined_size_bytes: source_size_bytes,
        methods: run.methods.to_vec(),
        results: outcome.results.clone(),
    };
    write_compression_artifacts(&config.metrics_dir, &record)?;
    update_metrics_csv(&config.ledger_path(), &record)?;
    if let Some(err) = outcome.error() {
        return Err(err);
    }
    info!("  * Compression done");

    let rdf = retain_or_remove_rdf(ctx, run, &output_dir, &output_name)?;
    if !config.keep_tsv {
        remove_triplet(ctx, runtime, &triplet, tsv_dir)?;
    }

    Ok(OutputSummary {
        prefix: triplet.prefix,
        output_name,
        source_rdf,
        source_size_bytes,
        results: outcome.results,
        rdf,
    })
}

fn retain_or_remove_rdf(
    ctx: &mut ExecContext<'_>,
    run: &FullRun<'_>,
    output_dir: &Path,
    output_name: &str,
) -> Result<RdfRetention, RdfizerError> {
    if run.config.keep_rdf {
        return Ok(RdfRetention::KeptByRequest);
    }
    if run.methods.is_empty() {
        return Ok(RdfRetention::KeptNoCompression);
    }
    let scope = MountScope {
        root: &run.config.out_dir,
        mount_point: OUT_MOUNT,
    };
    let mut removed_any = false;
    for ext in ["nt", "nq"] {
        let raw = output_dir.join(format!("{output_name}.{ext}"));
        if raw.exists() {
            remove_file_with_fallback(ctx, run.runtime, &raw, scope)?;
            removed_any = true;
        }
    }
    Ok(if removed_any {
        info!(output = output_name, "raw RDF removed, set --keep-rdf to retain");
        RdfRetention::Removed
    } else {
        RdfRetention::CleanupSkipped
    })
}

fn remove_triplet(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    triplet: &Triplet,
    tsv_dir: &Path,
) -> Result<(), RdfizerError> {
    let scope = MountScope {
        root: tsv_dir,
        mount_point: TSV_MOUNT,
    };
    for path in triplet.files() {
        remove_file_with_fallback(ctx, runtime, path, scope)?;
    }
    Ok(())
}
