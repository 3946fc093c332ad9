//! Orchestration of the VCF to TSV to RDF to compression pipeline.
//!
//! Every external tool runs through an [`rdfizer_core::ExecContext`], so the
//! stages here only decide *what* to run and how to account for it.

#![deny(missing_docs)]

pub mod cleanup;
pub mod compress;
pub mod compression;
pub mod config;
pub mod container;
pub mod decompress;
pub mod estimate;
pub mod full;
pub mod rules;
pub mod session;
pub mod snapshot;
pub mod triplet;

pub use cleanup::{
    container_path_in_scope, remove_file_with_fallback, remove_via_container, MountScope,
    Removal, ScratchDir, ScratchOutcome,
};
pub use compress::{run_compress_mode, validate_rdf_input, CompressReport, CompressRun};
pub use compression::{
    plan_compression_outputs, run_compression_methods, run_decompression, select_source_rdf,
    CompressionOutcome, DecompressPlan, PlannedOutput,
};
pub use config::{docker_as_user_enabled, validate_mode_dirs, PipelineConfig, DOCKER_AS_USER_ENV};
pub use container::{
    check_container_runtime, ensure_image_available, ContainerRuntime, ContainerUser, ImagePolicy,
    ImageRef, ImageSource, Mount,
};
pub use decompress::run_decompress_mode;
pub use estimate::{
    disk_space_for, estimate_pipeline_sizes, format_bytes, nearest_existing_ancestor, DiskSpace,
    SizeEstimate,
};
pub use full::{output_name_for, run_full_mode, FullReport, FullRun, OutputSummary, RdfRetention};
pub use rules::{RulesTemplate, GENERATED_RULES_DIR};
pub use session::{wrapper_log_path, RunIdentity};
pub use snapshot::{resolve_input_snapshot, vcf_output_prefix, InputFile, InputSnapshot};
pub use triplet::{
    discover_tsv_triplets, match_input_triplet, match_triplets, Triplet, TripletMatch,
};
