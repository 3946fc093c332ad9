#![deny(missing_docs)]
#![doc = "Shared error taxonomy, compression-method table and external step boundary for the VCF to RDF pipeline."]

pub mod errors;
pub mod exec;
pub mod method;
pub mod naming;

pub use errors::{io_error, ErrorInfo, RdfizerError, EXIT_FAILURE, EXIT_VALIDATION};
pub use exec::{
    shell_quote, CommandLog, CommandSpec, ExecContext, ProcessRunner, StepOutcome, StepRunner,
};
pub use method::{methods_label, parse_compression_methods, CompressionMethod, MethodResult};
pub use naming::{safe_metrics_name, slugify};
