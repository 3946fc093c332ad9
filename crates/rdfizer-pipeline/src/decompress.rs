//! Decompression-only mode.

use rdfizer_core::{ExecContext, MethodResult, RdfizerError};
use tracing::info;

use crate::compression::{run_decompression, DecompressPlan};
use crate::container::ContainerRuntime;

/// Restores the RDF described by `plan`, returning the method's result.
pub fn run_decompress_mode(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    plan: &DecompressPlan,
) -> Result<MethodResult, RdfizerError> {
    info!("Step 3/3: Decompressing RDF input");
    let result = run_decompression(ctx, runtime, plan)?;
    info!(
        method = plan.method.token(),
        "Done. Decompressed file: {}",
        result.output_path.display()
    );
    Ok(result)
}
