use rdfizer_core::RdfizerError;
use rdfizer_pipeline::{run_decompress_mode, validate_mode_dirs, DecompressPlan, PipelineConfig};
use tracing::info;

use super::{absolute, execute, required};
use crate::{Cli, Mode};

pub fn run(cli: &Cli, config: &PipelineConfig) -> Result<(), RdfizerError> {
    let source = absolute(required(
        cli.compressed_input.as_deref(),
        "--compressed-input",
        "decompress",
    )?)?;
    validate_mode_dirs(&[config.out_dir.as_path(), config.metrics_dir.as_path()])?;
    let output = cli.decompress_out.as_deref().map(absolute).transpose()?;
    let plan = DecompressPlan::new(&source, output, &config.out_dir)?;
    let image = config.image_ref()?;
    info!(method = plan.method.token(), "Step 1/3: Validating inputs");

    let result = execute(config, &image, Mode::Decompress, |ctx, _identity, runtime| {
        run_decompress_mode(ctx, runtime, &plan)
    })?;
    info!(size_bytes = result.output_size_bytes, "decompression finished");
    Ok(())
}
