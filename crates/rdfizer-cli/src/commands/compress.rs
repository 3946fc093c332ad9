use rdfizer_core::RdfizerError;
use rdfizer_pipeline::{
    run_compress_mode, validate_mode_dirs, validate_rdf_input, CompressRun, PipelineConfig,
};
use tracing::info;

use super::{absolute, execute, required};
use crate::{Cli, Mode};

pub fn run(cli: &Cli, config: &PipelineConfig) -> Result<(), RdfizerError> {
    let rdf = absolute(required(cli.rdf.as_deref(), "--nq", "compress")?)?;
    validate_rdf_input(&rdf)?;
    let methods = config.methods()?;
    validate_mode_dirs(&[config.out_dir.as_path(), config.metrics_dir.as_path()])?;
    let image = config.image_ref()?;
    info!("Step 1/3: Validating inputs");

    let ledger_path = config.ledger_path();
    let report = execute(config, &image, Mode::Compress, |ctx, identity, runtime| {
        run_compress_mode(
            ctx,
            CompressRun {
                rdf_path: &rdf,
                out_dir: &config.out_dir,
                metrics_dir: &config.metrics_dir,
                ledger_path: &ledger_path,
                methods: &methods,
                identity,
                runtime,
            },
        )
    })?;

    info!(
        "Compressed outputs for '{}' in {}",
        report.output_name,
        report.output_dir.display()
    );
    Ok(())
}
