use rdfizer_core::RdfizerError;
use rdfizer_pipeline::{
    disk_space_for, estimate_pipeline_sizes, resolve_input_snapshot, run_full_mode,
    validate_mode_dirs, FullRun, PipelineConfig, RulesTemplate,
};
use tracing::{info, warn};

use super::{absolute, execute, required};
use crate::{Cli, Mode};

pub fn run(cli: &Cli, config: &PipelineConfig) -> Result<(), RdfizerError> {
    let input = absolute(required(cli.input.as_deref(), "--input", "full")?)?;
    let snapshot = resolve_input_snapshot(&input)?;
    let rules = RulesTemplate::load(&config.rules)?;
    validate_mode_dirs(&[
        config.out_dir.as_path(),
        config.tsv_dir.as_path(),
        config.metrics_dir.as_path(),
    ])?;
    let methods = config.methods()?;
    let image = config.image_ref()?;
    info!("Step 1/5: Validating inputs");

    if config.estimate_size {
        let estimate = estimate_pipeline_sizes(&snapshot.host_paths())?;
        let disk = match disk_space_for(&config.out_dir) {
            Ok(disk) => Some(disk),
            Err(err) => {
                warn!(error = %err, "free disk space unavailable");
                None
            }
        };
        estimate.log(disk.as_ref());
    }

    let report = execute(config, &image, Mode::Full, |ctx, identity, runtime| {
        run_full_mode(
            ctx,
            FullRun {
                snapshot: &snapshot,
                rules: &rules,
                config,
                methods: &methods,
                identity,
                runtime,
            },
        )
    })?;

    for output in &report.outputs {
        info!(
            output = %output.output_name,
            source_size_bytes = output.source_size_bytes,
            rdf = ?output.rdf,
            "output ready"
        );
    }
    info!(
        tsv = ?report.tsv_dir,
        generated_rules = ?report.generated_rules,
        "scratch directories"
    );
    Ok(())
}
