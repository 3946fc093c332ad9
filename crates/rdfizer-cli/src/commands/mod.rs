//! One module per run mode. Shared here: config assembly from YAML, flags
//! and environment, and the container session every mode runs inside.

pub mod compress;
pub mod decompress;
pub mod full;

use std::env;
use std::path::{Path, PathBuf};

use rdfizer_core::{io_error, CommandLog, ExecContext, ProcessRunner, RdfizerError};
use rdfizer_pipeline::{
    check_container_runtime, ensure_image_available, wrapper_log_path, ContainerRuntime,
    ImageRef, PipelineConfig, RunIdentity, DOCKER_AS_USER_ENV,
};
use tracing::info;

use crate::{Cli, Mode};

pub fn run(cli: &Cli) -> Result<(), RdfizerError> {
    let config = load_config(cli)?;
    config.validate_flags()?;
    match cli.mode {
        Mode::Full => full::run(cli, &config),
        Mode::Compress => compress::run(cli, &config),
        Mode::Decompress => decompress::run(cli, &config),
    }
}

/// YAML defaults, then explicit flags, then the environment switch.
pub fn load_config(cli: &Cli) -> Result<PipelineConfig, RdfizerError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_yaml(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(out) = &cli.out {
        config.out_dir = out.clone();
    }
    if let Some(tsv) = &cli.tsv {
        config.tsv_dir = tsv.clone();
    }
    if let Some(metrics) = &cli.metrics {
        config.metrics_dir = metrics.clone();
    }
    if let Some(rules) = &cli.rules {
        config.rules = rules.clone();
    }
    if let Some(image) = &cli.image {
        config.image = image.clone();
    }
    if cli.image_version.is_some() {
        config.image_version = cli.image_version.clone();
    }
    if let Some(compression) = &cli.compression {
        config.compression = compression.clone();
    }
    config.keep_tsv |= cli.keep_tsv;
    config.keep_rdf |= cli.keep_rdf;
    config.build |= cli.build;
    config.no_build |= cli.no_build;
    config.estimate_size |= cli.estimate_size;
    config.apply_docker_as_user(env::var(DOCKER_AS_USER_ENV).ok().as_deref());
    config.resolve_paths(&current_dir()?);
    Ok(config)
}

fn current_dir() -> Result<PathBuf, RdfizerError> {
    env::current_dir().map_err(|err| io_error("current_dir", Path::new("."), err))
}

pub fn absolute(path: &Path) -> Result<PathBuf, RdfizerError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(current_dir()?.join(path))
}

pub fn required<'a>(
    value: Option<&'a Path>,
    flag: &str,
    mode: &str,
) -> Result<&'a Path, RdfizerError> {
    value.ok_or_else(|| {
        RdfizerError::validation(
            "missing_argument",
            format!("{flag} is required in --mode {mode}"),
        )
    })
}

/// Opens the wrapper log, checks the container runtime and image, then hands
/// an execution context to `body`.
pub fn execute<T, F>(
    config: &PipelineConfig,
    image: &ImageRef,
    mode: Mode,
    body: F,
) -> Result<T, RdfizerError>
where
    F: FnOnce(&mut ExecContext<'_>, &RunIdentity, &ContainerRuntime) -> Result<T, RdfizerError>,
{
    let identity = RunIdentity::now();
    let log_path = wrapper_log_path(&config.metrics_dir, &identity.run_id);
    let log = CommandLog::open_file(log_path.clone())?;
    info!("  Detailed logs: {}", log_path.display());

    let runtime = config.container_runtime(image);
    let mut runner = ProcessRunner;
    let mut ctx = ExecContext::new(&mut runner, log);

    check_container_runtime(&mut ctx, &runtime)?;
    info!("Step 2/{}: Checking container image {}", mode.total_steps(), image.reference);
    let source = ensure_image_available(&mut ctx, &runtime, image, &config.image_policy())?;
    info!(image = %image.reference, ?source, "container image ready");
    body(&mut ctx, &identity, &runtime)
}
