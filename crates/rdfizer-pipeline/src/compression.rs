//! Extension-aware naming plus fail-fast execution of compression and
//! decompression methods.

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{io_error, CompressionMethod, ErrorInfo, ExecContext, MethodResult, RdfizerError};
use tracing::{error, info};

use crate::container::{ContainerRuntime, Mount, IN_MOUNT, OUT_MOUNT};

/// Size of a regular file, `None` when absent.
pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
}

/// `<dir>/<name>.nt` if present, else `<dir>/<name>.nq` if present, else
/// the expected `.nt` path.
pub fn select_source_rdf(dir: &Path, name: &str) -> PathBuf {
    let nt = dir.join(format!("{name}.nt"));
    let nq = dir.join(format!("{name}.nq"));
    if nt.is_file() {
        nt
    } else if nq.is_file() {
        nq
    } else {
        nt
    }
}

/// Where one method writes its artifact, on the host and in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    /// Method producing the file.
    pub method: CompressionMethod,
    /// `<stem>.<ext>` for the method.
    pub file_name: String,
    /// Location under the output directory.
    pub host_path: PathBuf,
    /// Same file under `/data/out`.
    pub container_path: String,
}

/// Output locations for compressing `rdf_path` into `<out_dir>/<stem>/`.
pub fn plan_compression_outputs(
    rdf_path: &Path,
    out_dir: &Path,
    methods: &[CompressionMethod],
) -> Vec<PlannedOutput> {
    let stem = rdf_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = rdf_path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "nt".to_string());
    methods
        .iter()
        .map(|&method| {
            let file_name = method.compressed_file_name(&stem, &ext);
            PlannedOutput {
                method,
                host_path: out_dir.join(&stem).join(&file_name),
                container_path: format!("{OUT_MOUNT}/{stem}/{file_name}"),
                file_name,
            }
        })
        .collect()
}

/// Results of one fail-fast compression pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionOutcome {
    /// Results for every attempted method, the failing one last.
    pub results: Vec<MethodResult>,
}

impl CompressionOutcome {
    /// The last result when it carries a non-zero exit code.
    pub fn failure(&self) -> Option<&MethodResult> {
        self.results.last().filter(|result| result.exit_code != 0)
    }

    /// True when every attempted method exited zero.
    pub fn succeeded(&self) -> bool {
        self.failure().is_none()
    }

    /// External-step error for the failing method, if any.
    pub fn error(&self) -> Option<RdfizerError> {
        self.failure().map(|result| {
            RdfizerError::step_failed(
                &format!("{} compression", result.method.token()),
                result.exit_code,
            )
        })
    }
}

/// Runs `methods` in order against `rdf_path`, stopping at the first
/// non-zero exit. Results captured before the failure are kept.
pub fn run_compression_methods(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    rdf_path: &Path,
    out_dir: &Path,
    methods: &[CompressionMethod],
) -> Result<CompressionOutcome, RdfizerError> {
    let in_dir = rdf_path.parent().unwrap_or_else(|| Path::new("."));
    let input_name = rdf_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let input_container = format!("{IN_MOUNT}/{input_name}");
    let mounts = [
        Mount::read_only(in_dir, IN_MOUNT),
        Mount::read_write(out_dir, OUT_MOUNT),
    ];

    let mut outcome = CompressionOutcome::default();
    for planned in plan_compression_outputs(rdf_path, out_dir, methods) {
        if let Some(target) = planned.host_path.parent() {
            fs::create_dir_all(target).map_err(|err| io_error("compression_dir", target, err))?;
        }
        let script = planned
            .method
            .compress_script(&input_container, &planned.container_path);
        let step = ctx.run(&runtime.shell_command(&mounts, &script))?;
        let result = MethodResult {
            method: planned.method,
            exit_code: step.exit_code,
            wall_seconds: Some(step.wall_seconds),
            output_size_bytes: file_size(&planned.host_path).unwrap_or(0),
            output_path: planned.host_path,
        };
        let failed = !step.success();
        if failed {
            error!(
                method = planned.method.token(),
                exit_code = step.exit_code,
                log = %ctx.log_label(),
                "compression failed"
            );
        } else {
            info!(method = planned.method.token(), output = %planned.file_name, "compressed");
        }
        outcome.results.push(result);
        if failed {
            break;
        }
    }
    Ok(outcome)
}

/// A validated decompression request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressPlan {
    /// Inferred from the source extension.
    pub method: CompressionMethod,
    /// Compressed input.
    pub source: PathBuf,
    /// Restored RDF file.
    pub output: PathBuf,
}

impl DecompressPlan {
    /// Detects the format of `source` and settles the output path, defaulting
    /// to `<out_dir>/<stem of default name>/<default name>`.
    pub fn new(
        source: &Path,
        output: Option<PathBuf>,
        out_dir: &Path,
    ) -> Result<Self, RdfizerError> {
        if !source.is_file() {
            return Err(RdfizerError::Validation(
                ErrorInfo::new(
                    "compressed_input_not_found",
                    format!("Compressed input file not found: {}", source.display()),
                )
                .with_context("path", source.display().to_string()),
            ));
        }
        let method = CompressionMethod::detect(source)?;
        let output = match output {
            Some(path) => path,
            None => {
                let name = method.decompressed_file_name(source);
                let stem = Path::new(&name)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                out_dir.join(stem).join(name)
            }
        };
        if output.is_dir() {
            return Err(RdfizerError::Validation(
                ErrorInfo::new(
                    "decompress_output_is_dir",
                    format!("decompression output path is a directory: {}", output.display()),
                )
                .with_context("path", output.display().to_string()),
            ));
        }
        if let Some(parent) = output.parent() {
            if parent.exists() && !parent.is_dir() {
                return Err(RdfizerError::Validation(
                    ErrorInfo::new(
                        "decompress_parent_not_dir",
                        format!(
                            "decompression output parent is not a directory: {}",
                            parent.display()
                        ),
                    )
                    .with_context("path", parent.display().to_string()),
                ));
            }
        }
        Ok(Self {
            method,
            source: source.to_path_buf(),
            output,
        })
    }
}

/// Restores RDF from a compressed file through the container.
pub fn run_decompression(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    plan: &DecompressPlan,
) -> Result<MethodResult, RdfizerError> {
    let out_parent = plan.output.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(out_parent).map_err(|err| io_error("decompress_dir", out_parent, err))?;
    let in_dir = plan.source.parent().unwrap_or_else(|| Path::new("."));

    let file_name = |path: &Path| {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let script = plan.method.decompress_script(
        &format!("{IN_MOUNT}/{}", file_name(&plan.source)),
        &format!("{OUT_MOUNT}/{}", file_name(&plan.output)),
    );
    let mounts = [
        Mount::read_only(in_dir, IN_MOUNT),
        Mount::read_write(out_parent, OUT_MOUNT),
    ];
    let step = ctx.run(&runtime.shell_command(&mounts, &script))?;
    if !step.success() {
        return Err(RdfizerError::step_failed("decompression", step.exit_code));
    }
    Ok(MethodResult {
        method: plan.method,
        exit_code: step.exit_code,
        wall_seconds: Some(step.wall_seconds),
        output_path: plan.output.clone(),
        output_size_bytes: file_size(&plan.output).unwrap_or(0),
    })
}
