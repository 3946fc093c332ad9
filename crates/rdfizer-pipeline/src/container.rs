//! Container invocations: mounts, the `run` prefix, image resolution and
//! availability checks. Everything is expressed as [`CommandSpec`]s so the
//! step runner stays the only place that executes anything.

use std::path::{Path, PathBuf};

use rdfizer_core::{CommandSpec, ErrorInfo, ExecContext, RdfizerError};
use tracing::info;

/// Read-only mount point of the input directory.
pub const IN_MOUNT: &str = "/data/in";
/// Mount point of the TSV scratch directory.
pub const TSV_MOUNT: &str = "/data/tsv";
/// Mount point of the output directory.
pub const OUT_MOUNT: &str = "/data/out";
/// Read-only mount point of the rules directory.
pub const RULES_MOUNT: &str = "/data/rules";
/// Mount point of the metrics directory.
pub const METRICS_MOUNT: &str = "/data/metrics";

/// VCF to TSV converter inside the image.
pub const TSV_SCRIPT: &str = "/opt/vcf-rdfizer/vcf_as_tsv.sh";
/// TSV to RDF driver inside the image.
pub const CONVERSION_SCRIPT: &str = "/opt/vcf-rdfizer/run_conversion.sh";
/// RMLStreamer jar the conversion driver runs.
pub const RMLSTREAMER_JAR: &str = "/opt/rmlstreamer/RMLStreamer-v2.5.0-standalone.jar";

/// Numeric identity passed as `--user uid:gid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerUser {
    /// Real user id.
    pub uid: u32,
    /// Real group id.
    pub gid: u32,
}

impl ContainerUser {
    /// Real uid/gid of the invoking process.
    #[cfg(unix)]
    pub fn current() -> Option<Self> {
        Some(Self {
            uid: nix::unistd::getuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
        })
    }

    /// No numeric identity exists off unix; containers run as the image user.
    #[cfg(not(unix))]
    pub fn current() -> Option<Self> {
        None
    }
}

/// Host directory bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Host side of the bind.
    pub host: PathBuf,
    /// Absolute path inside the container.
    pub container: String,
    /// Appends `:ro` to the volume flag.
    pub read_only: bool,
}

impl Mount {
    /// Bind mounted with `:ro`.
    pub fn read_only(host: impl Into<PathBuf>, container: &str) -> Self {
        Self {
            host: host.into(),
            container: container.to_string(),
            read_only: true,
        }
    }

    /// Writable bind.
    pub fn read_write(host: impl Into<PathBuf>, container: &str) -> Self {
        Self {
            host: host.into(),
            container: container.to_string(),
            read_only: false,
        }
    }

    fn volume_arg(&self) -> String {
        let suffix = if self.read_only { ":ro" } else { "" };
        format!("{}:{}{suffix}", self.host.display(), self.container)
    }
}

/// Resolved image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// `name:tag` handed to the container CLI.
    pub reference: String,
    /// True when `--image-version` picked the tag.
    pub version_requested: bool,
}

impl ImageRef {
    /// `image` with a tag is used verbatim; otherwise `:<version>` or `:latest`.
    pub fn resolve(image: &str, version: Option<&str>) -> Result<Self, RdfizerError> {
        if image.contains(':') {
            if version.is_some() {
                return Err(RdfizerError::Validation(
                    ErrorInfo::new(
                        "image_tag_conflict",
                        "Do not include a tag in --image when using --image-version.",
                    )
                    .with_context("image", image),
                ));
            }
            return Ok(Self {
                reference: image.to_string(),
                version_requested: false,
            });
        }
        Ok(match version {
            Some(version) => Self {
                reference: format!("{image}:{version}"),
                version_requested: true,
            },
            None => Self {
                reference: format!("{image}:latest"),
                version_requested: false,
            },
        })
    }
}

/// Builds container commands for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRuntime {
    /// CLI prefix, e.g. `sudo docker`.
    pub cli: Vec<String>,
    /// Image reference used by `run`, `inspect` and `pull`.
    pub image: String,
    /// Identity for `--user`, if any.
    pub user: Option<ContainerUser>,
}

impl ContainerRuntime {
    /// Runtime without a `--user` override.
    pub fn new(cli: Vec<String>, image: impl Into<String>) -> Self {
        Self {
            cli,
            image: image.into(),
            user: None,
        }
    }

    /// Sets or clears the `--user` override.
    pub fn with_user(mut self, user: Option<ContainerUser>) -> Self {
        self.user = user;
        self
    }

    fn cli_command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::from_argv(self.cli.iter().cloned())
            .unwrap_or_else(|| CommandSpec::new("docker"))
            .args(args)
    }

    /// `<cli> run --rm [--user u:g] -v ... [-w dir] [-e K=V ...] <image> <argv...>`
    pub fn run_command(
        &self,
        mounts: &[Mount],
        workdir: Option<&str>,
        env: &[(&str, String)],
        argv: &[&str],
    ) -> CommandSpec {
        let mut spec = self.cli_command(["run", "--rm"]);
        if let Some(user) = self.user {
            spec = spec.arg("--user").arg(format!("{}:{}", user.uid, user.gid));
        }
        for mount in mounts {
            spec = spec.arg("-v").arg(mount.volume_arg());
        }
        if let Some(dir) = workdir {
            spec = spec.arg("-w").arg(dir);
        }
        for (key, value) in env {
            spec = spec.arg("-e").arg(format!("{key}={value}"));
        }
        spec.arg(self.image.as_str()).args(argv.iter().copied())
    }

    /// Runs `script` through `bash -lc` inside the image.
    pub fn shell_command(&self, mounts: &[Mount], script: &str) -> CommandSpec {
        self.run_command(mounts, None, &[], &["bash", "-lc", script])
    }

    /// `<cli> version`, the liveness check.
    pub fn version_command(&self) -> CommandSpec {
        self.cli_command(["version"])
    }

    /// `<cli> image inspect <image>`.
    pub fn inspect_command(&self) -> CommandSpec {
        self.cli_command(["image", "inspect", self.image.as_str()])
    }

    /// `<cli> pull <image>`.
    pub fn pull_command(&self) -> CommandSpec {
        self.cli_command(["pull", self.image.as_str()])
    }

    /// `<cli> build -t <image> .` run from `context`.
    pub fn build_command(&self, context: &Path) -> CommandSpec {
        self.cli_command(["build", "-t", self.image.as_str(), "."])
            .current_dir(context)
    }
}

/// Fails with a validation error when the container CLI is unusable.
pub fn check_container_runtime(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
) -> Result<(), RdfizerError> {
    let outcome = ctx.run(&runtime.version_command())?;
    if outcome.success() {
        return Ok(());
    }
    Err(RdfizerError::Validation(
        ErrorInfo::new(
            "container_runtime_unavailable",
            "Docker is not available. Is the daemon running?",
        )
        .with_context("exit_code", outcome.exit_code.to_string())
        .with_hint(format!("see log for details: {}", ctx.log_label())),
    ))
}

/// Build flags controlling [`ensure_image_available`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePolicy {
    /// Build before anything else.
    pub build: bool,
    /// Never build, even when the pull fails.
    pub no_build: bool,
    /// Directory holding the Dockerfile.
    pub build_context: PathBuf,
}

/// How the image became available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Already in the local image store.
    Present,
    /// Fetched from the registry.
    Pulled,
    /// Built from the local Dockerfile.
    Built,
}

fn build_image(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    policy: &ImagePolicy,
) -> Result<ImageSource, RdfizerError> {
    info!(image = %runtime.image, "building container image");
    let outcome = ctx.run(&runtime.build_command(&policy.build_context))?;
    if outcome.success() {
        Ok(ImageSource::Built)
    } else {
        Err(RdfizerError::step_failed("docker build", outcome.exit_code))
    }
}

/// Makes `runtime.image` available locally.
///
/// `build` forces a build; an existing image is used as is; a requested
/// version is pulled; `no_build` refuses to build a missing image.
pub fn ensure_image_available(
    ctx: &mut ExecContext<'_>,
    runtime: &ContainerRuntime,
    image: &ImageRef,
    policy: &ImagePolicy,
) -> Result<ImageSource, RdfizerError> {
    if policy.build {
        return build_image(ctx, runtime, policy);
    }
    if ctx.run(&runtime.inspect_command())?.success() {
        return Ok(ImageSource::Present);
    }
    if image.version_requested {
        info!(image = %image.reference, "pulling container image");
        if ctx.run(&runtime.pull_command())?.success() {
            return Ok(ImageSource::Pulled);
        }
        return Err(RdfizerError::Validation(
            ErrorInfo::new(
                "image_version_not_found",
                format!("image version '{}' not found", image.reference),
            )
            .with_hint(format!("see log for details: {}", ctx.log_label())),
        ));
    }
    if policy.no_build {
        return Err(RdfizerError::Validation(ErrorInfo::new(
            "image_missing",
            format!("image '{}' not found and --no-build set.", image.reference),
        )));
    }
    build_image(ctx, runtime, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> ContainerRuntime {
        ContainerRuntime::new(vec!["sudo".into(), "docker".into()], "img:1")
    }

    #[test]
    fn image_ref_resolution() {
        let latest = ImageRef::resolve("repo/img", None).unwrap();
        assert_eq!(latest.reference, "repo/img:latest");
        assert!(!latest.version_requested);

        let pinned = ImageRef::resolve("repo/img", Some("1.2.3")).unwrap();
        assert_eq!(pinned.reference, "repo/img:1.2.3");
        assert!(pinned.version_requested);

        let tagged = ImageRef::resolve("repo/img:dev", None).unwrap();
        assert_eq!(tagged.reference, "repo/img:dev");

        let err = ImageRef::resolve("repo/img:dev", Some("1")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn run_command_orders_flags_before_image() {
        let rt = runtime().with_user(Some(ContainerUser { uid: 1000, gid: 100 }));
        let spec = rt.run_command(
            &[
                Mount::read_only("/in", IN_MOUNT),
                Mount::read_write("/tsv", TSV_MOUNT),
            ],
            Some(RULES_MOUNT),
            &[("OUT_DIR", OUT_MOUNT.to_string())],
            &[TSV_SCRIPT, "/data/in/a.vcf", TSV_MOUNT],
        );
        assert_eq!(
            spec.argv(),
            vec![
                "sudo", "docker", "run", "--rm", "--user", "1000:100", "-v", "/in:/data/in:ro",
                "-v", "/tsv:/data/tsv", "-w", "/data/rules", "-e", "OUT_DIR=/data/out", "img:1",
                TSV_SCRIPT, "/data/in/a.vcf", "/data/tsv",
            ]
        );
    }

    #[test]
    fn no_user_flag_without_identity() {
        let spec = runtime().shell_command(&[], "true");
        assert_eq!(
            spec.argv(),
            vec!["sudo", "docker", "run", "--rm", "img:1", "bash", "-lc", "true"]
        );
    }
}
