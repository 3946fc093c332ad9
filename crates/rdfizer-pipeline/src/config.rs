//! Settings shared by every mode, loaded from YAML and overridden by flags.

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{io_error, parse_compression_methods, CompressionMethod, ErrorInfo, RdfizerError};
use serde::{Deserialize, Serialize};

use crate::container::{ContainerRuntime, ContainerUser, ImagePolicy, ImageRef};

/// Environment switch for passing `--user uid:gid` to the container.
pub const DOCKER_AS_USER_ENV: &str = "VCF_RDFIZER_DOCKER_AS_USER";

/// Settings shared by every mode. CLI flags override values loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory receiving RDF and compressed outputs.
    pub out_dir: PathBuf,
    /// Directory for TSV intermediates.
    pub tsv_dir: PathBuf,
    /// Directory for the ledger, artifacts and logs.
    pub metrics_dir: PathBuf,
    /// Mapping rules template.
    pub rules: PathBuf,
    /// Image repository or full reference.
    pub image: String,
    /// Tag appended to an untagged `image`.
    pub image_version: Option<String>,
    /// Comma separated compression methods, or `none`.
    pub compression: String,
    /// Leave the TSV scratch directory in place.
    pub keep_tsv: bool,
    /// Leave the raw RDF next to its compressed forms.
    pub keep_rdf: bool,
    /// Build the image before anything else.
    pub build: bool,
    /// Never build the image.
    pub no_build: bool,
    /// Log a storage estimate before converting.
    pub estimate_size: bool,
    /// Run containers as the invoking user.
    pub docker_as_user: bool,
    /// Container CLI prefix.
    pub container_cli: Vec<String>,
    /// Directory holding the Dockerfile for image builds.
    pub build_context: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("./out"),
            tsv_dir: PathBuf::from("./tsv"),
            metrics_dir: PathBuf::from("./run_metrics"),
            rules: PathBuf::from("rules/default_rules.ttl"),
            image: "ecrum19/vcf-rdfizer".to_string(),
            image_version: None,
            compression: "gzip,brotli,hdt".to_string(),
            keep_tsv: false,
            keep_rdf: false,
            build: false,
            no_build: false,
            estimate_size: false,
            docker_as_user: true,
            container_cli: vec!["sudo".to_string(), "docker".to_string()],
            build_context: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Parses YAML; absent keys keep their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, RdfizerError> {
        serde_yaml::from_str(text).map_err(|err| {
            RdfizerError::Validation(ErrorInfo::new("config_parse", err.to_string()))
        })
    }

    /// Reads and parses a YAML config file.
    pub fn load_yaml(path: &Path) -> Result<Self, RdfizerError> {
        let text = fs::read_to_string(path).map_err(|err| io_error("config_read", path, err))?;
        Self::from_yaml_str(&text).map_err(|err| match err {
            RdfizerError::Validation(info) => RdfizerError::Validation(
                info.with_context("path", path.display().to_string()),
            ),
            other => other,
        })
    }

    /// Applies the value of [`DOCKER_AS_USER_ENV`], when set.
    pub fn apply_docker_as_user(&mut self, raw: Option<&str>) {
        if let Some(raw) = raw {
            self.docker_as_user = docker_as_user_enabled(raw);
        }
    }

    /// Parsed `compression` list.
    pub fn methods(&self) -> Result<Vec<CompressionMethod>, RdfizerError> {
        parse_compression_methods(&self.compression)
    }

    /// Resolved `image` / `image_version` pair.
    pub fn image_ref(&self) -> Result<ImageRef, RdfizerError> {
        ImageRef::resolve(&self.image, self.image_version.as_deref())
    }

    /// Anchors every relative path at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.out_dir,
            &mut self.tsv_dir,
            &mut self.metrics_dir,
            &mut self.rules,
            &mut self.build_context,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Build flags for [`crate::ensure_image_available`].
    pub fn image_policy(&self) -> ImagePolicy {
        ImagePolicy {
            build: self.build,
            no_build: self.no_build,
            build_context: self.build_context.clone(),
        }
    }

    /// `metrics.csv` inside the metrics directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.metrics_dir.join(rdfizer_ledger::LEDGER_FILE_NAME)
    }

    /// Identity for `--user`: the invoking process, unless disabled.
    pub fn container_user(&self) -> Option<ContainerUser> {
        if self.docker_as_user {
            ContainerUser::current()
        } else {
            None
        }
    }

    /// Container runtime for `image` carrying [`Self::container_user`].
    pub fn container_runtime(&self, image: &ImageRef) -> ContainerRuntime {
        ContainerRuntime::new(self.container_cli.clone(), image.reference.clone())
            .with_user(self.container_user())
    }

    /// Rejects contradictory build flags.
    pub fn validate_flags(&self) -> Result<(), RdfizerError> {
        if self.build && self.no_build {
            return Err(RdfizerError::validation(
                "build_flag_conflict",
                "--build and --no-build are mutually exclusive.",
            ));
        }
        Ok(())
    }
}

/// `0`, `false` and `no` (any case) disable the user mapping.
pub fn docker_as_user_enabled(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no")
}

/// Fails when any path exists but is not a directory.
pub fn validate_mode_dirs(paths: &[&Path]) -> Result<(), RdfizerError> {
    for path in paths {
        if path.exists() && !path.is_dir() {
            return Err(RdfizerError::Validation(
                ErrorInfo::new(
                    "expected_directory",
                    format!("expected a directory path but found a file: {}", path.display()),
                )
                .with_context("path", path.display().to_string()),
            ));
        }
    }
    Ok(())
}
