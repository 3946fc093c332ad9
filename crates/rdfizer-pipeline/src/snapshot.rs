//! Immutable view of the VCF inputs a run processes.

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{io_error, ErrorInfo, RdfizerError};

use crate::container::IN_MOUNT;

/// One VCF captured at run start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Absolute host path.
    pub host_path: PathBuf,
    /// Path of the file inside the input mount.
    pub container_path: String,
    /// Output prefix derived from the file name; may collide with others.
    pub prefix: String,
}

/// Ordered input files plus the directory mounted at `/data/in`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Host directory bound to `/data/in`.
    pub mount_root: PathBuf,
    /// Inputs in processing order.
    pub files: Vec<InputFile>,
    /// `IN_VCF` value handed to the conversion step.
    pub metrics_target: String,
}

impl InputSnapshot {
    /// Prefix of every file, in order, duplicates included.
    pub fn expected_prefixes(&self) -> Vec<String> {
        self.files.iter().map(|file| file.prefix.clone()).collect()
    }

    /// Host path of every file, in order.
    pub fn host_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|file| file.host_path.clone()).collect()
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True when there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// `.vcf` or `.vcf.gz` by name.
pub fn is_vcf_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".vcf") || name.ends_with(".vcf.gz"))
        .unwrap_or(false)
}

/// Strips `.vcf.gz` or `.vcf`; other names fall back to the file stem.
pub fn vcf_output_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(prefix) = name.strip_suffix(".vcf.gz") {
        return prefix.to_string();
    }
    if let Some(prefix) = name.strip_suffix(".vcf") {
        return prefix.to_string();
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Regular `.vcf` / `.vcf.gz` files directly inside `dir`, sorted by name.
pub fn list_vcfs_in_dir(dir: &Path) -> Result<Vec<PathBuf>, RdfizerError> {
    let entries = fs::read_dir(dir).map_err(|err| io_error("input_list", dir, err))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| io_error("input_list", dir, err))?.path();
        if path.is_file() && is_vcf_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn input_file(path: PathBuf) -> InputFile {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    InputFile {
        container_path: format!("{IN_MOUNT}/{name}"),
        prefix: vcf_output_prefix(&path),
        host_path: path,
    }
}

/// Captures the inputs behind `input` once; later filesystem changes are not
/// observed by the run.
pub fn resolve_input_snapshot(input: &Path) -> Result<InputSnapshot, RdfizerError> {
    if !input.exists() {
        return Err(RdfizerError::Validation(
            ErrorInfo::new(
                "input_not_found",
                format!("Input path not found: {}", input.display()),
            )
            .with_context("path", input.display().to_string()),
        ));
    }

    if input.is_file() {
        if !is_vcf_file(input) {
            return Err(RdfizerError::Validation(
                ErrorInfo::new("invalid_input", "Input file must end with .vcf or .vcf.gz")
                    .with_context("path", input.display().to_string()),
            ));
        }
        let file = input_file(input.to_path_buf());
        return Ok(InputSnapshot {
            mount_root: input.parent().map(Path::to_path_buf).unwrap_or_default(),
            metrics_target: file.container_path.clone(),
            files: vec![file],
        });
    }

    if input.is_dir() {
        let files = list_vcfs_in_dir(input)?;
        if files.is_empty() {
            return Err(RdfizerError::Validation(
                ErrorInfo::new(
                    "no_input_files",
                    format!(
                        "No .vcf or .vcf.gz files found in the input directory {}",
                        input.display()
                    ),
                )
                .with_context("dir", input.display().to_string()),
            ));
        }
        return Ok(InputSnapshot {
            mount_root: input.to_path_buf(),
            files: files.into_iter().map(input_file).collect(),
            metrics_target: IN_MOUNT.to_string(),
        });
    }

    Err(RdfizerError::validation(
        "invalid_input",
        "Input path must be a file or a directory",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_strips_known_suffixes() {
        assert_eq!(vcf_output_prefix(Path::new("/x/sample.vcf")), "sample");
        assert_eq!(vcf_output_prefix(Path::new("/x/sample.vcf.gz")), "sample");
        assert_eq!(vcf_output_prefix(Path::new("/x/sample.v1.vcf.gz")), "sample.v1");
        assert_eq!(vcf_output_prefix(Path::new("/x/notes.txt")), "notes");
    }

    #[test]
    fn vcf_detection_is_suffix_based() {
        assert!(is_vcf_file(Path::new("a.vcf")));
        assert!(is_vcf_file(Path::new("a.vcf.gz")));
        assert!(!is_vcf_file(Path::new("a.vcf.bak")));
        assert!(!is_vcf_file(Path::new("a.gz")));
    }
}
