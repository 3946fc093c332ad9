//! Rough preflight storage estimate.

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{io_error, RdfizerError};
use tracing::{info, warn};

/// Assumed inflation of a `.vcf.gz` input.
pub const COMPRESSED_VCF_EXPANSION_FACTOR: f64 = 5.0;
/// TSV size relative to the uncompressed VCF.
pub const TSV_OVERHEAD_FACTOR: f64 = 1.10;
/// Lower bound of N-Triples size relative to the uncompressed VCF.
pub const RDF_EXPANSION_LOW_FACTOR: f64 = 4.0;
/// Upper bound of N-Triples size relative to the uncompressed VCF.
pub const RDF_EXPANSION_HIGH_FACTOR: f64 = 12.0;

/// Byte totals over every input of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeEstimate {
    /// Sum of on-disk input sizes.
    pub input_bytes: u64,
    /// Expected TSV intermediates.
    pub tsv_bytes: u64,
    /// Lower RDF bound.
    pub rdf_low_bytes: u64,
    /// Upper RDF bound.
    pub rdf_high_bytes: u64,
}

/// Space available to this user on the filesystem holding the outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSpace {
    /// Closest existing ancestor of the output directory.
    pub anchor: PathBuf,
    /// Bytes writable by an unprivileged user.
    pub available_bytes: u64,
}

impl SizeEstimate {
    /// True when the upper RDF bound does not fit in `disk`.
    pub fn exceeds(&self, disk: &DiskSpace) -> bool {
        self.rdf_high_bytes > disk.available_bytes
    }

    /// Logs the estimate, plus free space and a shortage warning when
    /// `disk` is known.
    pub fn log(&self, disk: Option<&DiskSpace>) {
        info!("Preflight size estimate (rough):");
        info!("  - Input VCF size: {}", format_bytes(self.input_bytes));
        info!(
            "  - Estimated TSV intermediate size: {}",
            format_bytes(self.tsv_bytes)
        );
        info!(
            "  - Estimated RDF N-Triples size: {} to {}",
            format_bytes(self.rdf_low_bytes),
            format_bytes(self.rdf_high_bytes)
        );
        let Some(disk) = disk else {
            return;
        };
        info!(
            "  - Free disk space at {}: {}",
            disk.anchor.display(),
            format_bytes(disk.available_bytes)
        );
        if self.exceeds(disk) {
            warn!(
                "Estimated upper-bound RDF size exceeds currently free disk. You may run out of space."
            );
        }
    }
}

/// First of `path` and its ancestors that exists.
pub fn nearest_existing_ancestor(path: &Path) -> &Path {
    path.ancestors()
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| Path::new("."))
}

/// Free space for `out_dir`, measured at its nearest existing ancestor
/// since the directory itself may not be created yet.
pub fn disk_space_for(out_dir: &Path) -> Result<DiskSpace, RdfizerError> {
    let anchor = nearest_existing_ancestor(out_dir);
    let available_bytes =
        fs2::available_space(anchor).map_err(|err| io_error("disk_space", anchor, err))?;
    Ok(DiskSpace {
        anchor: anchor.to_path_buf(),
        available_bytes,
    })
}

/// Sums sizes over `files`, inflating `.vcf.gz` inputs before applying the
/// TSV and RDF factors.
pub fn estimate_pipeline_sizes<P: AsRef<Path>>(files: &[P]) -> Result<SizeEstimate, RdfizerError> {
    let mut input = 0u64;
    let (mut tsv, mut low, mut high) = (0.0f64, 0.0f64, 0.0f64);
    for file in files {
        let path = file.as_ref();
        let size = fs::metadata(path)
            .map_err(|err| io_error("estimate_stat", path, err))?
            .len();
        input += size;
        let compressed = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".vcf.gz"));
        let expanded = if compressed {
            size as f64 * COMPRESSED_VCF_EXPANSION_FACTOR
        } else {
            size as f64
        };
        tsv += expanded * TSV_OVERHEAD_FACTOR;
        low += expanded * RDF_EXPANSION_LOW_FACTOR;
        high += expanded * RDF_EXPANSION_HIGH_FACTOR;
    }
    Ok(SizeEstimate {
        input_bytes: input,
        tsv_bytes: tsv as u64,
        rdf_low_bytes: low as u64,
        rdf_high_bytes: high as u64,
    })
}

/// Binary-unit rendering: whole bytes below 1 KB, two decimals above.
pub fn format_bytes(num_bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
    let mut value = num_bytes as f64;
    for (idx, unit) in UNITS.iter().enumerate() {
        if value < 1024.0 || idx == UNITS.len() - 1 {
            if idx == 0 {
                return format!("{num_bytes} {unit}");
            }
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{num_bytes} B")
}
