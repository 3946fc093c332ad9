//! Discovery of per-VCF TSV triplets and matching against the snapshot.

use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use rdfizer_core::{ErrorInfo, RdfizerError};
use tracing::{debug, info};

/// Suffix of the records file; the prefix is whatever precedes it.
pub const RECORDS_SUFFIX: &str = ".records.tsv";
/// Suffix of the header lines sibling.
pub const HEADERS_SUFFIX: &str = ".header_lines.tsv";
/// Suffix of the file metadata sibling.
pub const METADATA_SUFFIX: &str = ".file_metadata.tsv";

/// Records, header lines and file metadata produced for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triplet {
    /// Shared file name prefix.
    pub prefix: String,
    /// `<prefix>.records.tsv`.
    pub records: PathBuf,
    /// `<prefix>.header_lines.tsv`.
    pub headers: PathBuf,
    /// `<prefix>.file_metadata.tsv`.
    pub metadata: PathBuf,
}

impl Triplet {
    /// Records, headers, metadata.
    pub fn files(&self) -> [&Path; 3] {
        [&self.records, &self.headers, &self.metadata]
    }
}

/// Split of discovered triplets into the ones this run expects and the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripletMatch {
    /// One entry per expected prefix, in expected order.
    pub matched: Vec<Triplet>,
    /// Triplets of other inputs of the same run.
    pub pending: Vec<Triplet>,
    /// Triplets left behind by other runs sharing the directory.
    pub ignored: Vec<Triplet>,
}

fn sorted_glob(dir: &Path, file_pattern: &str) -> Result<Vec<PathBuf>, RdfizerError> {
    let dir_text = dir.to_str().ok_or_else(|| {
        RdfizerError::Discovery(
            ErrorInfo::new("tsv_dir_not_utf8", "TSV directory path is not valid UTF-8")
                .with_context("dir", dir.display().to_string()),
        )
    })?;
    let pattern = format!("{}/{file_pattern}", Pattern::escape(dir_text));
    let entries = glob(&pattern).map_err(|err| {
        RdfizerError::Discovery(
            ErrorInfo::new("tsv_glob", err.to_string()).with_context("pattern", pattern.clone()),
        )
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| {
            RdfizerError::Discovery(
                ErrorInfo::new("tsv_glob", err.to_string())
                    .with_context("dir", dir.display().to_string()),
            )
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn missing_sibling(kind: &str, prefix: &str, path: &Path) -> RdfizerError {
    RdfizerError::Discovery(
        ErrorInfo::new(
            "missing_triplet_sibling",
            format!("Missing {kind} TSV for '{prefix}': {}", path.display()),
        )
        .with_context("prefix", prefix)
        .with_context("missing", path.display().to_string()),
    )
}

/// Lists every complete triplet in `tsv_dir`, sorted by records file name.
///
/// A records file without both siblings is an error naming the missing
/// file; a directory without any records file is an error listing the
/// `*.tsv` files that are present.
pub fn discover_tsv_triplets(tsv_dir: &Path) -> Result<Vec<Triplet>, RdfizerError> {
    let mut triplets = Vec::new();
    for records in sorted_glob(tsv_dir, &format!("*{RECORDS_SUFFIX}"))? {
        let name = records
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix = name
            .strip_suffix(RECORDS_SUFFIX)
            .unwrap_or(name.as_str())
            .to_string();
        let headers = tsv_dir.join(format!("{prefix}{HEADERS_SUFFIX}"));
        let metadata = tsv_dir.join(format!("{prefix}{METADATA_SUFFIX}"));
        if !headers.exists() {
            return Err(missing_sibling("header", &prefix, &headers));
        }
        if !metadata.exists() {
            return Err(missing_sibling("metadata", &prefix, &metadata));
        }
        triplets.push(Triplet {
            prefix,
            records,
            headers,
            metadata,
        });
    }

    if !triplets.is_empty() {
        return Ok(triplets);
    }

    let present: Vec<String> = sorted_glob(tsv_dir, "*.tsv")?
        .iter()
        .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .collect();
    let preview = if present.is_empty() {
        "(none)".to_string()
    } else {
        present.join(", ")
    };
    Err(RdfizerError::Discovery(
        ErrorInfo::new(
            "no_records_tsv",
            format!(
                "No per-VCF records TSV files found in {}. Expected '*{RECORDS_SUFFIX}'. Found: {preview}",
                tsv_dir.display()
            ),
        )
        .with_context("dir", tsv_dir.display().to_string()),
    ))
}

/// Binds each expected prefix to its discovered triplet.
///
/// Discovered triplets outside the expected set are ignored; an expected
/// prefix without a triplet is fatal.
pub fn match_triplets(
    discovered: Vec<Triplet>,
    expected: &[String],
) -> Result<TripletMatch, RdfizerError> {
    bind_triplets(discovered, expected, expected)
}

/// Binds the triplet of one input while other inputs of the run share the
/// TSV directory.
///
/// Triplets whose prefix belongs to `run_prefixes` land in `pending` rather
/// than `ignored`: they are the run's own, converted earlier or kept.
pub fn match_input_triplet(
    discovered: Vec<Triplet>,
    prefix: &str,
    run_prefixes: &[String],
) -> Result<TripletMatch, RdfizerError> {
    bind_triplets(discovered, &[prefix.to_string()], run_prefixes)
}

fn bind_triplets(
    discovered: Vec<Triplet>,
    expected: &[String],
    run_prefixes: &[String],
) -> Result<TripletMatch, RdfizerError> {
    let mut matched = Vec::with_capacity(expected.len());
    for prefix in expected {
        let triplet = discovered
            .iter()
            .find(|triplet| &triplet.prefix == prefix)
            .ok_or_else(|| {
                RdfizerError::Discovery(
                    ErrorInfo::new(
                        "expected_triplet_missing",
                        format!(
                            "TSV conversion did not produce the expected triplet for '{prefix}'."
                        ),
                    )
                    .with_context("prefix", prefix.as_str()),
                )
            })?;
        info!(prefix = %triplet.prefix, records = %triplet.records.display(), "matched triplet");
        matched.push(triplet.clone());
    }

    let mut pending = Vec::new();
    let mut ignored = Vec::new();
    for triplet in discovered {
        if expected.contains(&triplet.prefix) {
            continue;
        }
        if run_prefixes.contains(&triplet.prefix) {
            debug!(prefix = %triplet.prefix, "triplet belongs to another input of this run");
            pending.push(triplet);
        } else {
            info!(prefix = %triplet.prefix, "ignoring unrelated triplet");
            ignored.push(triplet);
        }
    }
    Ok(TripletMatch {
        matched,
        pending,
        ignored,
    })
}
