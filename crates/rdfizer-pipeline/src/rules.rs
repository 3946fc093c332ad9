//! Mapping rules template and its per-triplet rendering.

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{io_error, slugify, ErrorInfo, RdfizerError};

use crate::container::TSV_MOUNT;
use crate::triplet::Triplet;

/// Records source the template references before rendering.
pub const RECORDS_PLACEHOLDER: &str = "/data/tsv/records.tsv";
/// Header lines source in the template.
pub const HEADERS_PLACEHOLDER: &str = "/data/tsv/header_lines.tsv";
/// File metadata source in the template.
pub const METADATA_PLACEHOLDER: &str = "/data/tsv/file_metadata.tsv";

/// Directory under the metrics dir holding rendered rules.
pub const GENERATED_RULES_DIR: &str = "_generated_rules";

/// Mapping rules document with the three fixed placeholder paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesTemplate {
    text: String,
}

impl RulesTemplate {
    /// Reads the template; a missing file is a validation error.
    pub fn load(path: &Path) -> Result<Self, RdfizerError> {
        if !path.is_file() {
            return Err(RdfizerError::Validation(
                ErrorInfo::new(
                    "rules_not_found",
                    format!("rules file not found: {}", path.display()),
                )
                .with_context("path", path.display().to_string()),
            ));
        }
        let text = fs::read_to_string(path).map_err(|err| io_error("rules_read", path, err))?;
        Ok(Self { text })
    }

    /// Template from literal text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Unrendered text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces each placeholder with the triplet's file under the TSV mount.
    pub fn render(&self, triplet: &Triplet) -> String {
        let replacements = [
            (RECORDS_PLACEHOLDER, container_tsv_path(&triplet.records)),
            (HEADERS_PLACEHOLDER, container_tsv_path(&triplet.headers)),
            (METADATA_PLACEHOLDER, container_tsv_path(&triplet.metadata)),
        ];
        substitute_literals(&self.text, &replacements)
    }

    /// Writes the rendered rules to `<dir>/<slug>.rules.ttl`.
    pub fn write_for(&self, triplet: &Triplet, dir: &Path) -> Result<PathBuf, RdfizerError> {
        let path = dir.join(rendered_rules_name(&triplet.prefix));
        fs::write(&path, self.render(triplet)).map_err(|err| io_error("rules_write", &path, err))?;
        Ok(path)
    }
}

/// `<slug>.rules.ttl`
pub fn rendered_rules_name(prefix: &str) -> String {
    format!("{}.rules.ttl", slugify(prefix))
}

fn container_tsv_path(host: &Path) -> String {
    let name = host
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{TSV_MOUNT}/{name}")
}

// Single left-to-right pass so replacement text is never rescanned.
fn substitute_literals(text: &str, replacements: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let next = replacements
            .iter()
            .filter_map(|(needle, value)| rest.find(*needle).map(|at| (at, *needle, value)))
            .min_by_key(|(at, _, _)| *at);
        match next {
            Some((at, needle, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + needle.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}
