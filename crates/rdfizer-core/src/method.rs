//! Closed set of compression methods and the table driving their naming,
//! ledger columns and container commands.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, RdfizerError};
use crate::exec::shell_quote;

const HDT_HOME: &str = "/opt/hdt-java/hdt-java-cli";

/// Compression methods supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// `gzip`, keeps the RDF extension (`<stem>.<ext>.gz`).
    Gzip,
    /// `brotli`, keeps the RDF extension (`<stem>.<ext>.br`).
    Brotli,
    /// HDT conversion, always `<stem>.hdt`.
    Hdt,
}

struct MethodSpec {
    token: &'static str,
    suffix: &'static str,
    keeps_rdf_extension: bool,
    json_section: &'static str,
    json_label: &'static str,
}

const GZIP: MethodSpec = MethodSpec {
    token: "gzip",
    suffix: "gz",
    keeps_rdf_extension: true,
    json_section: "gzip",
    json_label: "gz",
};

const BROTLI: MethodSpec = MethodSpec {
    token: "brotli",
    suffix: "br",
    keeps_rdf_extension: true,
    json_section: "brotli",
    json_label: "brotli",
};

const HDT: MethodSpec = MethodSpec {
    token: "hdt",
    suffix: "hdt",
    keeps_rdf_extension: false,
    json_section: "hdt_conversion",
    json_label: "hdt",
};

impl CompressionMethod {
    /// Every method in canonical ledger order.
    pub const ALL: [CompressionMethod; 3] = [
        CompressionMethod::Gzip,
        CompressionMethod::Brotli,
        CompressionMethod::Hdt,
    ];

    fn spec(self) -> &'static MethodSpec {
        match self {
            CompressionMethod::Gzip => &GZIP,
            CompressionMethod::Brotli => &BROTLI,
            CompressionMethod::Hdt => &HDT,
        }
    }

    /// CLI token, also the stem of the method's ledger columns.
    pub fn token(self) -> &'static str {
        self.spec().token
    }

    /// Parses a CLI token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.token() == token)
    }

    /// Key of the method's section in the JSON metrics artifact.
    pub fn json_section(self) -> &'static str {
        self.spec().json_section
    }

    /// Label used in the JSON section's path and size field names.
    pub fn json_label(self) -> &'static str {
        self.spec().json_label
    }

    /// `<method>_size_bytes`.
    pub fn size_column(self) -> String {
        format!("{}_size_bytes", self.token())
    }

    /// `exit_code_<method>`.
    pub fn exit_code_column(self) -> String {
        format!("exit_code_{}", self.token())
    }

    /// `wall_seconds_<method>`.
    pub fn wall_seconds_column(self) -> String {
        format!("wall_seconds_{}", self.token())
    }

    /// Timing columns reserved for user/sys/rss measurements.
    pub fn reserved_timing_columns(self) -> [String; 3] {
        [
            format!("user_seconds_{}", self.token()),
            format!("sys_seconds_{}", self.token()),
            format!("max_rss_kb_{}", self.token()),
        ]
    }

    /// Compressed artifact name for an RDF file with the given stem and extension.
    pub fn compressed_file_name(self, stem: &str, rdf_extension: &str) -> String {
        let spec = self.spec();
        if spec.keeps_rdf_extension {
            format!("{stem}.{rdf_extension}.{}", spec.suffix)
        } else {
            format!("{stem}.{}", spec.suffix)
        }
    }

    /// Detects the method that produced a compressed file from its name.
    pub fn detect(path: &Path) -> Result<Self, RdfizerError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Ok(CompressionMethod::Gzip),
            Some("br") => Ok(CompressionMethod::Brotli),
            Some("hdt") => Ok(CompressionMethod::Hdt),
            _ => Err(RdfizerError::Validation(
                ErrorInfo::new(
                    "unknown_compressed_extension",
                    "Compressed input must end with .gz, .br, or .hdt",
                )
                .with_context("path", path.display().to_string()),
            )),
        }
    }

    /// Default decompressed file name for a file produced by this method.
    ///
    /// `.nq.<suffix>` and `.nt.<suffix>` keep their RDF extension; anything
    /// else becomes `<stem>.nt`.
    pub fn decompressed_file_name(self, compressed: &Path) -> String {
        let name = compressed
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = compressed
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let spec = self.spec();
        if spec.keeps_rdf_extension {
            for rdf_ext in ["nq", "nt"] {
                let double = format!(".{rdf_ext}.{}", spec.suffix);
                if name.ends_with(&double) {
                    return stem;
                }
            }
        }
        format!("{stem}.nt")
    }

    /// In-container shell command compressing `input` into `output`.
    pub fn compress_script(self, input: &str, output: &str) -> String {
        let (input, output) = (shell_quote(input), shell_quote(output));
        match self {
            CompressionMethod::Gzip => format!("gzip -c {input} > {output}"),
            CompressionMethod::Brotli => format!("brotli -q 7 -c {input} > {output}"),
            CompressionMethod::Hdt => hdt_script("rdf2hdt.sh", &input, &output),
        }
    }

    /// In-container shell command restoring RDF from `input` into `output`.
    pub fn decompress_script(self, input: &str, output: &str) -> String {
        let (input, output) = (shell_quote(input), shell_quote(output));
        match self {
            CompressionMethod::Gzip => format!("gzip -dc {input} > {output}"),
            CompressionMethod::Brotli => format!("brotli -d -c {input} > {output}"),
            CompressionMethod::Hdt => hdt_script("hdt2rdf.sh", &input, &output),
        }
    }
}

fn hdt_script(tool: &str, input: &str, output: &str) -> String {
    format!(
        "set -euo pipefail; \
         HDT_BIN={HDT_HOME}/bin/{tool}; \
         HDT_PROJECT_DIR={HDT_HOME}; \
         if [[ ! -x \"$HDT_BIN\" ]]; then echo \"Missing {tool} at $HDT_BIN\" >&2; exit 127; fi; \
         if ! command -v java >/dev/null 2>&1; then echo \"Java runtime not found on PATH\" >&2; exit 127; fi; \
         if [[ -f \"$HDT_PROJECT_DIR/pom.xml\" ]]; then cd \"$HDT_PROJECT_DIR\"; fi; \
         bash \"$HDT_BIN\" {input} {output}"
    )
}

/// Parses a comma separated method list; empty or `none` selects nothing.
///
/// Order is preserved and duplicates keep their first position.
pub fn parse_compression_methods(raw: &str) -> Result<Vec<CompressionMethod>, RdfizerError> {
    let value = raw.trim();
    if value.is_empty() || value == "none" {
        return Ok(Vec::new());
    }
    let mut methods = Vec::new();
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let method = CompressionMethod::from_token(token).ok_or_else(|| {
            RdfizerError::Validation(
                ErrorInfo::new(
                    "unsupported_compression_method",
                    format!("Unsupported compression method '{token}'. Use gzip,brotli,hdt, or none."),
                )
                .with_context("method", token),
            )
        })?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    Ok(methods)
}

/// Joins method tokens with `separator`, or `none` when the list is empty.
pub fn methods_label(methods: &[CompressionMethod], separator: &str) -> String {
    if methods.is_empty() {
        return "none".to_string();
    }
    methods
        .iter()
        .map(|method| method.token())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Outcome of executing one method for one RDF source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    /// Method that ran.
    pub method: CompressionMethod,
    /// Exit code of the external tool.
    pub exit_code: i32,
    /// Wall clock seconds, when measured.
    pub wall_seconds: Option<f64>,
    /// Host path of the expected output.
    pub output_path: PathBuf,
    /// Size of the output on disk, zero when missing.
    pub output_size_bytes: u64,
}
