//! Per-output JSON snapshot and per-method time logs next to the ledger.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rdfizer_core::{methods_label, safe_metrics_name, CompressionMethod, ErrorInfo, RdfizerError};
use serde_json::{json, Map, Value};

use crate::record::CompressionRecord;
use crate::schema::format_seconds;

fn artifact_error(code: &str, path: &Path, err: impl ToString) -> RdfizerError {
    RdfizerError::Ledger(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Files written by [`write_compression_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Per-output JSON snapshot.
    pub metrics_json: PathBuf,
    /// One text log per method that ran.
    pub time_logs: Vec<PathBuf>,
}

/// `compression-metrics-<safe-name>-<run_id>.json`
pub fn metrics_json_name(output_name: &str, run_id: &str) -> String {
    format!(
        "compression-metrics-{}-{run_id}.json",
        safe_metrics_name(output_name)
    )
}

/// `compression-time-<method>-<safe-name>-<run_id>.txt`
pub fn time_log_name(method: CompressionMethod, output_name: &str, run_id: &str) -> String {
    format!(
        "compression-time-{}-{}-{run_id}.txt",
        method.token(),
        safe_metrics_name(output_name)
    )
}

/// Builds the JSON snapshot document for one (run, output).
pub fn compression_metrics_document(record: &CompressionRecord) -> Value {
    let mut doc = Map::new();
    doc.insert("run_id".into(), json!(record.run_id));
    doc.insert("timestamp".into(), json!(record.timestamp));
    let output_dir = record
        .source_rdf_path
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    doc.insert("output_dir".into(), json!(output_dir));
    doc.insert("output_name".into(), json!(record.output_name));
    doc.insert(
        "compression_methods".into(),
        json!(methods_label(&record.methods, ",")),
    );
    doc.insert(
        "combined_nq_path".into(),
        json!(record.source_rdf_path.display().to_string()),
    );
    doc.insert(
        "combined_nq_size_bytes".into(),
        json!(record.combined_size_bytes),
    );
    for method in CompressionMethod::ALL {
        let result = record.result_for(method);
        let label = method.json_label();
        let mut section = Map::new();
        section.insert(
            format!("output_{label}_path"),
            json!(result
                .map(|r| r.output_path.display().to_string())
                .unwrap_or_default()),
        );
        section.insert(
            format!("output_{label}_size_bytes"),
            json!(result.map(|r| r.output_size_bytes).unwrap_or(0)),
        );
        section.insert(
            "exit_code".into(),
            json!(result.map(|r| r.exit_code).unwrap_or(0)),
        );
        section.insert(
            "timing".into(),
            json!({
                "wall_seconds": result.and_then(|r| r.wall_seconds),
                "user_seconds": null,
                "sys_seconds": null,
                "max_rss_kb": null,
            }),
        );
        doc.insert(method.json_section().into(), Value::Object(section));
    }
    Value::Object(doc)
}

/// Writes the JSON snapshot and one `key=value` time log per executed method.
pub fn write_compression_artifacts(
    metrics_dir: &Path,
    record: &CompressionRecord,
) -> Result<ArtifactPaths, RdfizerError> {
    fs::create_dir_all(metrics_dir)
        .map_err(|err| artifact_error("artifact_dir", metrics_dir, err))?;

    let mut time_logs = Vec::with_capacity(record.results.len());
    for result in &record.results {
        let path = metrics_dir.join(time_log_name(
            result.method,
            &record.output_name,
            &record.run_id,
        ));
        let wall = format_seconds(result.wall_seconds);
        let body = format!(
            "method={}\nexit_code={}\nwall_seconds={}\noutput_path={}\noutput_size_bytes={}\n",
            result.method.token(),
            result.exit_code,
            wall,
            result.output_path.display(),
            result.output_size_bytes,
        );
        write_text(&path, &body)?;
        time_logs.push(path);
    }

    let metrics_json = metrics_dir.join(metrics_json_name(&record.output_name, &record.run_id));
    let mut bytes = serde_json::to_vec_pretty(&compression_metrics_document(record))
        .map_err(|err| artifact_error("artifact_json", &metrics_json, err))?;
    bytes.push(b'\n');
    fs::write(&metrics_json, bytes).map_err(|err| write_failure(&metrics_json, err))?;

    Ok(ArtifactPaths {
        metrics_json,
        time_logs,
    })
}

fn write_text(path: &Path, body: &str) -> Result<(), RdfizerError> {
    fs::write(path, body).map_err(|err| write_failure(path, err))
}

fn write_failure(path: &Path, err: io::Error) -> RdfizerError {
    let denied = err.kind() == io::ErrorKind::PermissionDenied;
    let mut info = ErrorInfo::new("artifact_write", err.to_string())
        .with_context("path", path.display().to_string());
    if denied {
        info = info.with_hint("unable to write compression metrics due to file permissions");
    }
    RdfizerError::Ledger(info)
}
