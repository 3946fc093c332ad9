#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rdfizer_core::{CompressionMethod, MethodResult};
use rdfizer_ledger::{CompressionRecord, METRICS_HEADER};

pub const RUN_ID: &str = "20240102T030405";
pub const TIMESTAMP: &str = "2024-01-02T03:04:05";

pub fn record(out_dir: &Path, output_name: &str, methods: &[CompressionMethod]) -> CompressionRecord {
    CompressionRecord {
        run_id: RUN_ID.to_string(),
        timestamp: TIMESTAMP.to_string(),
        output_name: output_name.to_string(),
        output_dir: out_dir.join(output_name),
        source_rdf_path: out_dir.join(output_name).join(format!("{output_name}.nt")),
        combined_size_bytes: 4096,
        methods: methods.to_vec(),
        results: Vec::new(),
    }
}

pub fn result(method: CompressionMethod, exit_code: i32, size: u64, path: PathBuf) -> MethodResult {
    MethodResult {
        method,
        exit_code,
        wall_seconds: Some(0.25),
        output_path: path,
        output_size_bytes: size,
    }
}

/// Header plus rows of a ledger file, as plain strings.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .expect("open ledger");
    let mut records = reader
        .records()
        .map(|record| record.expect("row").iter().map(str::to_string).collect::<Vec<_>>());
    let header = records.next().unwrap_or_default();
    (header, records.collect())
}

pub fn column(row: &[String], name: &str) -> String {
    let idx = METRICS_HEADER
        .iter()
        .position(|column| *column == name)
        .expect("known column");
    row[idx].clone()
}
