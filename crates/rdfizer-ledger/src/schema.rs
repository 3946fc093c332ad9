//! Canonical column order of the run-metrics CSV.

/// Columns of `metrics.csv`, in the only order the ledger ever writes.
pub const METRICS_HEADER: [&str; 36] = [
    "run_id",
    "timestamp",
    "output_name",
    "output_dir",
    "exit_code_java",
    "wall_seconds_java",
    "user_seconds_java",
    "sys_seconds_java",
    "max_rss_kb_java",
    "input_mapping_size_bytes",
    "input_vcf_size_bytes",
    "output_dir_size_bytes",
    "output_triples",
    "jar",
    "mapping_file",
    "output_path",
    "combined_nq_size_bytes",
    "gzip_size_bytes",
    "brotli_size_bytes",
    "hdt_size_bytes",
    "exit_code_gzip",
    "exit_code_brotli",
    "exit_code_hdt",
    "wall_seconds_gzip",
    "user_seconds_gzip",
    "sys_seconds_gzip",
    "max_rss_kb_gzip",
    "wall_seconds_brotli",
    "user_seconds_brotli",
    "sys_seconds_brotli",
    "max_rss_kb_brotli",
    "wall_seconds_hdt",
    "user_seconds_hdt",
    "sys_seconds_hdt",
    "max_rss_kb_hdt",
    "compression_methods",
];

/// Sentinel written for timings that were not measured.
pub const NULL_FIELD: &str = "null";

/// Position of `column` in [`METRICS_HEADER`].
pub fn column_index(column: &str) -> Option<usize> {
    METRICS_HEADER.iter().position(|name| *name == column)
}

/// True when `header` matches the canonical schema name for name and in order.
pub fn header_is_canonical<S: AsRef<str>>(header: &[S]) -> bool {
    header.len() == METRICS_HEADER.len()
        && header
            .iter()
            .zip(METRICS_HEADER.iter())
            .all(|(found, expected)| found.as_ref() == *expected)
}

/// Seconds with six decimals, or the `null` sentinel.
pub fn format_seconds(value: Option<f64>) -> String {
    match value {
        Some(seconds) => format!("{seconds:.6}"),
        None => NULL_FIELD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdfizer_core::CompressionMethod;

    #[test]
    fn method_columns_exist_in_schema() {
        for method in CompressionMethod::ALL {
            assert!(column_index(&method.size_column()).is_some());
            assert!(column_index(&method.exit_code_column()).is_some());
            assert!(column_index(&method.wall_seconds_column()).is_some());
            for column in method.reserved_timing_columns() {
                assert!(column_index(&column).is_some(), "{column}");
            }
        }
    }

    #[test]
    fn reordered_header_is_not_canonical() {
        let mut header: Vec<&str> = METRICS_HEADER.to_vec();
        assert!(header_is_canonical(&header));
        header.swap(0, 1);
        assert!(!header_is_canonical(&header));
        assert!(!header_is_canonical(&METRICS_HEADER[..35]));
    }

    #[test]
    fn seconds_use_six_decimals_or_null() {
        assert_eq!(format_seconds(Some(1.5)), "1.500000");
        assert_eq!(format_seconds(None), "null");
    }
}
