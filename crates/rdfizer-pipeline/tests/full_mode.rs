mod common;

use std::fs;

use common::{ledger_column, read_ledger, triplet_files, write_triplet, Fixture, ScriptedRunner, RUN_ID};
use rdfizer_core::{CommandLog, CompressionMethod, ExecContext, RdfizerError};
use rdfizer_pipeline::{
    resolve_input_snapshot, run_full_mode, FullReport, FullRun, InputSnapshot, RdfRetention,
    RulesTemplate, ScratchOutcome,
};

const TEMPLATE: &str = "<#records> rml:source \"/data/tsv/records.tsv\" .\n\
<#headers> rml:source \"/data/tsv/header_lines.tsv\" .\n\
<#meta> rml:source \"/data/tsv/file_metadata.tsv\" .\n";

fn run(
    fx: &Fixture,
    runner: &mut ScriptedRunner,
    snapshot: &InputSnapshot,
    methods: &[CompressionMethod],
) -> Result<FullReport, RdfizerError> {
    let rules = RulesTemplate::from_text(TEMPLATE);
    let mut ctx = ExecContext::new(runner, CommandLog::memory());
    run_full_mode(
        &mut ctx,
        FullRun {
            snapshot,
            rules: &rules,
            config: &fx.config,
            methods,
            identity: &fx.identity,
            runtime: &fx.runtime,
        },
    )
}

/// Runner producing TSV triplets and `.nt` output for each prefix.
fn producing(fx: &Fixture, prefixes: &[&str]) -> ScriptedRunner {
    let mut runner = ScriptedRunner::new();
    for prefix in prefixes {
        runner = runner
            .on_creating(
                &format!("vcf_as_tsv.sh /data/in/{prefix}.vcf "),
                0,
                triplet_files(&fx.config.tsv_dir, prefix),
            )
            .on_creating(
                &format!("OUT_NAME={prefix} "),
                0,
                vec![(
                    fx.config.out_dir.join(prefix).join(format!("{prefix}.nt")),
                    "<a> <b> <c> .\n".to_string(),
                )],
            )
            .on_creating(
                &format!("gzip -c /data/in/{prefix}.nt "),
                0,
                vec![(
                    fx.config.out_dir.join(prefix).join(format!("{prefix}.nt.gz")),
                    "gz".to_string(),
                )],
            );
    }
    runner
}

#[test]
fn inputs_run_in_snapshot_order_and_stale_triplets_survive() {
    let fx = Fixture::new();
    fx.write("in/b.vcf", "");
    fx.write("in/a.vcf", "");
    write_triplet(&fx.config.tsv_dir, "stale");
    let snapshot = resolve_input_snapshot(&fx.path("in")).expect("snapshot");
    let mut runner = producing(&fx, &["a", "b"]);

    let report = run(
        &fx,
        &mut runner,
        &snapshot,
        &[CompressionMethod::Gzip, CompressionMethod::Hdt],
    )
    .expect("full run");

    let tsv_a = runner.position("vcf_as_tsv.sh /data/in/a.vcf").expect("tsv a");
    let rdf_a = runner.position("OUT_NAME=a ").expect("rdf a");
    let gzip_a = runner.position("gzip -c /data/in/a.nt").expect("gzip a");
    let tsv_b = runner.position("vcf_as_tsv.sh /data/in/b.vcf").expect("tsv b");
    assert!(tsv_a < rdf_a && rdf_a < gzip_a && gzip_a < tsv_b);
    assert_eq!(runner.count("OUT_NAME=stale"), 0);
    assert_eq!(runner.count("IN_VCF=/data/in "), 2);
    assert_eq!(runner.count("IN=/data/rules/a.rules.ttl"), 1);

    let names: Vec<_> = report.outputs.iter().map(|o| o.output_name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(report.outputs.iter().all(|o| o.rdf == RdfRetention::Removed));
    assert_eq!(report.outputs[0].source_size_bytes, 14);
    assert!(!fx.config.out_dir.join("a/a.nt").exists());
    assert!(fx.config.out_dir.join("a/a.nt.gz").exists());

    assert_eq!(report.tsv_dir, ScratchOutcome::PreExisting);
    assert_eq!(report.generated_rules, ScratchOutcome::Removed);
    assert!(fx.config.tsv_dir.join("stale.records.tsv").exists());
    assert!(!fx.config.tsv_dir.join("a.records.tsv").exists());
    assert!(!fx.config.tsv_dir.join("b.file_metadata.tsv").exists());

    let rows = read_ledger(&fx.config.ledger_path());
    assert_eq!(rows.len(), 2);
    assert_eq!(ledger_column(&rows[0], "output_name"), "a");
    assert_eq!(ledger_column(&rows[0], "compression_methods"), "gzip|hdt");
    assert_eq!(ledger_column(&rows[0], "gzip_size_bytes"), "2");
    assert_eq!(ledger_column(&rows[0], "combined_nq_size_bytes"), "14");
    assert_eq!(ledger_column(&rows[1], "output_name"), "b");
    assert!(fx
        .config
        .metrics_dir
        .join(format!("compression-metrics-a-{RUN_ID}.json"))
        .is_file());
}

#[test]
fn keep_flags_retain_intermediates_and_rendered_rules() {
    let mut fx = Fixture::new();
    fx.config.keep_tsv = true;
    fx.config.keep_rdf = true;
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let mut runner = producing(&fx, &["sample"]);

    let report = run(&fx, &mut runner, &snapshot, &[CompressionMethod::Gzip]).expect("full run");

    assert_eq!(report.outputs[0].rdf, RdfRetention::KeptByRequest);
    assert_eq!(report.tsv_dir, ScratchOutcome::Kept);
    assert!(fx.config.out_dir.join("sample/sample.nt").exists());
    assert!(fx.config.tsv_dir.join("sample.records.tsv").exists());
    assert_eq!(runner.count("IN_VCF=/data/in/sample.vcf "), 1);

    let rendered = fs::read_to_string(
        fx.config
            .metrics_dir
            .join("_generated_rules")
            .join("sample.rules.ttl"),
    )
    .expect("rendered rules");
    assert!(rendered.contains("\"/data/tsv/sample.records.tsv\""));
    assert!(rendered.contains("\"/data/tsv/sample.header_lines.tsv\""));
    assert!(rendered.contains("\"/data/tsv/sample.file_metadata.tsv\""));
    assert!(!rendered.contains("/data/tsv/records.tsv"));
}

#[test]
fn created_tsv_dir_is_removed_after_success() {
    let fx = Fixture::new();
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let mut runner = producing(&fx, &["sample"]);

    let report = run(&fx, &mut runner, &snapshot, &[CompressionMethod::Gzip]).expect("full run");
    assert_eq!(report.tsv_dir, ScratchOutcome::Removed);
    assert!(!fx.config.tsv_dir.exists());
    assert!(!fx.config.metrics_dir.join("_generated_rules").exists());
}

#[test]
fn scratch_removal_failure_does_not_fail_the_run() {
    let fx = Fixture::new();
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let rules_dir = fx.config.metrics_dir.join("_generated_rules");
    let blocked = rules_dir.clone();
    let mut runner = producing(&fx, &["sample"]).with_effect(move || {
        fs::remove_dir_all(&blocked).expect("drop rules dir");
        fs::write(&blocked, "in the way").expect("file in place of rules dir");
    });

    let report = run(&fx, &mut runner, &snapshot, &[CompressionMethod::Gzip]).expect("full run");

    assert_eq!(report.generated_rules, ScratchOutcome::RemovalFailed);
    assert_eq!(report.tsv_dir, ScratchOutcome::Removed);
    assert!(rules_dir.is_file());
    let rows = read_ledger(&fx.config.ledger_path());
    assert_eq!(rows.len(), 1);
    assert_eq!(ledger_column(&rows[0], "exit_code_gzip"), "0");
}

#[test]
fn none_runs_no_compression_and_keeps_rdf() {
    let fx = Fixture::new();
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let mut runner = producing(&fx, &["sample"]);

    let report = run(&fx, &mut runner, &snapshot, &[]).expect("full run");
    assert_eq!(runner.count("bash -lc"), 0);
    assert_eq!(report.outputs[0].rdf, RdfRetention::KeptNoCompression);
    assert!(fx.config.out_dir.join("sample/sample.nt").exists());

    let rows = read_ledger(&fx.config.ledger_path());
    assert_eq!(rows.len(), 1);
    assert_eq!(ledger_column(&rows[0], "compression_methods"), "none");
    for column in ["gzip_size_bytes", "brotli_size_bytes", "hdt_size_bytes"] {
        assert_eq!(ledger_column(&rows[0], column), "0");
    }
}

#[test]
fn compression_failure_keeps_partial_results_in_ledger() {
    let fx = Fixture::new();
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let mut runner = producing(&fx, &["sample"]).on("brotli -q 7", 5);

    let err = run(&fx, &mut runner, &snapshot, &CompressionMethod::ALL).unwrap_err();
    assert_eq!(err.exit_code(), 5);
    assert_eq!(runner.count("rdf2hdt.sh"), 0);
    assert!(fx.config.out_dir.join("sample/sample.nt").exists());

    let rows = read_ledger(&fx.config.ledger_path());
    assert_eq!(rows.len(), 1);
    assert_eq!(ledger_column(&rows[0], "exit_code_gzip"), "0");
    assert_eq!(ledger_column(&rows[0], "gzip_size_bytes"), "2");
    assert_ne!(ledger_column(&rows[0], "wall_seconds_gzip"), "null");
    assert_eq!(ledger_column(&rows[0], "exit_code_brotli"), "5");
    assert_eq!(ledger_column(&rows[0], "exit_code_hdt"), "0");
    assert_eq!(ledger_column(&rows[0], "wall_seconds_hdt"), "null");
}

#[test]
fn tsv_failure_stops_before_conversion_and_ledger() {
    let fx = Fixture::new();
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let mut runner = ScriptedRunner::new().on("vcf_as_tsv.sh", 3);

    let err = run(&fx, &mut runner, &snapshot, &[CompressionMethod::Gzip]).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(runner.calls.len(), 1);
    assert!(!fx.config.ledger_path().exists());
}

#[test]
fn missing_sibling_after_tsv_stage_is_a_discovery_error() {
    let fx = Fixture::new();
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let records = fx.config.tsv_dir.join("sample.records.tsv");
    let mut runner =
        ScriptedRunner::new().on_creating("vcf_as_tsv.sh", 0, vec![(records, "r".to_string())]);

    let err = run(&fx, &mut runner, &snapshot, &[CompressionMethod::Gzip]).unwrap_err();
    assert!(matches!(err, RdfizerError::Discovery(_)));
    assert!(err.info().message.contains("sample.header_lines.tsv"));
    assert_eq!(runner.count("run_conversion.sh"), 0);
}

#[test]
fn missing_rdf_output_is_reported_before_compression() {
    let fx = Fixture::new();
    let vcf = fx.write("in/sample.vcf", "");
    let snapshot = resolve_input_snapshot(&vcf).expect("snapshot");
    let mut runner = ScriptedRunner::new().on_creating(
        "vcf_as_tsv.sh",
        0,
        triplet_files(&fx.config.tsv_dir, "sample"),
    );

    let err = run(&fx, &mut runner, &snapshot, &[CompressionMethod::Gzip]).unwrap_err();
    assert_eq!(err.info().code, "rdf_output_missing");
    assert_eq!(runner.count("bash -lc"), 0);
}
