#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rdfizer_core::{CommandLog, CommandSpec, RdfizerError, StepRunner};
use rdfizer_pipeline::{ContainerRuntime, PipelineConfig, RunIdentity};
use tempfile::TempDir;

pub const RUN_ID: &str = "20240102T030405";
pub const TIMESTAMP: &str = "2024-01-02T03:04:05";

struct Rule {
    needle: String,
    exit_code: i32,
    creates: Vec<(PathBuf, String)>,
    effect: Option<Box<dyn Fn()>>,
}

/// Step runner double: the first rule whose needle occurs in the joined
/// argv decides the exit code and which files appear. Unmatched commands
/// succeed without side effects.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    pub calls: Vec<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, exit_code: i32) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            exit_code,
            creates: Vec::new(),
            effect: None,
        });
        self
    }

    pub fn on_creating(mut self, needle: &str, exit_code: i32, files: Vec<(PathBuf, String)>) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            exit_code,
            creates: files,
            effect: None,
        });
        self
    }

    /// Runs `effect` whenever the most recently added rule fires.
    pub fn with_effect(mut self, effect: impl Fn() + 'static) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.effect = Some(Box::new(effect));
        }
        self
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls.iter().filter(|call| call.contains(needle)).count()
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.calls.iter().position(|call| call.contains(needle))
    }
}

impl StepRunner for ScriptedRunner {
    fn invoke(&mut self, spec: &CommandSpec, _log: &mut CommandLog) -> Result<i32, RdfizerError> {
        let joined = spec.argv().join(" ");
        self.calls.push(joined.clone());
        let Some(rule) = self.rules.iter().find(|rule| joined.contains(&rule.needle)) else {
            return Ok(0);
        };
        for (path, body) in &rule.creates {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create parent");
            }
            fs::write(path, body).expect("create scripted output");
        }
        if let Some(effect) = &rule.effect {
            effect();
        }
        Ok(rule.exit_code)
    }
}

/// Temporary workspace with out/tsv/metrics dirs that do not exist yet.
pub struct Fixture {
    pub root: TempDir,
    pub config: PipelineConfig,
    pub identity: RunIdentity,
    pub runtime: ContainerRuntime,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let config = PipelineConfig {
            out_dir: root.path().join("out"),
            tsv_dir: root.path().join("tsv"),
            metrics_dir: root.path().join("metrics"),
            rules: root.path().join("rules.ttl"),
            container_cli: vec!["docker".to_string()],
            ..PipelineConfig::default()
        };
        Self {
            root,
            config,
            identity: RunIdentity::new(RUN_ID, TIMESTAMP),
            runtime: ContainerRuntime::new(vec!["docker".to_string()], "vcf-rdfizer:test"),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    pub fn write(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent");
        }
        fs::write(&path, body).expect("write");
        path
    }
}

pub fn triplet_files(dir: &Path, prefix: &str) -> Vec<(PathBuf, String)> {
    ["records", "header_lines", "file_metadata"]
        .iter()
        .map(|kind| (dir.join(format!("{prefix}.{kind}.tsv")), format!("{kind}\n")))
        .collect()
}

pub fn write_triplet(dir: &Path, prefix: &str) {
    fs::create_dir_all(dir).expect("tsv dir");
    for (path, body) in triplet_files(dir, prefix) {
        fs::write(path, body).expect("triplet file");
    }
}

pub fn read_ledger(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .expect("ledger");
    reader
        .records()
        .map(|row| row.expect("row").iter().map(str::to_string).collect())
        .collect()
}

pub fn ledger_column(row: &[String], name: &str) -> String {
    let idx = column_index(name);
    row[idx].clone()
}

fn column_index(name: &str) -> usize {
    rdfizer_ledger::METRICS_HEADER
        .iter()
        .position(|column| *column == name)
        .expect("known column")
}
