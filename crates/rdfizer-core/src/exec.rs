//! External step boundary: command descriptions, the runner seam and the
//! execution context that carries the command log.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use chrono::Local;

use crate::errors::{io_error, ErrorInfo, RdfizerError};

/// Exit code reported when the requested program cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Fully described external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute.
    pub program: String,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Working directory for the child, if any.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Builds a command from a full argv, the first element being the program.
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = argv.into_iter().map(Into::into);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            cwd: None,
        })
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Shell-quoted rendering used in the command log.
    pub fn rendered(&self) -> String {
        self.argv()
            .into_iter()
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quotes a value for a POSIX shell, leaving plain tokens untouched.
pub fn shell_quote(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\"'\"'"))
    }
}

/// Exit status and wall clock duration of one external step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Exit code reported by the child.
    pub exit_code: i32,
    /// Elapsed wall clock seconds.
    pub wall_seconds: f64,
}

impl StepOutcome {
    /// True when the step exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Sink receiving the command transcript of a run.
#[derive(Debug)]
pub enum CommandLog {
    /// Appends to a log file; child output is redirected into the same file.
    File {
        /// Location of the log file.
        path: PathBuf,
        /// Open append handle.
        file: File,
        /// Transcript lines that could not be written.
        failed_writes: u64,
    },
    /// Keeps the transcript in memory.
    Memory(Vec<String>),
}

impl CommandLog {
    /// Opens (appending) a file-backed log, creating parent directories.
    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, RdfizerError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error("log_dir", parent, err))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| io_error("log_open", &path, err))?;
        Ok(CommandLog::File {
            path,
            file,
            failed_writes: 0,
        })
    }

    /// Empty in-memory log.
    pub fn memory() -> Self {
        CommandLog::Memory(Vec::new())
    }

    /// Path of the backing file, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            CommandLog::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Transcript lines lost to write errors; always zero in memory.
    pub fn failed_writes(&self) -> u64 {
        match self {
            CommandLog::File { failed_writes, .. } => *failed_writes,
            _ => 0,
        }
    }

    /// Lines recorded by an in-memory log.
    pub fn lines(&self) -> &[String] {
        match self {
            CommandLog::Memory(lines) => lines,
            _ => &[],
        }
    }

    /// Records the start of a command.
    pub fn record_start(&mut self, spec: &CommandSpec) {
        let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S");
        self.write_line(&format!("\n[{stamp}] $ {}", spec.rendered()));
        if let Some(cwd) = &spec.cwd {
            self.write_line(&format!("cwd={}", cwd.display()));
        }
    }

    /// Records the exit code of the last command.
    pub fn record_exit(&mut self, exit_code: i32) {
        self.write_line(&format!("[exit {exit_code}]"));
    }

    /// Appends raw child output.
    pub fn record_output(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(bytes);
        for line in text.lines() {
            self.write_line(line);
        }
    }

    fn write_line(&mut self, line: &str) {
        match self {
            CommandLog::File {
                path,
                file,
                failed_writes,
            } => {
                if let Err(err) = writeln!(file, "{line}").and_then(|()| file.flush()) {
                    if *failed_writes == 0 {
                        tracing::warn!(log = %path.display(), %err, "command log write failed");
                    }
                    *failed_writes += 1;
                }
            }
            CommandLog::Memory(lines) => lines.push(line.to_string()),
        }
    }

    fn child_handles(&self) -> Option<(Stdio, Stdio)> {
        match self {
            CommandLog::File { file, .. } => {
                let out = file.try_clone().ok()?;
                let err = file.try_clone().ok()?;
                Some((Stdio::from(out), Stdio::from(err)))
            }
            _ => None,
        }
    }
}

/// Seam between the orchestrator and whatever actually executes commands.
pub trait StepRunner {
    /// Executes `spec` to completion and returns its exit code.
    fn invoke(&mut self, spec: &CommandSpec, log: &mut CommandLog) -> Result<i32, RdfizerError>;
}

/// Runs commands as blocking child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl StepRunner for ProcessRunner {
    fn invoke(&mut self, spec: &CommandSpec, log: &mut CommandLog) -> Result<i32, RdfizerError> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        command.stdin(Stdio::null());

        let result = match log.child_handles() {
            Some((stdout, stderr)) => command.stdout(stdout).stderr(stderr).status(),
            None => command.output().map(|output| {
                log.record_output(&output.stdout);
                log.record_output(&output.stderr);
                output.status
            }),
        };
        match result {
            Ok(status) => Ok(status.code().unwrap_or(-1)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log.record_output(format!("{}: {err}", spec.program).as_bytes());
                Ok(EXIT_NOT_FOUND)
            }
            Err(err) => Err(RdfizerError::Io(
                ErrorInfo::new("spawn", err.to_string()).with_context("program", &spec.program),
            )),
        }
    }
}

/// Explicit execution context handed to every stage.
pub struct ExecContext<'a> {
    runner: &'a mut dyn StepRunner,
    log: CommandLog,
}

impl<'a> ExecContext<'a> {
    /// Creates a context over `runner` writing its transcript to `log`.
    pub fn new(runner: &'a mut dyn StepRunner, log: CommandLog) -> Self {
        Self { runner, log }
    }

    /// Runs one external step, recording it in the command log.
    pub fn run(&mut self, spec: &CommandSpec) -> Result<StepOutcome, RdfizerError> {
        self.log.record_start(spec);
        let started = Instant::now();
        let exit_code = self.runner.invoke(spec, &mut self.log)?;
        let wall_seconds = started.elapsed().as_secs_f64();
        self.log.record_exit(exit_code);
        tracing::debug!(program = %spec.program, exit_code, wall_seconds, "external step finished");
        Ok(StepOutcome {
            exit_code,
            wall_seconds,
        })
    }

    /// The command log.
    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Path of the command log file, or a placeholder when logging elsewhere.
    pub fn log_label(&self) -> String {
        self.log
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "(command log disabled)".to_string())
    }
}
