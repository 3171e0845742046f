//! External solver invocation
//!
//! The solver is spawned directly from an argument vector:
//! `<binary> -i <instance> -o <result> -s <algorithm> [extra words] [flags]`.
//! Every way a run can go wrong is reported as a [`SolverOutcome`]; nothing
//! here returns an error to the caller.

use crate::instance::ScratchPaths;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_START: Duration = Duration::from_millis(1);
const POLL_MAX: Duration = Duration::from_millis(50);

/// How a single trial's solver run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverOutcome {
    /// Exited with status zero; the result file may still be missing
    Completed,
    /// Exited unsuccessfully; `None` when killed by a signal
    Failed(Option<i32>),
    /// Still running at the hard deadline and killed
    TimedOut,
    /// Could not be started or waited on
    SpawnFailed(String),
    /// No instance could be produced for the trial
    InstanceFailed(String),
}

impl SolverOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SolverOutcome::Completed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SolverOutcome::Completed => "completed",
            SolverOutcome::Failed(_) => "failed",
            SolverOutcome::TimedOut => "timed out",
            SolverOutcome::SpawnFailed(_) => "spawn failed",
            SolverOutcome::InstanceFailed(_) => "no instance",
        }
    }
}

impl fmt::Display for SolverOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverOutcome::Failed(Some(code)) => write!(f, "failed (exit {})", code),
            SolverOutcome::Failed(None) => write!(f, "failed (signal)"),
            SolverOutcome::SpawnFailed(msg) => write!(f, "spawn failed: {}", msg),
            SolverOutcome::InstanceFailed(msg) => write!(f, "no instance: {}", msg),
            other => f.write_str(other.label()),
        }
    }
}

/// Outcome plus wall-clock time of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverRun {
    pub outcome: SolverOutcome,
    pub elapsed: Duration,
}

/// The solver binary and how to treat its console output.
#[derive(Debug, Clone)]
pub struct SolverCommand {
    binary: PathBuf,
    show_output: bool,
}

impl SolverCommand {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        SolverCommand {
            binary: binary.into(),
            show_output: false,
        }
    }

    /// Forward solver stdout/stderr instead of discarding them.
    pub fn show_output(mut self, show: bool) -> Self {
        self.show_output = show;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Argument vector for one run. The algorithm token is split on
    /// whitespace so `"PushAndSwap --no-compress"` passes its option through.
    pub fn args(&self, algorithm: &str, flags: &[&str], scratch: &ScratchPaths) -> Vec<OsString> {
        let mut words = algorithm.split_whitespace();
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            scratch.instance.clone().into_os_string(),
            "-o".into(),
            scratch.result.clone().into_os_string(),
            "-s".into(),
            words.next().unwrap_or_default().into(),
        ];
        args.extend(words.map(OsString::from));
        args.extend(flags.iter().map(OsString::from));
        args
    }

    /// Runs the solver to completion or until `deadline` has passed.
    ///
    /// The previous trial's result file is removed first so a run that
    /// writes nothing cannot inherit stale metrics.
    pub fn run(
        &self,
        algorithm: &str,
        flags: &[&str],
        scratch: &ScratchPaths,
        deadline: Option<Duration>,
    ) -> SolverRun {
        let start = Instant::now();
        let outcome = match clear_stale_result(&scratch.result) {
            Ok(()) => self.spawn_and_wait(algorithm, flags, scratch, deadline),
            Err(e) => SolverOutcome::SpawnFailed(format!(
                "cannot clear {}: {}",
                scratch.result.display(),
                e
            )),
        };
        SolverRun {
            outcome,
            elapsed: start.elapsed(),
        }
    }

    fn spawn_and_wait(
        &self,
        algorithm: &str,
        flags: &[&str],
        scratch: &ScratchPaths,
        deadline: Option<Duration>,
    ) -> SolverOutcome {
        let (stdout, stderr) = if self.show_output {
            (Stdio::inherit(), Stdio::inherit())
        } else {
            (Stdio::null(), Stdio::null())
        };

        let child = Command::new(&self.binary)
            .args(self.args(algorithm, flags, scratch))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                return SolverOutcome::SpawnFailed(format!("{}: {}", self.binary.display(), e))
            }
        };

        match wait_with_deadline(&mut child, deadline) {
            Ok(Some(status)) if status.success() => SolverOutcome::Completed,
            Ok(Some(status)) => SolverOutcome::Failed(status.code()),
            Ok(None) => {
                tracing::warn!("solver {} exceeded its deadline, killing it", algorithm);
                // A child that already exited between the last poll and the kill is fine
                let _ = child.kill();
                let _ = child.wait();
                SolverOutcome::TimedOut
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                SolverOutcome::SpawnFailed(e.to_string())
            }
        }
    }
}

fn clear_stale_result(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Polls the child until it exits. `Ok(None)` means the deadline passed.
fn wait_with_deadline(child: &mut Child, deadline: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let deadline = match deadline {
        Some(d) => d,
        None => return child.wait().map(Some),
    };

    let start = Instant::now();
    let mut interval = POLL_START;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let elapsed = start.elapsed();
        if elapsed >= deadline {
            return Ok(None);
        }
        thread::sleep(interval.min(deadline - elapsed));
        interval = (interval * 2).min(POLL_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_follow_cli_contract() {
        let scratch = ScratchPaths::in_dir("local");
        let cmd = SolverCommand::new("../build/mapd");

        assert_eq!(cmd.binary(), Path::new("../build/mapd"));

        let args = cmd.args("TP", &["-d", "-L"], &scratch);
        let expected: Vec<OsString> = ["-i", "local/ins.txt", "-o", "local/result.txt", "-s", "TP", "-d", "-L"]
            .iter()
            .map(OsString::from)
            .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_algorithm_suffix_words_pass_through() {
        let scratch = ScratchPaths::in_dir("local");
        let cmd = SolverCommand::new("../build/mapf");

        let args = cmd.args("PushAndSwap --no-compress", &["-L"], &scratch);
        let tail: Vec<&str> = args[5..].iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(tail, vec!["PushAndSwap", "--no-compress", "-L"]);
    }

    #[test]
    fn test_missing_binary_is_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchPaths::in_dir(dir.path());
        let cmd = SolverCommand::new(dir.path().join("no-such-solver"));

        let run = cmd.run("PIBT", &[], &scratch, Some(Duration::from_secs(1)));
        assert!(matches!(run.outcome, SolverOutcome::SpawnFailed(_)));
    }

    #[test]
    fn test_stale_result_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchPaths::in_dir(dir.path());
        fs::write(&scratch.result, "solved=1\n").unwrap();

        let cmd = SolverCommand::new(dir.path().join("no-such-solver"));
        cmd.run("PIBT", &[], &scratch, None);
        assert!(!scratch.result.exists());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(SolverOutcome::Failed(Some(2)).to_string(), "failed (exit 2)");
        assert_eq!(SolverOutcome::TimedOut.to_string(), "timed out");
        assert!(SolverOutcome::Completed.is_completed());
    }
}
