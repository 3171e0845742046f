//! The sweep loop
//!
//! For each trial, in grid order: write the instance, run the solver, parse
//! its result and append one row. Trial-local failures turn into sentinel
//! rows. Only scratch-file and sink errors stop the sweep.

use crate::error::Result;
use crate::experiment::{Experiment, TrialConfig};
use crate::instance::{render_instance, write_instance, ScratchPaths};
use crate::result::{ParsedResult, ResultParser};
use crate::sink::ResultSink;
use crate::solver::{SolverCommand, SolverOutcome, SolverRun};
use crate::summary::SweepSummary;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Knobs that do not change what a trial is.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Skip as many leading trials as the output already has rows
    pub resume: bool,
    /// Grace period on top of the computation budget before the solver is
    /// killed. `None` waits indefinitely.
    pub kill_grace: Option<Duration>,
    /// Pass `-L` so the solver writes the short log
    pub log_short: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        SweepOptions {
            resume: false,
            kill_grace: None,
            log_short: true,
        }
    }
}

/// Outcome of one trial, as appended to the sink.
#[derive(Debug, Clone)]
pub struct TrialRecord {
    pub trial: TrialConfig,
    pub run: SolverRun,
    pub result: ParsedResult,
}

impl TrialRecord {
    pub fn row(&self) -> Vec<String> {
        let mut row = self.trial.id_fields();
        row.extend(self.result.fields());
        row
    }
}

pub struct Sweep<'a> {
    experiment: &'a Experiment,
    solver: &'a SolverCommand,
    scratch: ScratchPaths,
    parser: ResultParser,
    options: SweepOptions,
}

impl<'a> Sweep<'a> {
    pub fn new(
        experiment: &'a Experiment,
        solver: &'a SolverCommand,
        scratch: ScratchPaths,
        options: SweepOptions,
    ) -> Result<Self> {
        let parser = ResultParser::new(experiment.kind().metrics())?;
        Ok(Sweep {
            experiment,
            solver,
            scratch,
            parser,
            options,
        })
    }

    /// Runs every trial not yet recorded in `sink`.
    pub fn run(&self, sink: &mut ResultSink) -> Result<SweepSummary> {
        let start = Instant::now();
        let total = self.experiment.len();
        let mut summary = SweepSummary::new();

        if total == 0 {
            warn!("{} sweep has no trials, nothing to run", self.experiment.kind());
            return Ok(summary);
        }

        let skip = if self.options.resume {
            sink.existing_rows().min(total)
        } else {
            0
        };
        if skip > 0 {
            info!("resuming after {} recorded trials", skip);
        }
        summary.skipped = skip;

        self.scratch.prepare()?;

        for trial in self.experiment.trials().skip(skip) {
            let record = self.run_trial(trial)?;
            sink.append(&record.row())?;

            summary.record(&record.trial.solver, &record.run.outcome, &record.result);
            self.log_progress(&record, total, start.elapsed());
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }

    /// Runs one trial. Errors are limited to the scratch instance write.
    pub fn run_trial(&self, trial: TrialConfig) -> Result<TrialRecord> {
        let instance = match render_instance(&trial) {
            Ok(text) => text,
            Err(e) => {
                let run = SolverRun {
                    outcome: SolverOutcome::InstanceFailed(e.to_string()),
                    elapsed: Duration::ZERO,
                };
                return Ok(self.unsolved(trial, run));
            }
        };
        write_instance(&self.scratch.instance, &instance)?;

        let flags = self.experiment.kind().solver_flags(self.options.log_short);
        let run = self
            .solver
            .run(&trial.solver, &flags, &self.scratch, self.deadline());

        if !run.outcome.is_completed() {
            return Ok(self.unsolved(trial, run));
        }

        let result = self.parser.parse_file(&self.scratch.result);
        Ok(TrialRecord { trial, run, result })
    }

    fn unsolved(&self, trial: TrialConfig, run: SolverRun) -> TrialRecord {
        TrialRecord {
            trial,
            run,
            result: ParsedResult::unsolved(self.parser.metrics()),
        }
    }

    fn deadline(&self) -> Option<Duration> {
        let budget = Duration::from_millis(self.experiment.constants().max_comp_time);
        self.options.kill_grace.map(|grace| budget + grace)
    }

    fn log_progress(&self, record: &TrialRecord, total: usize, elapsed: Duration) {
        let t = &record.trial;
        if record.run.outcome.is_completed() {
            info!(
                "trial {}/{} solver={} map={} agents={} seed={} solved={} ({:.2}s, total {:.0}s)",
                t.index + 1,
                total,
                t.solver,
                t.map_name,
                t.num_agents,
                t.seed,
                record.result.is_solved(),
                record.run.elapsed.as_secs_f64(),
                elapsed.as_secs_f64()
            );
        } else {
            warn!(
                "trial {}/{} solver={} map={} agents={} seed={} {} ({:.2}s)",
                t.index + 1,
                total,
                t.solver,
                t.map_name,
                t.num_agents,
                t.seed,
                record.run.outcome,
                record.run.elapsed.as_secs_f64()
            );
        }
    }
}
