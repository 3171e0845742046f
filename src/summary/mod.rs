use crate::result::ParsedResult;
use crate::solver::SolverOutcome;
use prettytable::{row, Table};
use rustc_hash::FxHashMap;
use std::time::Duration;

/// Per-solver counters collected while a sweep runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverTally {
    pub attempted: usize,
    pub solved: usize,
    pub failed: usize,
    pub timed_out: usize,
    comp_time_sum: f64,
    comp_time_count: usize,
}

impl SolverTally {
    /// Mean reported `comp_time` over solved trials, in milliseconds
    pub fn mean_comp_time(&self) -> Option<f64> {
        if self.comp_time_count == 0 {
            None
        } else {
            Some(self.comp_time_sum / self.comp_time_count as f64)
        }
    }
}

/// What happened over a whole sweep. Presentation only: the CSV is the record
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub trials: usize,
    pub skipped: usize,
    pub elapsed: Duration,
    tallies: FxHashMap<String, SolverTally>,
    order: Vec<String>,
}

impl SweepSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, solver: &str, outcome: &SolverOutcome, result: &ParsedResult) {
        self.trials += 1;
        if !self.tallies.contains_key(solver) {
            self.order.push(solver.to_string());
        }
        let tally = self.tallies.entry(solver.to_string()).or_default();

        tally.attempted += 1;
        match outcome {
            SolverOutcome::TimedOut => tally.timed_out += 1,
            SolverOutcome::Completed if result.is_solved() => {
                tally.solved += 1;
                if let Some(t) = result.get("comp_time").filter(|v| !v.is_sentinel()) {
                    tally.comp_time_sum += t.as_f64();
                    tally.comp_time_count += 1;
                }
            }
            SolverOutcome::Completed => {}
            _ => tally.failed += 1,
        }
    }

    pub fn tally(&self, solver: &str) -> Option<&SolverTally> {
        self.tallies.get(solver)
    }

    pub fn solved(&self) -> usize {
        self.tallies.values().map(|t| t.solved).sum()
    }

    /// Solvers in the order they were first seen
    pub fn solvers(&self) -> impl Iterator<Item = (&str, &SolverTally)> {
        self.order
            .iter()
            .filter_map(|name| self.tallies.get(name).map(|t| (name.as_str(), t)))
    }
}

pub fn print_sweep_summary(summary: &SweepSummary) {
    let mut table = Table::new();
    table.add_row(row![
        "Solver",
        "Trials",
        "Solved",
        "Failed",
        "Timed Out",
        "Success Rate",
        "Avg Comp Time (ms)"
    ]);

    for (solver, tally) in summary.solvers() {
        let rate = tally.solved as f64 / tally.attempted.max(1) as f64;
        table.add_row(row![
            solver,
            tally.attempted,
            tally.solved,
            tally.failed,
            tally.timed_out,
            format!("{:.3}", rate),
            tally
                .mean_comp_time()
                .map(|t| format!("{:.1}", t))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!(
        "\n{} trials ({} skipped on resume) in {:.1}s",
        summary.trials,
        summary.skipped,
        summary.elapsed.as_secs_f64()
    );
    table.printstd();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ResultParser, MAPF_METRICS};

    #[test]
    fn test_tallies_per_solver() {
        let parser = ResultParser::new(MAPF_METRICS).unwrap();
        let solved = parser.parse_str("solved=1\ncomp_time=10\n");
        let unsolved = parser.parse_str("solved=0\ncomp_time=30000\n");
        let empty = ParsedResult::unsolved(MAPF_METRICS);

        let mut summary = SweepSummary::new();
        summary.record("PIBT", &SolverOutcome::Completed, &solved);
        summary.record("PIBT", &SolverOutcome::Completed, &parser.parse_str("solved=1\ncomp_time=20\n"));
        summary.record("HCA", &SolverOutcome::Completed, &unsolved);
        summary.record("HCA", &SolverOutcome::TimedOut, &empty);
        summary.record("HCA", &SolverOutcome::Failed(Some(1)), &empty);

        assert_eq!(summary.trials, 5);
        assert_eq!(summary.solved(), 2);

        let pibt = summary.tally("PIBT").unwrap();
        assert_eq!(pibt.attempted, 2);
        assert_eq!(pibt.mean_comp_time(), Some(15.0));

        let hca = summary.tally("HCA").unwrap();
        assert_eq!((hca.solved, hca.failed, hca.timed_out), (0, 1, 1));
        assert_eq!(hca.mean_comp_time(), None);

        let order: Vec<&str> = summary.solvers().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["PIBT", "HCA"]);
    }
}
