//! Experiment kinds and trial configurations
//!
//! An [`Experiment`] pairs a kind with a validated grid and the constants
//! shared by every trial. Walking it yields one [`TrialConfig`] per grid
//! point, in grid order.

use crate::error::{Result, SweepError};
use crate::grid::{AxisValue, Grid, GridPoint};
use crate::result::{MetricSpec, MAPD_METRICS, MAPF_METRICS, MAPF_PREPROCESS_METRICS};
use crate::scenario::Scenario;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

pub const SOLVER: &str = "solver";
pub const MAP: &str = "map";
pub const SCENARIO: &str = "scenario";
pub const TASK_FREQUENCY: &str = "task_frequency";
pub const AGENTS: &str = "agents";
pub const SEED: &str = "seed";

/// Which sweep is being run. Decides axis order, instance lines, output
/// columns, harvested metrics and solver flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentKind {
    /// Pickup and delivery with a stream of tasks
    Mapd,
    /// One-shot MAPF with start/goal pairs taken from scenario files
    MapfScenario,
    /// One-shot MAPF with starts and goals generated by the solver
    MapfRandom,
}

impl ExperimentKind {
    /// Axis names, outermost first.
    pub fn axis_order(&self) -> &'static [&'static str] {
        match self {
            ExperimentKind::Mapd => &[SOLVER, MAP, TASK_FREQUENCY, AGENTS, SEED],
            ExperimentKind::MapfScenario => &[SOLVER, SCENARIO, AGENTS],
            ExperimentKind::MapfRandom => &[SOLVER, MAP, AGENTS, SEED],
        }
    }

    /// Identifying columns that lead every output row.
    pub fn id_columns(&self) -> &'static [&'static str] {
        match self {
            ExperimentKind::Mapd => &[
                "map_name",
                "seed",
                "num_agents",
                "solver",
                "task_frequency",
                "task_num",
            ],
            ExperimentKind::MapfScenario => &["map_name", "scen_num", "num_agents", "solver"],
            ExperimentKind::MapfRandom => &["map_name", "seed", "num_agents", "solver"],
        }
    }

    pub fn metrics(&self) -> &'static [MetricSpec] {
        match self {
            ExperimentKind::Mapd => MAPD_METRICS,
            ExperimentKind::MapfScenario => MAPF_METRICS,
            ExperimentKind::MapfRandom => MAPF_PREPROCESS_METRICS,
        }
    }

    /// Output header: identifying columns followed by metric names.
    pub fn header(&self) -> Vec<String> {
        self.id_columns()
            .iter()
            .copied()
            .chain(self.metrics().iter().map(|m| m.name))
            .map(str::to_string)
            .collect()
    }

    /// Mode flags passed to the solver after the algorithm token.
    pub fn solver_flags(&self, log_short: bool) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if *self == ExperimentKind::Mapd {
            flags.push("-d");
        }
        if log_short {
            flags.push("-L");
        }
        flags
    }
}

impl fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExperimentKind::Mapd => "mapd",
            ExperimentKind::MapfScenario => "mapf_scenario",
            ExperimentKind::MapfRandom => "mapf_random",
        };
        f.write_str(name)
    }
}

/// Values shared by every trial of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constants {
    pub max_timestep: u64,
    /// Solver computation budget in milliseconds
    pub max_comp_time: u64,
    pub task_num: u64,
}

/// One fully specified trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialConfig {
    pub index: usize,
    pub kind: ExperimentKind,
    pub solver: String,
    pub map_name: String,
    pub num_agents: usize,
    pub seed: u64,
    pub task_frequency: Option<f64>,
    pub scenario: Option<Arc<Scenario>>,
    pub constants: Constants,
}

impl TrialConfig {
    /// Identifying fields in the order of [`ExperimentKind::id_columns`].
    pub fn id_fields(&self) -> Vec<String> {
        let map = self.map_name.clone();
        let agents = self.num_agents.to_string();
        let solver = self.solver.clone();
        match self.kind {
            ExperimentKind::Mapd => vec![
                map,
                self.seed.to_string(),
                agents,
                solver,
                self.task_frequency.map(|f| f.to_string()).unwrap_or_default(),
                self.constants.task_num.to_string(),
            ],
            ExperimentKind::MapfScenario => {
                let scen_num = self.scenario.as_ref().map(|s| s.scen_num).unwrap_or(0);
                vec![map, scen_num.to_string(), agents, solver]
            }
            ExperimentKind::MapfRandom => vec![map, self.seed.to_string(), agents, solver],
        }
    }
}

/// A validated sweep: kind, grid and constants.
#[derive(Debug, Clone)]
pub struct Experiment {
    kind: ExperimentKind,
    grid: Grid,
    constants: Constants,
    scenarios: FxHashMap<String, Arc<Scenario>>,
    agents_bounded: bool,
    len: usize,
}

impl Experiment {
    /// Checks that the grid has exactly the kind's axes, in the kind's order,
    /// with values of the right type. Scenario axis values are paths that
    /// must appear in `scenarios`.
    pub fn new(
        kind: ExperimentKind,
        grid: Grid,
        constants: Constants,
        scenarios: Vec<Scenario>,
    ) -> Result<Self> {
        let names: Vec<&str> = grid.axes().iter().map(|a| a.name()).collect();
        if names != kind.axis_order() {
            return Err(SweepError::config(format!(
                "{} sweeps need axes {:?} in this order, got {:?}",
                kind,
                kind.axis_order(),
                names
            )));
        }

        let scenarios: FxHashMap<String, Arc<Scenario>> = scenarios
            .into_iter()
            .map(|s| (s.path.to_string_lossy().into_owned(), Arc::new(s)))
            .collect();

        for axis in grid.axes() {
            for value in axis.values() {
                check_value(axis.name(), value, &scenarios)?;
            }
        }

        let len = grid.len();
        Ok(Experiment {
            kind,
            grid,
            constants,
            scenarios,
            agents_bounded: false,
            len,
        })
    }

    /// Drops every grid point asking for more agents than its scenario has
    /// start/goal pairs. Such trials are never produced, rendered or counted.
    pub fn bound_agents_by_scenario(mut self) -> Self {
        self.agents_bounded = true;
        self.len = self.grid.iter().filter(|p| self.admits(p)).count();
        self
    }

    pub fn kind(&self) -> ExperimentKind {
        self.kind
    }

    pub fn constants(&self) -> Constants {
        self.constants
    }

    pub fn header(&self) -> Vec<String> {
        self.kind.header()
    }

    /// Number of trials, after any scenario bound.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Trials in grid order, numbered from zero.
    pub fn trials(&self) -> impl Iterator<Item = TrialConfig> + '_ {
        self.grid
            .iter()
            .filter(move |point| self.admits(point))
            .enumerate()
            .map(move |(index, point)| self.trial(index, &point))
    }

    fn scenario_at(&self, point: &GridPoint<'_>) -> Option<&Arc<Scenario>> {
        point
            .get(SCENARIO)
            .and_then(AxisValue::as_str)
            .and_then(|path| self.scenarios.get(path))
    }

    fn admits(&self, point: &GridPoint<'_>) -> bool {
        if !self.agents_bounded {
            return true;
        }
        let agents = point.get(AGENTS).and_then(AxisValue::as_int);
        match (self.scenario_at(point), agents) {
            (Some(scenario), Some(n)) => usize::try_from(n).is_ok_and(|n| n <= scenario.len()),
            _ => true,
        }
    }

    fn trial(&self, index: usize, point: &GridPoint<'_>) -> TrialConfig {
        let text = |name: &str| point.get(name).and_then(AxisValue::as_str).unwrap_or("");
        let int = |name: &str| point.get(name).and_then(AxisValue::as_int).unwrap_or(0);

        let scenario = self.scenario_at(point).cloned();
        let map_name = match &scenario {
            Some(s) => s.map_name.clone(),
            None => text(MAP).to_string(),
        };

        TrialConfig {
            index,
            kind: self.kind,
            solver: text(SOLVER).to_string(),
            map_name,
            num_agents: usize::try_from(int(AGENTS)).unwrap_or(0),
            seed: u64::try_from(int(SEED)).unwrap_or(0),
            task_frequency: point.get(TASK_FREQUENCY).and_then(AxisValue::as_float),
            scenario,
            constants: self.constants,
        }
    }
}

fn check_value(
    axis: &str,
    value: &AxisValue,
    scenarios: &FxHashMap<String, Arc<Scenario>>,
) -> Result<()> {
    let ok = match axis {
        SOLVER => value.as_str().is_some_and(|s| !s.trim().is_empty()),
        MAP => value.as_str().is_some_and(|s| !s.is_empty()),
        SCENARIO => value.as_str().is_some_and(|s| scenarios.contains_key(s)),
        AGENTS => value.as_int().is_some_and(|n| n > 0),
        SEED => value.as_int().is_some_and(|n| n >= 0),
        TASK_FREQUENCY => value.as_float().is_some_and(|f| f.is_finite() && f > 0.0),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(SweepError::config(format!(
            "axis '{}' has invalid value '{}'",
            axis, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Axis;
    use crate::scenario::sample_scenario;

    const CONSTANTS: Constants = Constants {
        max_timestep: 1000,
        max_comp_time: 30000,
        task_num: 500,
    };

    #[test]
    fn test_mapd_trials_follow_axis_order() {
        let grid = Grid::new(vec![
            Axis::strings(SOLVER, ["PIBT", "TP"]),
            Axis::strings(MAP, ["warehouse.map"]),
            Axis::floats(TASK_FREQUENCY, [0.5]),
            Axis::ints(AGENTS, [10]),
            Axis::ints(SEED, 0..2),
        ])
        .unwrap();
        let exp = Experiment::new(ExperimentKind::Mapd, grid, CONSTANTS, Vec::new()).unwrap();

        let trials: Vec<_> = exp.trials().collect();
        assert_eq!(trials.len(), 4);
        assert_eq!(
            trials.iter().map(|t| (t.solver.as_str(), t.seed)).collect::<Vec<_>>(),
            vec![("PIBT", 0), ("PIBT", 1), ("TP", 0), ("TP", 1)]
        );
        assert_eq!(
            trials[3].id_fields(),
            vec!["warehouse.map", "1", "10", "TP", "0.5", "500"]
        );
        assert_eq!(
            exp.header(),
            vec![
                "map_name", "seed", "num_agents", "solver", "task_frequency", "task_num",
                "solved", "service_time", "makespan", "comp_time"
            ]
        );
    }

    #[test]
    fn test_scenario_trials_take_map_from_scenario() {
        let scen = Scenario::parse("bench/empty-8-8-random-4.scen", &sample_scenario(20)).unwrap();
        let grid = Grid::new(vec![
            Axis::strings(SOLVER, ["PIBT"]),
            Axis::strings(SCENARIO, ["bench/empty-8-8-random-4.scen"]),
            Axis::ints(AGENTS, [10, 20]),
        ])
        .unwrap();
        let exp = Experiment::new(ExperimentKind::MapfScenario, grid, CONSTANTS, vec![scen]).unwrap();

        let trials: Vec<_> = exp.trials().collect();
        assert_eq!(trials[1].map_name, "empty-8-8.map");
        assert_eq!(trials[1].id_fields(), vec!["empty-8-8.map", "4", "20", "PIBT"]);
        assert!(trials[1].scenario.is_some());
    }

    #[test]
    fn test_scenario_bound_drops_impossible_trials() {
        let long = Scenario::parse("empty-8-8-random-1.scen", &sample_scenario(25)).unwrap();
        let short = Scenario::parse("empty-8-8-random-2.scen", &sample_scenario(12)).unwrap();
        let grid = Grid::new(vec![
            Axis::strings(SOLVER, ["PIBT"]),
            Axis::strings(SCENARIO, ["empty-8-8-random-1.scen", "empty-8-8-random-2.scen"]),
            Axis::ints(AGENTS, (10..60).step_by(10)),
        ])
        .unwrap();

        let exp = Experiment::new(ExperimentKind::MapfScenario, grid, CONSTANTS, vec![long, short]).unwrap();
        assert_eq!(exp.len(), 10);

        let exp = exp.bound_agents_by_scenario();
        assert_eq!(exp.len(), 3);
        let trials: Vec<_> = exp.trials().collect();
        assert_eq!(
            trials.iter().map(|t| (t.index, t.id_fields()[1].clone(), t.num_agents)).collect::<Vec<_>>(),
            vec![(0, "1".to_string(), 10), (1, "1".to_string(), 20), (2, "2".to_string(), 10)]
        );
    }

    #[test]
    fn test_wrong_axis_order_rejected() {
        let grid = Grid::new(vec![
            Axis::strings(MAP, ["a.map"]),
            Axis::strings(SOLVER, ["PIBT"]),
            Axis::ints(AGENTS, [10]),
            Axis::ints(SEED, [0]),
        ])
        .unwrap();
        let err = Experiment::new(ExperimentKind::MapfRandom, grid, CONSTANTS, Vec::new()).unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let grid = Grid::new(vec![
            Axis::strings(SOLVER, ["PIBT"]),
            Axis::strings(MAP, ["a.map"]),
            Axis::ints(AGENTS, [0]),
            Axis::ints(SEED, [0]),
        ])
        .unwrap();
        assert!(Experiment::new(ExperimentKind::MapfRandom, grid, CONSTANTS, Vec::new()).is_err());

        let grid = Grid::new(vec![
            Axis::strings(SOLVER, ["PIBT"]),
            Axis::strings(SCENARIO, ["unknown.scen"]),
            Axis::ints(AGENTS, [10]),
        ])
        .unwrap();
        assert!(Experiment::new(ExperimentKind::MapfScenario, grid, CONSTANTS, Vec::new()).is_err());
    }

    #[test]
    fn test_empty_axis_is_not_an_error() {
        let grid = Grid::new(vec![
            Axis::strings(SOLVER, ["PIBT"]),
            Axis::strings(MAP, Vec::<String>::new()),
            Axis::ints(AGENTS, [10]),
            Axis::ints(SEED, 0..5),
        ])
        .unwrap();
        let exp = Experiment::new(ExperimentKind::MapfRandom, grid, CONSTANTS, Vec::new()).unwrap();
        assert!(exp.is_empty());
        assert_eq!(exp.trials().count(), 0);
    }

    #[test]
    fn test_solver_flags() {
        assert_eq!(ExperimentKind::Mapd.solver_flags(true), vec!["-d", "-L"]);
        assert_eq!(ExperimentKind::MapfRandom.solver_flags(true), vec!["-L"]);
        assert!(ExperimentKind::MapfScenario.solver_flags(false).is_empty());
    }
}
