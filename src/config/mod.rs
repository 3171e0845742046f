//! Sweep declaration files
//!
//! A sweep is a JSON document naming the experiment kind, the solver binary,
//! the axis values and the per-trial constants. Integer axes can be written
//! as a list or as `{ "start": 0, "end": 100, "step": 1 }` (end exclusive).
//! In scenario sweeps the agents range may end at `"scenario"`: counts run up
//! to and including the size of each scenario, and no larger count is tried.

use crate::error::{Result, SweepError};
use crate::experiment::{
    Constants, Experiment, ExperimentKind, AGENTS, MAP, SCENARIO, SEED, SOLVER, TASK_FREQUENCY,
};
use crate::grid::{Axis, Grid};
use crate::scenario::Scenario;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Solver-side defaults
const DEFAULT_MAX_TIMESTEP: u64 = 5000;
const DEFAULT_MAX_COMP_TIME: u64 = 60000;
const DEFAULT_TASK_NUM: u64 = 10;
const DEFAULT_KILL_GRACE_MS: u64 = 10_000;

/// Integer axis declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IntAxis {
    List(Vec<i64>),
    Range {
        start: i64,
        end: RangeEnd,
        #[serde(default = "default_step")]
        step: i64,
    },
}

/// Exclusive end of a range axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RangeEnd {
    Value(i64),
    Bound(RangeBound),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBound {
    /// One past the pair count of each scenario
    Scenario,
}

fn default_step() -> i64 {
    1
}

impl IntAxis {
    /// `largest_scenario` is the pair count of the biggest scenario, or
    /// `None` when the sweep has no scenario axis.
    fn to_axis(&self, name: &str, largest_scenario: Option<usize>) -> Result<Axis> {
        match self {
            IntAxis::List(values) => Ok(Axis::ints(name, values.iter().copied())),
            IntAxis::Range {
                start,
                end: RangeEnd::Value(end),
                step,
            } => Axis::range(name, *start, *end, *step),
            IntAxis::Range {
                start,
                end: RangeEnd::Bound(RangeBound::Scenario),
                step,
            } => match (name, largest_scenario) {
                (AGENTS, Some(pairs)) => {
                    let end = i64::try_from(pairs).unwrap_or(i64::MAX).saturating_add(1);
                    Axis::range(name, *start, end, *step)
                }
                _ => Err(SweepError::config(format!(
                    "axis '{}': \"end\": \"scenario\" only applies to agents in scenario sweeps",
                    name
                ))),
            },
        }
    }

    fn is_scenario_bound(&self) -> bool {
        matches!(
            self,
            IntAxis::Range {
                end: RangeEnd::Bound(RangeBound::Scenario),
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub kind: ExperimentKind,
    pub solver_binary: PathBuf,
    /// Algorithm tokens, e.g. `"PIBT"` or `"PushAndSwap --no-compress"`
    pub solvers: Vec<String>,
    /// Map axis; in scenario sweeps, the maps whose scenarios are kept
    #[serde(default)]
    pub maps: Option<Vec<String>>,
    #[serde(default)]
    pub scenarios: Option<Vec<PathBuf>>,
    /// Directory whose `.scen` files are added after `scenarios`
    #[serde(default)]
    pub scenario_dir: Option<PathBuf>,
    #[serde(default)]
    pub task_frequencies: Option<Vec<f64>>,
    #[serde(default)]
    pub agents: Option<IntAxis>,
    #[serde(default)]
    pub seeds: Option<IntAxis>,

    #[serde(default = "default_max_timestep")]
    pub max_timestep: u64,
    #[serde(default = "default_max_comp_time")]
    pub max_comp_time: u64,
    #[serde(default = "default_task_num")]
    pub task_num: u64,
    #[serde(default = "default_true")]
    pub log_short: bool,
    /// Milliseconds past `max_comp_time` before the solver is killed;
    /// `null` never kills it
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: Option<u64>,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_max_timestep() -> u64 {
    DEFAULT_MAX_TIMESTEP
}

fn default_max_comp_time() -> u64 {
    DEFAULT_MAX_COMP_TIME
}

fn default_task_num() -> u64 {
    DEFAULT_TASK_NUM
}

fn default_true() -> bool {
    true
}

fn default_kill_grace_ms() -> Option<u64> {
    Some(DEFAULT_KILL_GRACE_MS)
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("local")
}

fn default_output() -> PathBuf {
    PathBuf::from("result.csv")
}

fn required<'c, T>(value: &'c Option<T>, field: &str, kind: ExperimentKind) -> Result<&'c T> {
    value
        .as_ref()
        .ok_or_else(|| SweepError::config(format!("{} sweeps need '{}'", kind, field)))
}

impl SweepConfig {
    /// Loads a sweep declaration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SweepError::config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn constants(&self) -> Constants {
        Constants {
            max_timestep: self.max_timestep,
            max_comp_time: self.max_comp_time,
            task_num: self.task_num,
        }
    }

    pub fn kill_grace(&self) -> Option<Duration> {
        self.kill_grace_ms.map(Duration::from_millis)
    }

    /// Scenario files listed in `scenarios`, then the `.scen` files found
    /// directly in `scenario_dir` in path order.
    pub fn scenario_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = self.scenarios.clone().unwrap_or_default();
        if let Some(dir) = &self.scenario_dir {
            let unreadable = |e: std::io::Error| SweepError::Scenario {
                path: dir.clone(),
                reason: e.to_string(),
            };
            let mut found = Vec::new();
            for entry in fs::read_dir(dir).map_err(unreadable)? {
                let path = entry.map_err(unreadable)?.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "scen") {
                    found.push(path);
                }
            }
            found.sort();
            paths.extend(found);
        }
        Ok(paths)
    }

    /// Parses the scenarios of a scenario sweep. When `maps` is given, only
    /// scenarios on those maps are kept. Other kinds load nothing.
    pub fn load_scenarios(&self) -> Result<Vec<Scenario>> {
        if self.kind != ExperimentKind::MapfScenario {
            return Ok(Vec::new());
        }
        if self.scenarios.is_none() && self.scenario_dir.is_none() {
            return Err(SweepError::config(format!(
                "{} sweeps need 'scenarios' or 'scenario_dir'",
                self.kind
            )));
        }

        let mut kept = Vec::new();
        for path in self.scenario_paths()? {
            let scenario = Scenario::load(&path)?;
            match &self.maps {
                Some(maps) if !maps.contains(&scenario.map_name) => {
                    tracing::debug!("skipping {}: map {} not selected", path.display(), scenario.map_name);
                }
                _ => kept.push(scenario),
            }
        }
        Ok(kept)
    }

    /// Axes in the kind's order. Fields the kind does not use must be absent.
    pub fn axes(&self) -> Result<Vec<Axis>> {
        self.axes_for(&self.load_scenarios()?)
    }

    fn axes_for(&self, scenarios: &[Scenario]) -> Result<Vec<Axis>> {
        let kind = self.kind;
        let mut axes = Vec::new();
        let mut unused: Vec<&str> = Vec::new();
        let largest_scenario = (kind == ExperimentKind::MapfScenario)
            .then(|| scenarios.iter().map(Scenario::len).max().unwrap_or(0));

        for &name in kind.axis_order() {
            let axis = match name {
                SOLVER => Axis::strings(SOLVER, self.solvers.iter().cloned()),
                MAP => Axis::strings(MAP, required(&self.maps, "maps", kind)?.iter().cloned()),
                SCENARIO => Axis::strings(
                    SCENARIO,
                    scenarios
                        .iter()
                        .map(|s| s.path.to_string_lossy().into_owned()),
                ),
                TASK_FREQUENCY => Axis::floats(
                    TASK_FREQUENCY,
                    required(&self.task_frequencies, "task_frequencies", kind)?
                        .iter()
                        .copied(),
                ),
                AGENTS => required(&self.agents, "agents", kind)?.to_axis(AGENTS, largest_scenario)?,
                SEED => required(&self.seeds, "seeds", kind)?.to_axis(SEED, None)?,
                other => return Err(SweepError::config(format!("unknown axis '{}'", other))),
            };
            axes.push(axis);
        }

        let uses = |axis: &str| kind.axis_order().iter().any(|a| *a == axis);
        if self.maps.is_some() && !uses(MAP) && !uses(SCENARIO) {
            unused.push("maps");
        }
        if self.scenarios.is_some() && !uses(SCENARIO) {
            unused.push("scenarios");
        }
        if self.scenario_dir.is_some() && !uses(SCENARIO) {
            unused.push("scenario_dir");
        }
        if self.task_frequencies.is_some() && !uses(TASK_FREQUENCY) {
            unused.push("task_frequencies");
        }
        if self.seeds.is_some() && !uses(SEED) {
            unused.push("seeds");
        }
        if !unused.is_empty() {
            return Err(SweepError::config(format!(
                "{} sweeps do not use {:?}",
                kind, unused
            )));
        }

        Ok(axes)
    }

    /// Builds the validated experiment, parsing every scenario file up front.
    pub fn experiment(&self) -> Result<Experiment> {
        let scenarios = self.load_scenarios()?;
        let grid = Grid::new(self.axes_for(&scenarios)?)?;
        let experiment = Experiment::new(self.kind, grid, self.constants(), scenarios)?;

        match &self.agents {
            Some(agents) if agents.is_scenario_bound() => Ok(experiment.bound_agents_by_scenario()),
            _ => Ok(experiment),
        }
    }
}
