//! Instance files handed to the solver
//!
//! An instance is a list of `key=value` lines, optionally followed by one
//! `a,b,c,d` start/goal line per agent. It is rendered in memory and then
//! written to a sibling temporary file that is renamed over the scratch
//! path, so the solver never sees a half-written instance.

use crate::experiment::{ExperimentKind, TrialConfig};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed exchange locations shared with the solver, reused by every trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPaths {
    pub instance: PathBuf,
    pub result: PathBuf,
}

impl ScratchPaths {
    /// `ins.txt` and `result.txt` inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        ScratchPaths {
            instance: dir.join("ins.txt"),
            result: dir.join("result.txt"),
        }
    }

    /// Creates the parent directories of both paths.
    pub fn prepare(&self) -> io::Result<()> {
        for path in [&self.instance, &self.result] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }
}

/// A trial that cannot be expressed as an instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("scenario has {available} start/goal pairs, {requested} requested")]
    NotEnoughPairs { requested: usize, available: usize },

    #[error("scenario trial without a scenario")]
    MissingScenario,
}

/// Renders the instance text for one trial.
pub fn render_instance(trial: &TrialConfig) -> Result<String, InstanceError> {
    let c = &trial.constants;
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "map_file={}", trial.map_name);
    let _ = writeln!(out, "agents={}", trial.num_agents);

    match trial.kind {
        ExperimentKind::Mapd => {
            let _ = writeln!(out, "seed={}", trial.seed);
            let _ = writeln!(out, "task_frequency={}", trial.task_frequency.unwrap_or(1.0));
            let _ = writeln!(out, "task_num={}", c.task_num);
            let _ = writeln!(out, "max_timestep={}", c.max_timestep);
            let _ = writeln!(out, "max_comp_time={}", c.max_comp_time);
            let _ = writeln!(out, "specify_pickup_deliv_locs=1");
        }
        ExperimentKind::MapfScenario => {
            let scenario = trial.scenario.as_ref().ok_or(InstanceError::MissingScenario)?;
            let pairs = scenario
                .select(trial.num_agents)
                .ok_or(InstanceError::NotEnoughPairs {
                    requested: trial.num_agents,
                    available: scenario.len(),
                })?;

            let _ = writeln!(out, "seed=0");
            let _ = writeln!(out, "random_problem=0");
            let _ = writeln!(out, "max_timestep={}", c.max_timestep);
            let _ = writeln!(out, "max_comp_time={}", c.max_comp_time);
            for pair in pairs {
                let _ = writeln!(out, "{}", pair);
            }
        }
        ExperimentKind::MapfRandom => {
            let _ = writeln!(out, "seed={}", trial.seed);
            let _ = writeln!(out, "random_problem=1");
            let _ = writeln!(out, "max_timestep={}", c.max_timestep);
            let _ = writeln!(out, "max_comp_time={}", c.max_comp_time);
        }
    }

    Ok(out)
}

/// Replaces the file at `path` with `contents`. The data is synced and the
/// temporary file closed before the rename.
pub fn write_instance(path: &Path, contents: &str) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::Constants;
    use crate::scenario::{sample_scenario, Scenario};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn trial(kind: ExperimentKind) -> TrialConfig {
        TrialConfig {
            index: 0,
            kind,
            solver: "PIBT".to_string(),
            map_name: "warehouse.map".to_string(),
            num_agents: 10,
            seed: 7,
            task_frequency: Some(0.2),
            scenario: None,
            constants: Constants {
                max_timestep: 3000,
                max_comp_time: 30000,
                task_num: 500,
            },
        }
    }

    #[test]
    fn test_mapd_instance() {
        let text = render_instance(&trial(ExperimentKind::Mapd)).unwrap();
        assert_eq!(
            text,
            "map_file=warehouse.map\n\
             agents=10\n\
             seed=7\n\
             task_frequency=0.2\n\
             task_num=500\n\
             max_timestep=3000\n\
             max_comp_time=30000\n\
             specify_pickup_deliv_locs=1\n"
        );
    }

    #[test]
    fn test_random_instance() {
        let text = render_instance(&trial(ExperimentKind::MapfRandom)).unwrap();
        assert!(text.contains("seed=7\nrandom_problem=1\n"));
        assert!(!text.contains("task_num"));
    }

    #[test]
    fn test_scenario_instance_truncates_to_agent_count() {
        let scen = Scenario::parse("empty-8-8-random-1.scen", &sample_scenario(25)).unwrap();
        let mut t = trial(ExperimentKind::MapfScenario);
        t.scenario = Some(Arc::new(scen.clone()));

        let text = render_instance(&t).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], "random_problem=0");

        let pair_lines: Vec<&str> = lines.iter().copied().filter(|l| !l.contains('=')).collect();
        let expected: Vec<String> = scen.pairs[..10].iter().map(|p| p.to_string()).collect();
        assert_eq!(pair_lines, expected);
    }

    #[test]
    fn test_scenario_too_short() {
        let scen = Scenario::parse("empty-8-8-random-1.scen", &sample_scenario(5)).unwrap();
        let mut t = trial(ExperimentKind::MapfScenario);
        t.scenario = Some(Arc::new(scen));

        assert_eq!(
            render_instance(&t),
            Err(InstanceError::NotEnoughPairs {
                requested: 10,
                available: 5
            })
        );
    }

    #[test]
    fn test_write_overwrites_previous_instance() {
        let dir = tempdir().unwrap();
        let scratch = ScratchPaths::in_dir(dir.path().join("local"));
        scratch.prepare().unwrap();

        write_instance(&scratch.instance, "a=1\nb=2\nc=3\n").unwrap();
        write_instance(&scratch.instance, "a=9\n").unwrap();

        assert_eq!(fs::read_to_string(&scratch.instance).unwrap(), "a=9\n");
        assert!(!dir.path().join("local/ins.txt.tmp").exists());
    }
}
