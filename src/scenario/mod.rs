//! Benchmark scenario files
//!
//! A scenario lists explicit start/goal pairs, one agent per tab-delimited
//! row: `bucket  map  width  height  a  b  c  d  optimal`. Rows that do not
//! have this shape (the `version` header, blank lines) are skipped.

use crate::error::{Result, SweepError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Start and goal coordinates of one agent, in file column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartGoal {
    pub start_row: u32,
    pub start_col: u32,
    pub goal_row: u32,
    pub goal_col: u32,
}

impl fmt::Display for StartGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.start_row, self.start_col, self.goal_row, self.goal_col
        )
    }
}

/// A parsed scenario file.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub path: PathBuf,
    pub map_name: String,
    pub scen_num: u32,
    pub pairs: Vec<StartGoal>,
}

/// Splits `<map>-random-<n>.scen` into `<map>.map` and `n`.
fn parse_file_name(file_name: &str) -> Option<(String, u32)> {
    let stem = file_name.strip_suffix(".scen")?;
    let (map, num) = stem.rsplit_once("-random-")?;
    if map.is_empty() || num.is_empty() || !num.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((format!("{}.map", map), num.parse().ok()?))
}

/// Parses one row, returning the map column and the start/goal pair.
fn parse_row(row: &str) -> Option<(&str, StartGoal)> {
    let fields: Vec<&str> = row.trim_end_matches('\r').split('\t').collect();
    if fields.len() < 9 || !fields[1].ends_with(".map") {
        return None;
    }

    let int = |i: usize| fields[i].trim().parse::<u32>().ok();
    int(0)?;
    int(2)?;
    int(3)?;
    if fields[8].trim().is_empty() {
        return None;
    }

    let pair = StartGoal {
        start_row: int(4)?,
        start_col: int(5)?,
        goal_row: int(6)?,
        goal_col: int(7)?,
    };
    Some((fields[1], pair))
}

impl Scenario {
    /// Loads and parses a scenario file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SweepError::Scenario {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Scenario::parse(path, &content)
    }

    /// Parses scenario text. `path` names the map and scenario number when it
    /// follows the `<map>-random-<n>.scen` convention.
    pub fn parse<P: AsRef<Path>>(path: P, content: &str) -> Result<Self> {
        let path = path.as_ref();

        let mut first_map = None;
        let mut pairs = Vec::new();
        for row in content.lines() {
            if let Some((map, pair)) = parse_row(row) {
                first_map.get_or_insert(map);
                pairs.push(pair);
            }
        }

        let first_map = match first_map {
            Some(map) => map,
            None => {
                return Err(SweepError::Scenario {
                    path: path.to_path_buf(),
                    reason: "no start/goal rows".to_string(),
                })
            }
        };

        // Prefer the file name convention, fall back to the map column
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let (map_name, scen_num) = match parse_file_name(file_name) {
            Some(named) => named,
            None => {
                let map = Path::new(first_map)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(first_map);
                (map.to_string(), 0)
            }
        };

        Ok(Scenario {
            path: path.to_path_buf(),
            map_name,
            scen_num,
            pairs,
        })
    }

    /// The first `n` pairs in file order, or `None` if there are fewer.
    pub fn select(&self, n: usize) -> Option<&[StartGoal]> {
        self.pairs.get(..n)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_scenario(rows: usize) -> String {
    let mut text = String::from("version 1\n");
    for i in 0..rows {
        text.push_str(&format!(
            "{}\tempty-8-8.map\t8\t8\t{}\t{}\t{}\t{}\t{}.0\n",
            i / 10,
            i % 8,
            i / 8,
            7 - i % 8,
            7 - i / 8,
            i + 3
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_malformed_rows() {
        let text = "version 1\n\
                    0\tempty-8-8.map\t8\t8\t1\t2\t3\t4\t5.0\n\
                    garbage line\n\
                    0\tempty-8-8.map\t8\t8\tx\t2\t3\t4\t5.0\n\
                    1\tempty-8-8.map\t8\t8\t5\t6\t7\t0\t4.24\n";
        let scen = Scenario::parse("empty-8-8-random-3.scen", text).unwrap();

        assert_eq!(scen.map_name, "empty-8-8.map");
        assert_eq!(scen.scen_num, 3);
        assert_eq!(scen.len(), 2);
        assert_eq!(scen.pairs[1].to_string(), "5,6,7,0");
    }

    #[test]
    fn test_map_name_falls_back_to_column() {
        let text = "0\tmaps/den520d.map\t256\t257\t10\t20\t30\t40\t55.5\n";
        let scen = Scenario::parse("custom.scen", text).unwrap();
        assert_eq!(scen.map_name, "den520d.map");
        assert_eq!(scen.scen_num, 0);
    }

    #[test]
    fn test_file_name_convention() {
        assert_eq!(
            parse_file_name("random-32-32-20-random-12.scen"),
            Some(("random-32-32-20.map".to_string(), 12))
        );
        assert_eq!(parse_file_name("den520d-random-x.scen"), None);
        assert_eq!(parse_file_name("-random-3.scen"), None);
        assert_eq!(parse_file_name("den520d-random-3.txt"), None);
    }

    #[test]
    fn test_select_takes_prefix_in_file_order() {
        let scen = Scenario::parse("empty-8-8-random-1.scen", &sample_scenario(25)).unwrap();
        assert_eq!(scen.len(), 25);

        let picked = scen.select(10).unwrap();
        assert_eq!(picked.len(), 10);
        assert_eq!(picked, &scen.pairs[..10]);
        assert!(scen.select(26).is_none());
    }

    #[test]
    fn test_no_rows_is_an_error() {
        let err = Scenario::parse("empty-8-8-random-1.scen", "version 1\n").unwrap_err();
        assert!(matches!(err, SweepError::Scenario { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Scenario::load(dir.path().join("nope-random-1.scen")).unwrap_err();
        assert!(matches!(err, SweepError::Scenario { .. }));
    }
}
