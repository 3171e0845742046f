//! Parameter grid enumeration
//!
//! A [`Grid`] is an ordered list of named axes. Iterating it walks the
//! Cartesian product like an odometer: the first axis is the outermost loop
//! and the last axis varies fastest. The walk is lazy and restartable, so
//! the same grid always yields the same sequence of points.

use crate::error::{Result, SweepError};
use std::fmt;

/// One discrete value on an axis.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl AxisValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AxisValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AxisValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats so `1` and `1.0` are both valid frequencies.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AxisValue::Float(v) => Some(*v),
            AxisValue::Int(v) => Some(*v as f64),
            AxisValue::Str(_) => None,
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Str(s) => f.write_str(s),
            AxisValue::Int(v) => write!(f, "{}", v),
            AxisValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A named dimension of the experiment grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    values: Vec<AxisValue>,
}

impl Axis {
    pub fn new(name: impl Into<String>, values: Vec<AxisValue>) -> Self {
        Axis {
            name: name.into(),
            values,
        }
    }

    pub fn strings<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Axis::new(name, values.into_iter().map(|s| AxisValue::Str(s.into())).collect())
    }

    pub fn ints<I: IntoIterator<Item = i64>>(name: impl Into<String>, values: I) -> Self {
        Axis::new(name, values.into_iter().map(AxisValue::Int).collect())
    }

    pub fn floats<I: IntoIterator<Item = f64>>(name: impl Into<String>, values: I) -> Self {
        Axis::new(name, values.into_iter().map(AxisValue::Float).collect())
    }

    /// Integer axis over `start..end` (end exclusive) with a positive step.
    pub fn range(name: impl Into<String>, start: i64, end: i64, step: i64) -> Result<Self> {
        let name = name.into();
        if step <= 0 {
            return Err(SweepError::config(format!(
                "axis '{}': range step must be positive, got {}",
                name, step
            )));
        }
        let step = usize::try_from(step).unwrap_or(usize::MAX);
        Ok(Axis::ints(name, (start..end).step_by(step)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[AxisValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered set of axes. Axis order is trial order: outer to inner.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    axes: Vec<Axis>,
}

impl Grid {
    /// Builds a grid, rejecting duplicate axis names.
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|a| a.name == axis.name) {
                return Err(SweepError::config(format!(
                    "axis '{}' is declared twice",
                    axis.name
                )));
            }
        }
        Ok(Grid { axes })
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of points in the product. Zero if any axis is empty.
    pub fn len(&self) -> usize {
        self.axes
            .iter()
            .map(Axis::len)
            .fold(1usize, |acc, n| acc.saturating_mul(n))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fresh walk over the grid from its first point.
    pub fn iter(&self) -> GridIter<'_> {
        let start = if self.axes.iter().any(Axis::is_empty) {
            None
        } else {
            Some(vec![0; self.axes.len()])
        };
        GridIter {
            grid: self,
            coords: start,
            index: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = GridPoint<'a>;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One point of the grid: a value chosen on every axis.
#[derive(Debug, Clone)]
pub struct GridPoint<'a> {
    grid: &'a Grid,
    coords: Vec<usize>,
    index: usize,
}

impl<'a> GridPoint<'a> {
    /// Position of this point in enumeration order, starting at zero.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, name: &str) -> Option<&'a AxisValue> {
        let pos = self.grid.axes.iter().position(|a| a.name == name)?;
        self.grid.axes[pos].values.get(self.coords[pos])
    }

    pub fn values(&self) -> impl Iterator<Item = (&'a str, &'a AxisValue)> + '_ {
        self.grid
            .axes
            .iter()
            .zip(&self.coords)
            .map(|(axis, &c)| (axis.name.as_str(), &axis.values[c]))
    }
}

/// Lazy odometer over a [`Grid`].
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    grid: &'a Grid,
    coords: Option<Vec<usize>>,
    index: usize,
}

impl<'a> Iterator for GridIter<'a> {
    type Item = GridPoint<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.coords.take()?;

        // Advance the innermost axis, carrying into outer ones
        let mut next = current.clone();
        let mut exhausted = true;
        for pos in (0..next.len()).rev() {
            next[pos] += 1;
            if next[pos] < self.grid.axes[pos].len() {
                exhausted = false;
                break;
            }
            next[pos] = 0;
        }
        if !exhausted {
            self.coords = Some(next);
        }

        let point = GridPoint {
            grid: self.grid,
            coords: current,
            index: self.index,
        };
        self.index += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.coords.is_some() {
            self.grid.len() - self.index
        } else {
            0
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(grid: &Grid) -> Vec<String> {
        grid.iter()
            .map(|p| {
                p.values()
                    .map(|(_, v)| v.to_string())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }

    #[test]
    fn test_last_axis_varies_fastest() {
        let grid = Grid::new(vec![
            Axis::strings("solver", ["PIBT", "TP"]),
            Axis::ints("seed", 0..3),
        ])
        .unwrap();

        assert_eq!(
            labels(&grid),
            vec!["PIBT/0", "PIBT/1", "PIBT/2", "TP/0", "TP/1", "TP/2"]
        );
    }

    #[test]
    fn test_heterogeneous_axes() {
        let grid = Grid::new(vec![
            Axis::strings("map", ["warehouse.map"]),
            Axis::floats("task_frequency", [0.2, 1.0]),
            Axis::ints("agents", [10, 20]),
        ])
        .unwrap();

        let points: Vec<_> = grid.iter().collect();
        assert_eq!(points.len(), 4);
        assert_eq!(points[1].get("agents"), Some(&AxisValue::Int(20)));
        assert_eq!(points[2].get("task_frequency").and_then(AxisValue::as_float), Some(1.0));
        assert_eq!(points[3].index(), 3);
        assert_eq!(points[0].get("missing"), None);
    }

    #[test]
    fn test_empty_axis_yields_no_points() {
        let grid = Grid::new(vec![
            Axis::strings("solver", ["PIBT"]),
            Axis::ints("agents", Vec::new()),
            Axis::ints("seed", 0..10),
        ])
        .unwrap();

        assert!(grid.is_empty());
        assert_eq!(grid.iter().count(), 0);
    }

    #[test]
    fn test_duplicate_axis_name_rejected() {
        let err = Grid::new(vec![Axis::ints("seed", 0..2), Axis::ints("seed", 0..2)]).unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }

    #[test]
    fn test_range_axis() {
        let axis = Axis::range("agents", 10, 51, 10).unwrap();
        assert_eq!(axis.values(), Axis::ints("agents", [10, 20, 30, 40, 50]).values());
        assert!(Axis::range("agents", 0, 10, 0).is_err());
        assert!(Axis::range("seed", 5, 5, 1).unwrap().is_empty());
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let grid = Grid::new(vec![Axis::ints("a", 0..2), Axis::ints("b", 0..3)]).unwrap();
        let mut iter = grid.iter();
        assert_eq!(iter.len(), 6);
        iter.next();
        iter.next();
        assert_eq!(iter.len(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property: point count equals the product of axis lengths
        #[test]
        fn prop_count_is_cartesian_product(sizes in proptest::collection::vec(0usize..5, 1..5)) {
            let axes = sizes
                .iter()
                .enumerate()
                .map(|(i, &n)| Axis::ints(format!("axis{}", i), 0..n as i64))
                .collect();
            let grid = Grid::new(axes).unwrap();

            let expected: usize = sizes.iter().product();
            prop_assert_eq!(grid.len(), expected);
            prop_assert_eq!(grid.iter().count(), expected);
        }

        /// Property: re-enumerating yields the identical sequence
        #[test]
        fn prop_enumeration_is_restartable(sizes in proptest::collection::vec(1usize..4, 1..4)) {
            let axes = sizes
                .iter()
                .enumerate()
                .map(|(i, &n)| Axis::ints(format!("axis{}", i), 0..n as i64))
                .collect();
            let grid = Grid::new(axes).unwrap();

            prop_assert_eq!(labels(&grid), labels(&grid));
            let indices: Vec<usize> = grid.iter().map(|p| p.index()).collect();
            prop_assert_eq!(indices, (0..grid.len()).collect::<Vec<_>>());
        }
    }
}
