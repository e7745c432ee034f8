use crate::quantity::Values;

use super::{Solution, SolveError};

/// The outcome of one point of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    /// The swept values of this point; empty without sweeps.
    pub swept: Values,
    pub outcome: Result<Solution, SolveError>,
}

/// Per-point outcomes of a sweep, in sweep order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepResults {
    points: Vec<SweepPoint>,
}

impl SweepResults {
    pub(super) fn new(points: Vec<SweepPoint>) -> Self {
        Self { points }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[SweepPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SweepPoint> {
        self.points.iter()
    }

    /// Returns the points that solved, with their swept values.
    pub fn solutions(&self) -> impl Iterator<Item = (&Values, &Solution)> {
        self.points
            .iter()
            .filter_map(|p| p.outcome.as_ref().ok().map(|s| (&p.swept, s)))
    }

    /// Returns the points that failed, with their swept values.
    pub fn failures(&self) -> impl Iterator<Item = (&Values, &SolveError)> {
        self.points
            .iter()
            .filter_map(|p| p.outcome.as_ref().err().map(|e| (&p.swept, e)))
    }

    /// Returns true if every point solved.
    #[must_use]
    pub fn all_solved(&self) -> bool {
        self.points.iter().all(|p| p.outcome.is_ok())
    }
}

impl<'a> IntoIterator for &'a SweepResults {
    type Item = &'a SweepPoint;
    type IntoIter = std::slice::Iter<'a, SweepPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl IntoIterator for SweepResults {
    type Item = SweepPoint;
    type IntoIter = std::vec::IntoIter<SweepPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}
