//! Aggregation and winner selection.
//!
//! Results are ranked ascending by clock count, ties broken by case name,
//! so the ranking does not depend on the order in which cases finished.
//! The winner is the case with the fewest clocks; among equal clock counts
//! the smallest area wins.
//!
//! # Example
//!
//! ```
//! use hestia::selector::{ExperimentResult, Selection};
//! use hestia::sweep::{Coordinate, Coordinates};
//! use std::collections::BTreeMap;
//!
//! let result = |prefix: &str, value: u64, clocks: u64| {
//!     let coordinates = Coordinates::new(vec![Coordinate {
//!         axis: "capacity".into(),
//!         prefix: prefix.into(),
//!         value,
//!     }]);
//!     ExperimentResult::new(coordinates.case_name(), coordinates, clocks, BTreeMap::new())
//! };
//!
//! let selection = Selection::from_results(&[result("c", 4, 90), result("c", 1, 90), result("c", 2, 120)]);
//! let winner = selection.winner.unwrap();
//! assert_eq!(winner.name.as_str(), "c_1");
//! assert_eq!(winner.area, 1);
//! ```

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::sweep::{CaseName, Coordinates};
use crate::types::{Area, ClockCount, CounterValue};

/// Outcome of one successful case. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentResult {
    name: CaseName,
    coordinates: Coordinates,
    clock_count: ClockCount,
    counters: BTreeMap<String, CounterValue>,
}

impl ExperimentResult {
    pub fn new(
        name: CaseName,
        coordinates: Coordinates,
        clock_count: ClockCount,
        counters: BTreeMap<String, CounterValue>,
    ) -> Self {
        Self {
            name,
            coordinates,
            clock_count,
            counters,
        }
    }

    pub fn name(&self) -> &CaseName {
        &self.name
    }

    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// Engine clock count at completion.
    pub fn clock_count(&self) -> ClockCount {
        self.clock_count
    }

    pub fn counters(&self) -> &BTreeMap<String, CounterValue> {
        &self.counters
    }

    /// Sum of the coordinate values.
    pub fn area(&self) -> Area {
        self.coordinates.area()
    }

    /// The ranking entry for this result.
    pub fn ranked(&self) -> RankedCase {
        RankedCase {
            name: self.name.clone(),
            clocks: self.clock_count,
            area: self.area(),
        }
    }
}

/// One entry of a [`Ranking`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCase {
    pub name: CaseName,
    pub clocks: ClockCount,
    pub area: Area,
}

/// Cases ordered ascending by `(clocks, name)`.
///
/// Serializes as a JSON object mapping case name to clock count, keeping
/// rank order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ranking(Vec<RankedCase>);

impl Ranking {
    /// Ranks the given results.
    pub fn rank<'a>(results: impl IntoIterator<Item = &'a ExperimentResult>) -> Self {
        let mut entries: Vec<RankedCase> = results.into_iter().map(ExperimentResult::ranked).collect();
        entries.sort_by(|a, b| a.clocks.cmp(&b.clocks).then_with(|| a.name.cmp(&b.name)));
        Ranking(entries)
    }

    /// The first `n` entries, or all of them if there are fewer.
    pub fn top(&self, n: usize) -> Ranking {
        Ranking(self.0.iter().take(n).cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedCase> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&RankedCase> {
        self.0.first()
    }

    /// Looks up a case by name.
    pub fn get(&self, name: &str) -> Option<&RankedCase> {
        self.0.iter().find(|e| e.name.as_str() == name)
    }

    /// Case names in rank order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.name.as_str()).collect()
    }
}

impl Serialize for Ranking {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(entry.name.as_str(), &entry.clocks)?;
        }
        map.end()
    }
}

/// The selected best case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub name: CaseName,
    pub clocks: ClockCount,
    pub area: Area,
}

impl From<&RankedCase> for Winner {
    fn from(entry: &RankedCase) -> Self {
        Winner {
            name: entry.name.clone(),
            clocks: entry.clocks,
            area: entry.area,
        }
    }
}

/// Picks the winner among `candidates`, in iteration order.
///
/// The first candidate is the initial winner. A later candidate replaces
/// it when its clock count is strictly lower, or equal with a strictly
/// lower area. Returns `None` for an empty input.
pub fn select_winner<'a>(candidates: impl IntoIterator<Item = &'a RankedCase>) -> Option<Winner> {
    let mut winner: Option<&RankedCase> = None;
    for candidate in candidates {
        winner = match winner {
            None => Some(candidate),
            Some(best)
                if candidate.clocks < best.clocks
                    || (candidate.clocks == best.clocks && candidate.area < best.area) =>
            {
                Some(candidate)
            }
            keep => keep,
        };
    }
    winner.map(Winner::from)
}

/// Rankings and winner computed from a set of results.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub all: Ranking,
    pub top_5: Ranking,
    pub top_10: Ranking,
    pub winner: Option<Winner>,
}

impl Selection {
    /// Aggregates `results`, independent of their order.
    ///
    /// The winner scan runs over the full ranking, so when clock count and
    /// area both tie the lexicographically smallest name wins.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ExperimentResult>) -> Self {
        let all = Ranking::rank(results);
        let winner = select_winner(all.iter());
        Selection {
            top_5: all.top(5),
            top_10: all.top(10),
            all,
            winner,
        }
    }
}
