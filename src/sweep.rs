//! Design-space generation.
//!
//! A [`DesignSpace`] is the cartesian product of an ordered list of
//! [`ExperimentAxis`]. Cases are produced lazily in nested-loop order with
//! the last axis varying fastest, so iteration order is reproducible run to
//! run.
//!
//! Every case carries its [`Coordinates`] and a [`CaseName`] built from
//! them: one `prefix_value` token per axis, in axis order, joined by `.`.
//! Names only use ASCII alphanumerics, `_` and `.`, so they are safe as
//! directory names, and [`CaseName::parse`] recovers the exact coordinate
//! tuple.
//!
//! # Example
//!
//! ```
//! use hestia::sweep::{DesignSpace, ExperimentAxis};
//!
//! let space = DesignSpace::new(vec![
//!     ExperimentAxis::new("read_rate", "r", [1, 2]),
//!     ExperimentAxis::new("latency", "l", [0, 1]),
//! ])
//! .unwrap();
//!
//! let names: Vec<String> = space.iter().map(|c| c.name.to_string()).collect();
//! assert_eq!(names, ["r_1.l_0", "r_1.l_1", "r_2.l_0", "r_2.l_1"]);
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::ExperimentError;
use crate::types::{Area, AxisValue, PREFIX_DELIMITER, TOKEN_DELIMITER};

/// A named list of candidate values for one tunable parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentAxis {
    /// Name of the tuned parameter (e.g. `read_rate`)
    pub name: String,
    /// Short prefix used in case names (e.g. `r`)
    pub prefix: String,
    /// Candidate values, in sweep order
    pub values: Vec<AxisValue>,
}

impl ExperimentAxis {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        values: impl IntoIterator<Item = AxisValue>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            values: values.into_iter().collect(),
        }
    }

    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// One axis value of a case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub axis: String,
    pub prefix: String,
    pub value: AxisValue,
}

/// The coordinate tuple of a case, in axis order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinates(Vec<Coordinate>);

impl Coordinates {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self(coordinates)
    }

    /// Derived cost of the case: the sum of its coordinate values.
    pub fn area(&self) -> Area {
        self.0.iter().fold(0, |acc: Area, c| acc.saturating_add(c.value))
    }

    /// Value of the named axis.
    pub fn get(&self, axis: &str) -> Option<AxisValue> {
        self.0.iter().find(|c| c.axis == axis).map(|c| c.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.0.iter()
    }

    /// The bare value tuple.
    pub fn values(&self) -> Vec<AxisValue> {
        self.0.iter().map(|c| c.value).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the coordinates as a case name.
    pub fn case_name(&self) -> CaseName {
        let mut name = String::new();
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                name.push(TOKEN_DELIMITER);
            }
            name.push_str(&c.prefix);
            name.push(PREFIX_DELIMITER);
            name.push_str(&c.value.to_string());
        }
        CaseName(name)
    }
}

/// Errors from decoding a case name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaseNameError {
    #[error("case name is empty")]
    Empty,

    #[error("malformed case name token `{0}`, expected `prefix_value`")]
    MalformedToken(String),

    #[error("case name token `{0}` does not carry an unsigned integer value")]
    InvalidValue(String),
}

/// Identifier of a case, reproducible from its coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseName(String);

impl CaseName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the name back into `(prefix, value)` pairs, in axis order.
    pub fn parse(name: &str) -> Result<Vec<(String, AxisValue)>, CaseNameError> {
        if name.is_empty() {
            return Err(CaseNameError::Empty);
        }
        name.split(TOKEN_DELIMITER)
            .map(|token| {
                let (prefix, value) = token
                    .split_once(PREFIX_DELIMITER)
                    .filter(|(prefix, _)| is_valid_prefix(prefix))
                    .ok_or_else(|| CaseNameError::MalformedToken(token.to_string()))?;
                if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(CaseNameError::InvalidValue(token.to_string()));
                }
                let value = value
                    .parse()
                    .map_err(|_| CaseNameError::InvalidValue(token.to_string()))?;
                Ok((prefix.to_string(), value))
            })
            .collect()
    }

    /// Decodes the value tuple encoded in this name.
    pub fn values(&self) -> Result<Vec<AxisValue>, CaseNameError> {
        Ok(Self::parse(&self.0)?.into_iter().map(|(_, v)| v).collect())
    }
}

impl FromStr for CaseName {
    type Err = CaseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)?;
        Ok(CaseName(s.to_string()))
    }
}

impl fmt::Display for CaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CaseName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One concrete assignment of a value to every axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentCase {
    /// Position in generation order
    pub index: usize,
    pub name: CaseName,
    pub coordinates: Coordinates,
}

impl ExperimentCase {
    /// Value assigned to the named axis.
    pub fn value(&self, axis: &str) -> Option<AxisValue> {
        self.coordinates.get(axis)
    }
}

/// The cartesian product of an ordered list of axes.
#[derive(Clone, Debug)]
pub struct DesignSpace {
    axes: Vec<ExperimentAxis>,
    len: usize,
}

impl DesignSpace {
    /// Validates the axes and computes the number of cases.
    ///
    /// # Errors
    /// Fatal configuration problems: no axes, an axis with no values, a
    /// prefix that is not ASCII alphanumeric, a prefix shared by two axes,
    /// a value listed twice on one axis, or a product that overflows `usize`.
    pub fn new(axes: Vec<ExperimentAxis>) -> Result<Self, ExperimentError> {
        if axes.is_empty() {
            return Err(ExperimentError::NoAxes);
        }

        let mut prefixes = HashSet::new();
        let mut len: usize = 1;
        for axis in &axes {
            if axis.values.is_empty() {
                return Err(ExperimentError::EmptyAxis(axis.name.clone()));
            }
            if !is_valid_prefix(&axis.prefix) {
                return Err(ExperimentError::InvalidPrefix {
                    axis: axis.name.clone(),
                    prefix: axis.prefix.clone(),
                });
            }
            if !prefixes.insert(axis.prefix.as_str()) {
                return Err(ExperimentError::DuplicatePrefix(axis.prefix.clone()));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = axis.values.iter().find(|v| !seen.insert(**v)) {
                return Err(ExperimentError::DuplicateValue {
                    axis: axis.name.clone(),
                    value: *dup,
                });
            }
            len = len
                .checked_mul(axis.cardinality())
                .ok_or(ExperimentError::SpaceTooLarge)?;
        }

        Ok(Self { axes, len })
    }

    pub fn axes(&self) -> &[ExperimentAxis] {
        &self.axes
    }

    /// Number of cases: the product of the axis cardinalities.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: a valid space has at least one case.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the case at `index` in generation order.
    pub fn case_at(&self, index: usize) -> Option<ExperimentCase> {
        if index >= self.len {
            return None;
        }

        // Mixed-radix decode, last axis least significant
        let mut rest = index;
        let mut picks = vec![0usize; self.axes.len()];
        for (slot, axis) in picks.iter_mut().zip(&self.axes).rev() {
            *slot = rest % axis.cardinality();
            rest /= axis.cardinality();
        }

        let coordinates = Coordinates(
            self.axes
                .iter()
                .zip(picks)
                .map(|(axis, pick)| Coordinate {
                    axis: axis.name.clone(),
                    prefix: axis.prefix.clone(),
                    value: axis.values[pick],
                })
                .collect(),
        );

        Some(ExperimentCase {
            index,
            name: coordinates.case_name(),
            coordinates,
        })
    }

    /// Lazily iterates all cases in generation order.
    pub fn iter(&self) -> Cases<'_> {
        Cases { space: self, next: 0 }
    }
}

impl<'a> IntoIterator for &'a DesignSpace {
    type Item = ExperimentCase;
    type IntoIter = Cases<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the cases of a [`DesignSpace`].
#[derive(Clone, Debug)]
pub struct Cases<'a> {
    space: &'a DesignSpace,
    next: usize,
}

impl Iterator for Cases<'_> {
    type Item = ExperimentCase;

    fn next(&mut self) -> Option<Self::Item> {
        let case = self.space.case_at(self.next)?;
        self.next += 1;
        Some(case)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.space.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Cases<'_> {}
