//! Core type definitions shared across the crate.
//!
//! These aliases keep the units of the sweep and the engine contract
//! explicit at every signature.

/// Engine clock count reported at the end of a run.
///
/// All cases of one experiment share the same clock domain setup, so clock
/// counts are directly comparable across cases.
pub type ClockCount = u64;

/// Cost derived from a case's coordinates (the "area" tie-breaker).
pub type Area = u64;

/// A single candidate value on an experiment axis.
pub type AxisValue = u64;

/// Engine counter value, keyed by its dotted path.
pub type CounterValue = i64;

/// Separates an axis prefix from its value inside a case name token.
pub const PREFIX_DELIMITER: char = '_';

/// Separates the tokens of a case name.
pub const TOKEN_DELIMITER: char = '.';
