//! # Error
//!
//! $$
//! \text{failure} \in \{\text{validation},\ \text{degenerate statistic},\ \text{bound}\}
//! $$
//!
use thiserror::Error;

use crate::instrument::InstrumentId;
use crate::period::Granularity;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Errors raised by the statistics engine and the frontier search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrontierError {
  /// Two parallel lists disagree in length.
  #[error("length of {what} does not match: {left} != {right}")]
  LengthMismatch {
    what: &'static str,
    left: usize,
    right: usize,
  },

  /// History replacement after the first memoized statistic.
  #[error("history of {id} is frozen, statistics were already computed from it")]
  HistoryFrozen { id: InstrumentId },

  /// Fewer than two distinct period buckets, so there is no period return.
  #[error("{id} has {buckets} distinct {granularity} bucket(s), at least 2 are required")]
  EmptySeries {
    id: InstrumentId,
    granularity: Granularity,
    buckets: usize,
  },

  /// A period return that is not a finite number, from a zero or
  /// non-finite bucket price.
  #[error("{id} has a non-finite {granularity} return at period {period}")]
  NonFiniteReturn {
    id: InstrumentId,
    granularity: Granularity,
    period: usize,
  },

  /// Correlation over too few common dates, or a price series that does
  /// not vary relative to its own scale.
  #[error("correlation between {left} and {right} is undefined over {common_points} common date(s)")]
  DegenerateCorrelation {
    left: InstrumentId,
    right: InstrumentId,
    common_points: usize,
  },

  #[error("weight resolution must be positive")]
  InvalidResolution,

  #[error("frontier search needs at least one instrument")]
  EmptyUniverse,

  /// Search size above the configured bound.
  #[error("{count} compositions exceed the configured limit of {limit}")]
  TooManyCompositions { count: u128, limit: u128 },

  #[error("number of compositions of {resolution} over {instruments} instruments overflows u128")]
  CompositionOverflow { instruments: usize, resolution: u32 },
}
