//! # Frontier Types
//!
//! $$
//! \mathcal F(q) = \min\{\sigma_p(\mathbf w) : \operatorname{trunc}(10^d \mu_p(\mathbf w)) / 10^d = q\}
//! $$
//!
//! Configuration and result containers for the frontier search.
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::period::Granularity;
use crate::portfolio::PortfolioPoint;

/// Runtime configuration for [`super::FrontierSearch`].
#[derive(Clone, Debug)]
pub struct FrontierConfig {
  /// Weight step is `1 / resolution`.
  pub resolution: u32,
  /// Granularity of the statistics every composition is evaluated at.
  pub granularity: Granularity,
  /// Expected returns are truncated to this many decimals before bucketing.
  pub return_decimals: u32,
  /// Refuse to start when the composition count exceeds this bound.
  pub max_compositions: Option<u128>,
  /// Evaluate compositions on the rayon pool.
  pub parallel: bool,
  /// Keep every raw `(risk, return)` pair for rendering.
  pub collect_points: bool,
}

impl Default for FrontierConfig {
  fn default() -> Self {
    Self {
      resolution: 10,
      granularity: Granularity::Year,
      return_decimals: 2,
      max_compositions: None,
      parallel: false,
      collect_points: false,
    }
  }
}

/// One row of the frontier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrontierEntry<'a> {
  /// Quantized expected return.
  pub expected_return: f64,
  /// Minimum risk seen for that return.
  pub risk: f64,
  /// Exact weights of the first composition reaching that risk.
  pub weights: &'a [f64],
}

/// Discrete approximation of the efficient frontier.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontier {
  /// Quantized return to minimum risk, ascending by return.
  pub return_to_risk: BTreeMap<OrderedFloat<f64>, f64>,
  /// Quantized return to the weights achieving [`Frontier::return_to_risk`].
  pub return_to_weights: BTreeMap<OrderedFloat<f64>, Vec<f64>>,
  /// Number of compositions evaluated.
  pub compositions: u128,
  /// Raw `(risk, return)` of every composition in enumeration order, empty
  /// unless [`FrontierConfig::collect_points`] is set.
  pub points: Vec<PortfolioPoint>,
}

impl Frontier {
  pub fn len(&self) -> usize {
    self.return_to_risk.len()
  }

  pub fn is_empty(&self) -> bool {
    self.return_to_risk.is_empty()
  }

  /// Rows ordered by ascending quantized return.
  pub fn entries(&self) -> impl Iterator<Item = FrontierEntry<'_>> + '_ {
    self
      .return_to_risk
      .iter()
      .zip(self.return_to_weights.values())
      .map(|((ret, risk), weights)| FrontierEntry {
        expected_return: ret.into_inner(),
        risk: *risk,
        weights,
      })
  }

  /// Global minimum-risk row. Ties go to the lower return.
  pub fn min_risk(&self) -> Option<FrontierEntry<'_>> {
    self
      .entries()
      .reduce(|best, e| if e.risk < best.risk { e } else { best })
  }
}

/// Truncate `value` toward zero at `decimals` decimal places.
///
/// `-0.0` comes back as `0.0` so that both land on one frontier key.
pub fn quantize_return(value: f64, decimals: u32) -> f64 {
  let scale = 10f64.powi(decimals as i32);
  (scale * value).trunc() / scale + 0.0
}
