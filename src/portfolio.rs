//! # Portfolio
//!
//! $$
//! \mu_p = \sum_i w_i \mu_i,\qquad
//! \sigma_p^2 = \sum_i w_i^2 \sigma_i^2 + 2\sum_{i<j} w_i w_j \rho_{ij}\sigma_i\sigma_j
//! $$
//!
//! Weighted combination of instruments with aggregate return and risk.
use std::sync::Arc;

use tracing::debug;

use crate::error::FrontierError;
use crate::error::Result;
use crate::instrument::Instrument;
use crate::period::Granularity;

/// Risk/return coordinates of one portfolio evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PortfolioPoint {
  /// Standard deviation of the portfolio's period return.
  pub risk: f64,
  /// Expected period return.
  pub expected_return: f64,
}

/// Instruments paired by position with weights.
///
/// Weights are not normalized. Aggregates scale with whatever the caller
/// supplies, see [`Portfolio::weight_sum`]. Nothing is cached here; every
/// call recomputes from the constituents' own memoized statistics.
#[derive(Clone, Debug, Default)]
pub struct Portfolio {
  constituents: Vec<Arc<Instrument>>,
  weights: Vec<f64>,
}

impl Portfolio {
  pub fn new() -> Self {
    Self::default()
  }

  /// Constituents with all weights at zero, ready for [`Portfolio::set_weights`].
  pub fn unweighted(instruments: Vec<Arc<Instrument>>) -> Self {
    let weights = vec![0.0; instruments.len()];
    Self {
      constituents: instruments,
      weights,
    }
  }

  /// Replace constituents and weights together.
  pub fn set_constituents(&mut self, instruments: Vec<Arc<Instrument>>, weights: Vec<f64>) -> Result<()> {
    if instruments.len() != weights.len() {
      return Err(FrontierError::LengthMismatch {
        what: "instruments and weights",
        left: instruments.len(),
        right: weights.len(),
      });
    }

    debug!(constituents = instruments.len(), "portfolio assembled");
    self.constituents = instruments;
    self.weights = weights;
    Ok(())
  }

  /// Replace the weights, keeping the constituents.
  ///
  /// Writes into the existing buffer, so repeated updates do not allocate.
  pub fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
    if weights.len() != self.constituents.len() {
      return Err(FrontierError::LengthMismatch {
        what: "instruments and weights",
        left: self.constituents.len(),
        right: weights.len(),
      });
    }

    self.weights.copy_from_slice(weights);
    Ok(())
  }

  pub fn constituents(&self) -> &[Arc<Instrument>] {
    &self.constituents
  }

  pub fn weights(&self) -> &[f64] {
    &self.weights
  }

  pub fn len(&self) -> usize {
    self.constituents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.constituents.is_empty()
  }

  pub fn weight_sum(&self) -> f64 {
    self.weights.iter().sum()
  }

  /// Weighted sum of the constituents' expected returns.
  pub fn expected_return(&self, granularity: Granularity) -> Result<f64> {
    let mut total = 0.0;
    for (instrument, w) in self.constituents.iter().zip(&self.weights) {
      total += instrument.expected_return(granularity)? * w;
    }
    Ok(total)
  }

  /// Standard deviation of the weighted sum, expanded over every pair of
  /// constituents with price correlations.
  ///
  /// # Errors
  ///
  /// Propagates degenerate statistics from any constituent or pair, zero
  /// weights included.
  pub fn risk(&self, granularity: Granularity) -> Result<f64> {
    let variances = self
      .constituents
      .iter()
      .map(|c| c.risk(granularity).map(|s| s * s))
      .collect::<Result<Vec<f64>>>()?;

    let w = &self.weights;
    let n = self.constituents.len();
    let mut variance: f64 = (0..n).map(|i| w[i] * w[i] * variances[i]).sum();

    for i in 0..n {
      for j in (i + 1)..n {
        let rho = self.constituents[i].correlation(&self.constituents[j])?;
        variance += 2.0 * w[i] * w[j] * rho * (variances[i] * variances[j]).sqrt();
      }
    }

    // Rounding can push a perfectly hedged mix just below zero.
    Ok(variance.max(0.0).sqrt())
  }

  /// Risk and expected return in one call.
  pub fn evaluate(&self, granularity: Granularity) -> Result<PortfolioPoint> {
    Ok(PortfolioPoint {
      risk: self.risk(granularity)?,
      expected_return: self.expected_return(granularity)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn yearly(id: &str, prices: &[f64]) -> Arc<Instrument> {
    let dates = (0..prices.len()).map(|i| date(2000 + i as i32, 1, 1)).collect();
    Arc::new(Instrument::with_history(id, id, prices.to_vec(), dates).unwrap())
  }

  fn portfolio(instruments: &[&Arc<Instrument>], weights: &[f64]) -> Portfolio {
    let mut pf = Portfolio::new();
    pf.set_constituents(instruments.iter().map(|i| Arc::clone(i)).collect(), weights.to_vec())
      .unwrap();
    pf
  }

  #[test]
  fn expected_return_single_instrument() {
    let a = Arc::new(
      Instrument::with_history("id", "name", vec![100., 200.], vec![date(2000, 1, 1), date(2001, 2, 1)])
        .unwrap(),
    );
    let pf = portfolio(&[&a], &[0.5]);

    assert_abs_diff_eq!(pf.expected_return(Granularity::Year).unwrap(), 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(
      pf.expected_return(Granularity::Year).unwrap(),
      0.5 * a.expected_return(Granularity::Year).unwrap(),
      epsilon = 1e-12
    );
  }

  #[test]
  fn expected_return_two_instruments() {
    let a = Arc::new(
      Instrument::with_history("id1", "name1", vec![100., 200.], vec![date(2000, 1, 1), date(2001, 2, 1)])
        .unwrap(),
    );
    let b = Arc::new(
      Instrument::with_history("id2", "name2", vec![100., 80.], vec![date(2002, 1, 1), date(2003, 2, 1)])
        .unwrap(),
    );
    let pf = portfolio(&[&a, &b], &[0.5, 0.5]);

    assert_abs_diff_eq!(pf.expected_return(Granularity::Year).unwrap(), 0.4, epsilon = 1e-12);
    // No common dates, so the pair has no correlation to expand with.
    assert!(matches!(
      pf.risk(Granularity::Year),
      Err(FrontierError::DegenerateCorrelation { common_points: 0, .. })
    ));
  }

  #[test]
  fn single_instrument_risk_scales_with_weight() {
    let a = yearly("a", &[100., 150., 120.]);
    let pf = portfolio(&[&a], &[0.4]);
    assert_abs_diff_eq!(pf.risk(Granularity::Year).unwrap(), 0.4 * 0.35, epsilon = 1e-12);
  }

  #[test]
  fn perfectly_correlated_risks_add_linearly() {
    let a = yearly("a", &[100., 150., 120.]);
    let b = yearly("b", &[50., 60., 54.]);
    assert_abs_diff_eq!(b.risk(Granularity::Year).unwrap(), 0.15, epsilon = 1e-12);

    let pf = portfolio(&[&a, &b], &[0.5, 0.5]);
    assert_abs_diff_eq!(pf.risk(Granularity::Year).unwrap(), 0.25, epsilon = 1e-12);
  }

  #[test]
  fn anti_correlated_risks_offset() {
    let a = yearly("a", &[100., 150., 120.]);
    let c = yearly("c", &[150., 100., 130.]);
    let sigma_c = c.risk(Granularity::Year).unwrap();
    assert_abs_diff_eq!(sigma_c, 0.95 / 3.0, epsilon = 1e-12);

    let pf = portfolio(&[&a, &c], &[0.5, 0.5]);
    assert_abs_diff_eq!(
      pf.risk(Granularity::Year).unwrap(),
      0.5 * 0.35 - 0.5 * sigma_c,
      epsilon = 1e-9
    );
  }

  #[test]
  fn evaluate_matches_individual_calls() {
    let a = yearly("a", &[100., 150., 120., 130.]);
    let b = yearly("b", &[10., 11., 15., 12.]);
    let pf = portfolio(&[&a, &b], &[0.3, 0.7]);

    let point = pf.evaluate(Granularity::Year).unwrap();
    assert_eq!(point.risk, pf.risk(Granularity::Year).unwrap());
    assert_eq!(point.expected_return, pf.expected_return(Granularity::Year).unwrap());
  }

  #[test]
  fn mismatched_constituents_are_rejected() {
    let a = yearly("a", &[100., 150.]);
    let mut pf = Portfolio::new();
    let err = pf.set_constituents(vec![a], vec![0.5, 0.5]).unwrap_err();
    assert!(matches!(err, FrontierError::LengthMismatch { left: 1, right: 2, .. }));
    assert!(pf.is_empty());
  }

  #[test]
  fn weights_can_be_replaced_but_not_resized() {
    let a = yearly("a", &[100., 150.]);
    let b = yearly("b", &[100., 120.]);
    let mut pf = portfolio(&[&a, &b], &[0.5, 0.5]);

    pf.set_weights(&[0.25, 0.75]).unwrap();
    assert_eq!(pf.weights(), &[0.25, 0.75]);
    assert_abs_diff_eq!(pf.weight_sum(), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
      pf.expected_return(Granularity::Year).unwrap(),
      0.25 * 0.5 + 0.75 * 0.2,
      epsilon = 1e-12
    );

    assert!(pf.set_weights(&[1.0]).is_err());
    assert_eq!(pf.weights(), &[0.25, 0.75]);
  }

  #[test]
  fn unnormalized_weights_scale_the_return() {
    let a = yearly("a", &[100., 150.]);
    let pf = portfolio(&[&a], &[2.0]);
    assert_abs_diff_eq!(pf.expected_return(Granularity::Year).unwrap(), 1.0, epsilon = 1e-12);
  }
}
