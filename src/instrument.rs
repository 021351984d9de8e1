//! # Instrument
//!
//! $$
//! r_t = \frac{P_{b_t}}{P_{b_{t-1}}} - 1,\qquad
//! \mu = \frac1T\sum_t r_t,\qquad
//! \sigma = \sqrt{\frac1T\sum_t (r_t-\mu)^2}
//! $$
//!
//! Single instrument with a price history and memoized return, risk and
//! correlation statistics.
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use std::sync::RwLock;

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;
use ndarray_stats::CorrelationExt;
use tracing::trace;

use crate::error::FrontierError;
use crate::error::Result;
use crate::period::bucket_key_with;
use crate::period::BucketKeyStyle;
use crate::period::Granularity;

// Relative spread below which a price series counts as constant.
const FLAT_TOLERANCE: f64 = 1e-12;

/// Unique identifier of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(pub String);

impl InstrumentId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for InstrumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for InstrumentId {
  fn from(s: &str) -> Self {
    Self::new(s)
  }
}

impl From<String> for InstrumentId {
  fn from(s: String) -> Self {
    Self(s)
  }
}

/// A tradable asset with a price history.
///
/// Statistics are computed lazily and kept for the lifetime of the value.
/// The first stored statistic freezes the history: [`Instrument::load_history`]
/// fails from then on, so a cached value can never describe a history other
/// than the current one. Build a fresh instrument for a new dataset.
///
/// Caches take a write lock only to insert; the value is computed outside
/// the lock and the first inserted value wins, so concurrent first access
/// from several threads is safe and every caller sees the same number.
pub struct Instrument {
  id: InstrumentId,
  name: String,
  key_style: BucketKeyStyle,
  prices: Vec<f64>,
  dates: Vec<NaiveDate>,
  frozen: AtomicBool,
  return_cache: RwLock<HashMap<Granularity, f64>>,
  risk_cache: RwLock<HashMap<Granularity, f64>>,
  corr_cache: RwLock<HashMap<InstrumentId, f64>>,
}

impl fmt::Debug for Instrument {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Instrument {{ id: {}, name: {}, points: {}, frozen: {} }}",
      self.id,
      self.name,
      self.prices.len(),
      self.is_frozen()
    )
  }
}

impl Instrument {
  /// Empty instrument. Populate it with [`Instrument::load_history`].
  pub fn new(id: impl Into<InstrumentId>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      key_style: BucketKeyStyle::default(),
      prices: Vec::new(),
      dates: Vec::new(),
      frozen: AtomicBool::new(false),
      return_cache: RwLock::new(HashMap::new()),
      risk_cache: RwLock::new(HashMap::new()),
      corr_cache: RwLock::new(HashMap::new()),
    }
  }

  /// Construct and load the history in one step.
  pub fn with_history(
    id: impl Into<InstrumentId>,
    name: impl Into<String>,
    prices: Vec<f64>,
    dates: Vec<NaiveDate>,
  ) -> Result<Self> {
    let mut instrument = Self::new(id, name);
    instrument.load_history(prices, dates)?;
    Ok(instrument)
  }

  /// Bucket key layout used when resampling the history.
  pub fn key_style(mut self, style: BucketKeyStyle) -> Self {
    self.key_style = style;
    self
  }

  pub fn id(&self) -> &InstrumentId {
    &self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn prices(&self) -> &[f64] {
    &self.prices
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn len(&self) -> usize {
    self.prices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.prices.is_empty()
  }

  /// Whether a statistic has been memoized from the current history.
  pub fn is_frozen(&self) -> bool {
    self.frozen.load(Ordering::Acquire)
  }

  /// Replace the price history.
  ///
  /// Input order is kept as given; chronological order is re-derived from
  /// the bucket keys (returns) or the dates (correlation) when needed.
  ///
  /// # Errors
  ///
  /// [`FrontierError::LengthMismatch`] when the lists differ in length,
  /// [`FrontierError::HistoryFrozen`] once any statistic has been cached.
  pub fn load_history(&mut self, prices: Vec<f64>, dates: Vec<NaiveDate>) -> Result<()> {
    if prices.len() != dates.len() {
      return Err(FrontierError::LengthMismatch {
        what: "prices and dates",
        left: prices.len(),
        right: dates.len(),
      });
    }
    if *self.frozen.get_mut() {
      return Err(FrontierError::HistoryFrozen {
        id: self.id.clone(),
      });
    }

    self.prices = prices;
    self.dates = dates;
    Ok(())
  }

  /// Period-over-period relative price changes at `granularity`.
  ///
  /// Prices are collapsed per bucket key with the later observation (in
  /// input order) overwriting the earlier one, then walked in key order.
  /// Not cached.
  pub fn period_returns(&self, granularity: Granularity) -> Result<Vec<f64>> {
    let mut buckets = BTreeMap::new();
    for (date, &price) in self.dates.iter().zip(&self.prices) {
      buckets.insert(bucket_key_with(*date, granularity, self.key_style), price);
    }

    if buckets.len() < 2 {
      return Err(FrontierError::EmptySeries {
        id: self.id.clone(),
        granularity,
        buckets: buckets.len(),
      });
    }

    let prices: Vec<f64> = buckets.into_values().collect();
    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    if let Some(period) = changes.iter().position(|r| !r.is_finite()) {
      return Err(FrontierError::NonFiniteReturn {
        id: self.id.clone(),
        granularity,
        period,
      });
    }
    Ok(changes)
  }

  /// Mean period return at `granularity`.
  pub fn expected_return(&self, granularity: Granularity) -> Result<f64> {
    self.memoized(&self.return_cache, granularity, "expected_return", || {
      let changes = Array1::from(self.period_returns(granularity)?);
      changes.mean().ok_or_else(|| self.empty_series(granularity))
    })
  }

  /// Population standard deviation of the period returns at `granularity`.
  pub fn risk(&self, granularity: Granularity) -> Result<f64> {
    self.memoized(&self.risk_cache, granularity, "risk", || {
      let changes = Array1::from(self.period_returns(granularity)?);
      Ok(changes.std(0.0))
    })
  }

  /// Pearson correlation of raw prices on the dates both histories share.
  ///
  /// Cached on this instrument only, keyed by the counterpart's id. Both
  /// histories are frozen once the value is stored.
  ///
  /// # Errors
  ///
  /// [`FrontierError::DegenerateCorrelation`] with fewer than two common
  /// dates or a constant price on either side.
  pub fn correlation(&self, other: &Instrument) -> Result<f64> {
    self.memoized(&self.corr_cache, other.id.clone(), "correlation", || {
      let rho = self.compute_correlation(other)?;
      other.frozen.store(true, Ordering::Release);
      Ok(rho)
    })
  }

  fn compute_correlation(&self, other: &Instrument) -> Result<f64> {
    let left = price_by_date(self);
    let right = price_by_date(other);

    let mut common: Vec<NaiveDate> = left
      .keys()
      .filter(|d| right.contains_key(*d))
      .copied()
      .collect();
    common.sort_unstable();

    let degenerate = FrontierError::DegenerateCorrelation {
      left: self.id.clone(),
      right: other.id.clone(),
      common_points: common.len(),
    };
    if common.len() < 2 {
      return Err(degenerate);
    }

    let mut data = Array2::<f64>::zeros((2, common.len()));
    for (j, date) in common.iter().enumerate() {
      data[[0, j]] = left[date];
      data[[1, j]] = right[date];
    }

    let cov = data.cov(1.0).map_err(|_| degenerate.clone())?;
    for (row, variance) in data.rows().into_iter().zip([cov[[0, 0]], cov[[1, 1]]]) {
      let scale = row.iter().fold(0.0_f64, |m, p| m.max(p.abs()));
      // Flat relative to the price level.
      if variance.is_nan() || variance <= (FLAT_TOLERANCE * scale).powi(2) {
        return Err(degenerate);
      }
    }

    let rho = cov[[0, 1]] / (cov[[0, 0]] * cov[[1, 1]]).sqrt();
    if !rho.is_finite() {
      return Err(degenerate);
    }
    Ok(rho.clamp(-1.0, 1.0))
  }

  fn memoized<K, F>(
    &self,
    cache: &RwLock<HashMap<K, f64>>,
    key: K,
    statistic: &'static str,
    compute: F,
  ) -> Result<f64>
  where
    K: Eq + Hash + fmt::Debug,
    F: FnOnce() -> Result<f64>,
  {
    let cached = cache
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key)
      .copied();
    if let Some(value) = cached {
      return Ok(value);
    }

    trace!(id = %self.id, statistic, key = ?key, "statistic cache miss");
    let value = compute()?;

    let mut guard = cache.write().unwrap_or_else(PoisonError::into_inner);
    let stored = *guard.entry(key).or_insert(value);
    self.frozen.store(true, Ordering::Release);
    Ok(stored)
  }

  fn empty_series(&self, granularity: Granularity) -> FrontierError {
    FrontierError::EmptySeries {
      id: self.id.clone(),
      granularity,
      buckets: 0,
    }
  }
}

// Duplicate dates collapse to the last price in input order.
fn price_by_date(instrument: &Instrument) -> HashMap<NaiveDate, f64> {
  instrument
    .dates
    .iter()
    .copied()
    .zip(instrument.prices.iter().copied())
    .collect()
}
