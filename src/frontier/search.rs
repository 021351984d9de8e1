//! # Frontier Search
//!
//! $$
//! \mathbf w = \tfrac1K(k_1,\dots,k_n),\quad \textstyle\sum_i k_i = K
//! \ \Longrightarrow\ (\sigma_p(\mathbf w),\ \mu_p(\mathbf w))
//! $$
//!
//! Exhaustive grid search over discretized weights.
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use rayon::iter::ParallelBridge;
use rayon::iter::ParallelIterator;
use tracing::debug;
use tracing::info;

use super::compositions::count_compositions;
use super::compositions::Compositions;
use super::types::quantize_return;
use super::types::Frontier;
use super::types::FrontierConfig;
use crate::error::FrontierError;
use crate::error::Result;
use crate::instrument::Instrument;
use crate::portfolio::Portfolio;
use crate::portfolio::PortfolioPoint;

/// Brute-force frontier search driven by a [`FrontierConfig`].
#[derive(Clone, Debug, Default)]
pub struct FrontierSearch {
  config: FrontierConfig,
}

impl FrontierSearch {
  pub fn new(config: FrontierConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &FrontierConfig {
    &self.config
  }

  /// Compositions a run over `instruments` instruments would evaluate.
  pub fn count(&self, instruments: usize) -> Result<u128> {
    count_compositions(instruments, self.config.resolution)
  }

  /// Evaluate every weight composition and keep, per quantized return, the
  /// lowest risk and the first weights reaching it.
  ///
  /// # Errors
  ///
  /// Validation errors for an empty universe, a zero resolution or a count
  /// above [`FrontierConfig::max_compositions`]; otherwise the first
  /// degenerate statistic met while evaluating.
  pub fn run(&self, instruments: &[Arc<Instrument>]) -> Result<Frontier> {
    if instruments.is_empty() {
      return Err(FrontierError::EmptyUniverse);
    }
    if self.config.resolution == 0 {
      return Err(FrontierError::InvalidResolution);
    }

    let count = self.count(instruments.len())?;
    if let Some(limit) = self.config.max_compositions {
      if count > limit {
        return Err(FrontierError::TooManyCompositions { count, limit });
      }
    }

    info!(
      instruments = instruments.len(),
      resolution = self.config.resolution,
      granularity = %self.config.granularity,
      compositions = count,
      parallel = self.config.parallel,
      "frontier search started"
    );

    let reduction = if self.config.parallel {
      self.run_parallel(instruments)?
    } else {
      self.run_sequential(instruments)?
    };
    let frontier = reduction.into_frontier();

    info!(
      compositions = frontier.compositions,
      frontier = frontier.len(),
      "frontier search finished"
    );
    Ok(frontier)
  }

  fn run_sequential(&self, instruments: &[Arc<Instrument>]) -> Result<Reduction> {
    let mut worker = Worker::new(instruments, self.config.collect_points);
    for (index, composition) in Compositions::new(instruments.len(), self.config.resolution).enumerate() {
      worker.evaluate(&self.config, index, &composition)?;
    }
    Ok(worker.reduction)
  }

  // Each rayon job folds into its own worker; merging keeps the lower risk
  // and, on equal risk, the lower enumeration index, which is what the
  // sequential first-wins scan produces.
  fn run_parallel(&self, instruments: &[Arc<Instrument>]) -> Result<Reduction> {
    let collect_points = self.config.collect_points;
    Compositions::new(instruments.len(), self.config.resolution)
      .enumerate()
      .par_bridge()
      .try_fold(
        || Worker::new(instruments, collect_points),
        |mut worker, (index, composition)| {
          worker.evaluate(&self.config, index, &composition)?;
          Ok::<Worker, FrontierError>(worker)
        },
      )
      .map(|worker| worker.map(|w| w.reduction))
      .try_reduce(
        || Reduction::new(collect_points),
        |left, right| Ok(left.merge(right)),
      )
  }
}

/// Frontier of `instruments` at weight step `1 / resolution`, yearly
/// statistics, returns truncated to two decimals.
pub fn search(instruments: &[Arc<Instrument>], resolution: u32) -> Result<Frontier> {
  FrontierSearch::new(FrontierConfig {
    resolution,
    ..FrontierConfig::default()
  })
  .run(instruments)
}

struct Worker {
  portfolio: Portfolio,
  weights: Vec<f64>,
  reduction: Reduction,
}

impl Worker {
  fn new(instruments: &[Arc<Instrument>], collect_points: bool) -> Self {
    Self {
      portfolio: Portfolio::unweighted(instruments.to_vec()),
      weights: vec![0.0; instruments.len()],
      reduction: Reduction::new(collect_points),
    }
  }

  fn evaluate(&mut self, config: &FrontierConfig, index: usize, composition: &[u32]) -> Result<()> {
    let step = config.resolution as f64;
    for (w, &units) in self.weights.iter_mut().zip(composition) {
      *w = units as f64 / step;
    }
    self.portfolio.set_weights(&self.weights)?;

    let point = self.portfolio.evaluate(config.granularity)?;
    let quantized = quantize_return(point.expected_return, config.return_decimals);
    self.reduction.offer(index, quantized, point, &self.weights);
    Ok(())
  }
}

struct Candidate {
  index: usize,
  risk: f64,
  weights: Vec<f64>,
}

// Lower risk wins; equal risk goes to the earlier composition.
fn beats(risk: f64, index: usize, incumbent: &Candidate) -> bool {
  risk < incumbent.risk || (risk == incumbent.risk && index < incumbent.index)
}

struct Reduction {
  best: BTreeMap<OrderedFloat<f64>, Candidate>,
  evaluated: u128,
  collect_points: bool,
  points: Vec<(usize, PortfolioPoint)>,
}

impl Reduction {
  fn new(collect_points: bool) -> Self {
    Self {
      best: BTreeMap::new(),
      evaluated: 0,
      collect_points,
      points: Vec::new(),
    }
  }

  fn offer(&mut self, index: usize, quantized: f64, point: PortfolioPoint, weights: &[f64]) {
    self.evaluated += 1;
    if self.collect_points {
      self.points.push((index, point));
    }

    match self.best.entry(OrderedFloat(quantized)) {
      Entry::Vacant(slot) => {
        slot.insert(Candidate {
          index,
          risk: point.risk,
          weights: weights.to_vec(),
        });
      }
      Entry::Occupied(mut slot) => {
        let incumbent = slot.get_mut();
        if beats(point.risk, index, incumbent) {
          incumbent.index = index;
          incumbent.risk = point.risk;
          incumbent.weights.copy_from_slice(weights);
        }
      }
    }
  }

  fn merge(mut self, other: Reduction) -> Reduction {
    self.evaluated += other.evaluated;
    self.points.extend(other.points);

    for (key, candidate) in other.best {
      match self.best.entry(key) {
        Entry::Vacant(slot) => {
          slot.insert(candidate);
        }
        Entry::Occupied(mut slot) => {
          if beats(candidate.risk, candidate.index, slot.get()) {
            slot.insert(candidate);
          }
        }
      }
    }
    self
  }

  fn into_frontier(mut self) -> Frontier {
    self.points.sort_unstable_by_key(|(index, _)| *index);
    debug!(evaluated = self.evaluated, buckets = self.best.len(), "reducing frontier");

    let mut frontier = Frontier {
      compositions: self.evaluated,
      points: self.points.into_iter().map(|(_, point)| point).collect(),
      ..Frontier::default()
    };
    for (key, candidate) in self.best {
      frontier.return_to_risk.insert(key, candidate.risk);
      frontier.return_to_weights.insert(key, candidate.weights);
    }
    frontier
  }
}
