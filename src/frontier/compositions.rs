//! # Compositions
//!
//! $$
//! \#\{(k_1,\dots,k_n)\in\mathbb N^n : \textstyle\sum_i k_i = K\} = \binom{K+n-1}{n-1}
//! $$
//!
//! Enumeration and counting of integer weight compositions.
use crate::error::FrontierError;
use crate::error::Result;

/// Iterator over every composition of `total` into `parts` non-negative
/// integers.
///
/// Order is the depth-first order of choosing `k_1`, then `k_2`, ... each
/// from `0` up to the remaining budget, with the last part taking the
/// remainder. For three parts of two: `[0,0,2] [0,1,1] [0,2,0] [1,0,1]
/// [1,1,0] [2,0,0]`. The state is one vector, no recursion.
#[derive(Clone, Debug)]
pub struct Compositions {
  parts: usize,
  total: u32,
  current: Vec<u32>,
  started: bool,
  done: bool,
}

impl Compositions {
  pub fn new(parts: usize, total: u32) -> Self {
    Self {
      parts,
      total,
      current: vec![0; parts],
      started: false,
      done: false,
    }
  }

  fn advance(&mut self) -> bool {
    let last = self.parts - 1;

    // Rightmost non-final part that can still take a unit from its suffix.
    let mut suffix = 0;
    let mut pivot = None;
    for i in (0..last).rev() {
      suffix += self.current[i + 1];
      if suffix > 0 {
        pivot = Some(i);
        break;
      }
    }
    let Some(i) = pivot else {
      return false;
    };

    self.current[i] += 1;
    let used: u32 = self.current[..=i].iter().sum();
    for part in &mut self.current[i + 1..last] {
      *part = 0;
    }
    self.current[last] = self.total - used;
    true
  }
}

impl Iterator for Compositions {
  type Item = Vec<u32>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }

    if !self.started {
      self.started = true;
      if self.parts == 0 {
        self.done = true;
        return (self.total == 0).then(Vec::new);
      }
      self.current[self.parts - 1] = self.total;
      return Some(self.current.clone());
    }

    if self.advance() {
      Some(self.current.clone())
    } else {
      self.done = true;
      None
    }
  }
}

/// Number of compositions of `total` into `parts` parts, without
/// enumerating them.
///
/// Two rolling rows of `total + 1` counts: row `i` holds, for every budget
/// `j`, the ways to spread `j` units over `i` parts, and is the prefix sum
/// of row `i - 1`. Row zero is `[1, 0, .., 0]`.
///
/// # Errors
///
/// [`FrontierError::CompositionOverflow`] when the count exceeds `u128`.
pub fn count_compositions(parts: usize, total: u32) -> Result<u128> {
  let width = total as usize + 1;
  let mut prev = vec![0u128; width];
  let mut next = vec![0u128; width];
  prev[0] = 1;

  for _ in 0..parts {
    let mut running: u128 = 0;
    for j in 0..width {
      running = running
        .checked_add(prev[j])
        .ok_or(FrontierError::CompositionOverflow {
          instruments: parts,
          resolution: total,
        })?;
      next[j] = running;
    }
    std::mem::swap(&mut prev, &mut next);
  }

  Ok(prev[width - 1])
}
