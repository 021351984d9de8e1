//! # Period
//!
//! $$
//! b_g : \text{date} \mapsto \text{key},\qquad b_g(d_1)=b_g(d_2) \iff d_1 \sim_g d_2
//! $$
//!
//! Bucketing of calendar dates into resampling periods. Keys are compared
//! as plain strings downstream, so the key format doubles as the
//! chronological order of the buckets.
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use chrono::Datelike;
use chrono::NaiveDate;

/// Resampling period used to derive periodic returns.
///
/// Variants are declared from finest to coarsest, so the derived ordering
/// is the coarseness ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Granularity {
  Day,
  Week,
  Month,
  Year,
}

impl Granularity {
  pub const ALL: [Granularity; 4] = [
    Granularity::Day,
    Granularity::Week,
    Granularity::Month,
    Granularity::Year,
  ];
}

impl Display for Granularity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Granularity::Day => write!(f, "day"),
      Granularity::Week => write!(f, "week"),
      Granularity::Month => write!(f, "month"),
      Granularity::Year => write!(f, "year"),
    }
  }
}

impl FromStr for Granularity {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "day" | "daily" | "d" => Ok(Granularity::Day),
      "week" | "weekly" | "w" => Ok(Granularity::Week),
      "month" | "monthly" | "m" => Ok(Granularity::Month),
      "year" | "yearly" | "annual" | "y" => Ok(Granularity::Year),
      other => Err(format!("unknown granularity '{other}'")),
    }
  }
}

/// Textual layout of bucket keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BucketKeyStyle {
  /// Fixed-width, zero-padded fields. String order equals chronological
  /// order for years 0 through 9999.
  #[default]
  Padded,
  /// Plain concatenation of the numeric fields (`2000` + `6` = `"20006"`).
  ///
  /// Kept for output compatibility with keys produced by older tooling.
  /// String order breaks at month 10 (`"20009" > "200010"`), so returns
  /// across a September/October boundary come out of order.
  Unpadded,
}

/// Bucket key of `date` at `granularity`, padded style.
pub fn bucket_key(date: NaiveDate, granularity: Granularity) -> String {
  bucket_key_with(date, granularity, BucketKeyStyle::Padded)
}

/// Bucket key of `date` at `granularity` in the given key style.
///
/// Weeks are counted inside the month as `day / 7` (floor), so days 1..=6
/// form week 0 and days 28..=31 form week 4.
pub fn bucket_key_with(date: NaiveDate, granularity: Granularity, style: BucketKeyStyle) -> String {
  let (year, month, day) = (date.year(), date.month(), date.day());

  match (granularity, style) {
    (Granularity::Day, _) => format!("{year:04}{month:02}{day:02}"),
    (Granularity::Week, BucketKeyStyle::Padded) => format!("{year:04}{month:02}-{}", day / 7),
    (Granularity::Week, BucketKeyStyle::Unpadded) => format!("{year}{month}-{}", day / 7),
    (Granularity::Month, BucketKeyStyle::Padded) => format!("{year:04}{month:02}"),
    (Granularity::Month, BucketKeyStyle::Unpadded) => format!("{year}{month}"),
    (Granularity::Year, BucketKeyStyle::Padded) => format!("{year:04}"),
    (Granularity::Year, BucketKeyStyle::Unpadded) => format!("{year}"),
  }
}
