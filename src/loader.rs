//! # Loader
//!
//! $$
//! \text{rows} \to \{(\text{id}, [(d_t, P_t)]_t)\}
//! $$
//!
//! Bulk history loading from delimited quote files. Rows that do not parse
//! are reported and skipped; they never abort a load.
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use csv::StringRecord;
use tracing::info;
use tracing::warn;

use crate::instrument::Instrument;
use crate::instrument::InstrumentId;
use crate::period::BucketKeyStyle;

/// Where a row's instrument identity comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdSource {
  /// Many instruments per file, identified by columns of each row.
  Columns { id: usize, name: usize },
  /// One instrument per file.
  Fixed { id: String, name: String },
}

/// Column layout of a quote file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvLayout {
  pub date_column: usize,
  /// `chrono` format string of the date column.
  pub date_format: String,
  pub price_column: usize,
  pub ids: IdSource,
  pub has_headers: bool,
  pub key_style: BucketKeyStyle,
}

impl CsvLayout {
  /// China A-share dump: `date(%Y%m%d), id, _, _, name, _, _, _, _, close`.
  pub fn china_a_share() -> Self {
    Self {
      date_column: 0,
      date_format: "%Y%m%d".into(),
      price_column: 9,
      ids: IdSource::Columns { id: 1, name: 4 },
      has_headers: false,
      key_style: BucketKeyStyle::default(),
    }
  }

  /// NASDAQ 100 index history: `date(%m/%d/%Y), close`.
  pub fn nasdaq_100() -> Self {
    Self::single(".NDX", "NASDAQ 100", "%m/%d/%Y")
  }

  /// S&P 500 index history: `date(%Y/%m/%d), close`.
  pub fn sp_500() -> Self {
    Self::single(".SAP", "S&P 500", "%Y/%m/%d")
  }

  /// One instrument per file with the date in column 0 and price in column 1.
  pub fn single(id: &str, name: &str, date_format: &str) -> Self {
    Self {
      date_column: 0,
      date_format: date_format.into(),
      price_column: 1,
      ids: IdSource::Fixed {
        id: id.into(),
        name: name.into(),
      },
      has_headers: false,
      key_style: BucketKeyStyle::default(),
    }
  }

  /// Preset by name: `china-a-share`, `nasdaq-100`, `sp-500`.
  pub fn preset(name: &str) -> Result<Self> {
    match name.to_lowercase().as_str() {
      "china-a-share" | "china" | "a-share" => Ok(Self::china_a_share()),
      "nasdaq-100" | "ndx" | "nasdaq" => Ok(Self::nasdaq_100()),
      "sp-500" | "sp500" | "sap" => Ok(Self::sp_500()),
      other => bail!("unknown quote file layout '{other}'"),
    }
  }
}

/// A row left out of the load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedRow {
  /// 1-based record number in the file.
  pub row: usize,
  pub reason: String,
}

/// Instruments built from one file, in first-seen order, and the rows
/// that were skipped on the way.
#[derive(Debug, Default)]
pub struct LoadOutcome {
  pub instruments: Vec<Instrument>,
  pub skipped: Vec<SkippedRow>,
}

struct Quote {
  id: String,
  name: String,
  date: NaiveDate,
  price: f64,
}

#[derive(Default)]
struct Series {
  name: String,
  prices: Vec<f64>,
  dates: Vec<NaiveDate>,
}

fn field<'r>(record: &'r StringRecord, column: usize, what: &str) -> std::result::Result<&'r str, String> {
  record
    .get(column)
    .map(str::trim)
    .ok_or_else(|| format!("missing {what} column {column}"))
}

fn parse_row(record: &StringRecord, layout: &CsvLayout) -> std::result::Result<Quote, String> {
  let raw_date = field(record, layout.date_column, "date")?;
  let date = NaiveDate::parse_from_str(raw_date, &layout.date_format)
    .map_err(|e| format!("bad date '{raw_date}': {e}"))?;

  let (id, name) = match &layout.ids {
    IdSource::Columns { id, name } => (
      field(record, *id, "id")?.to_string(),
      field(record, *name, "name")?.to_string(),
    ),
    IdSource::Fixed { id, name } => (id.clone(), name.clone()),
  };

  let raw_price = field(record, layout.price_column, "price")?;
  let price: f64 = raw_price
    .parse()
    .map_err(|e| format!("bad price '{raw_price}': {e}"))?;
  if !price.is_finite() {
    return Err(format!("non-finite price '{raw_price}'"));
  }
  if price <= 0.0 {
    return Err(format!("non-positive price '{raw_price}'"));
  }

  Ok(Quote {
    id,
    name,
    date,
    price,
  })
}

/// Load every instrument in `reader` according to `layout`.
pub fn load_reader<R: Read>(reader: R, layout: &CsvLayout) -> Result<LoadOutcome> {
  let mut csv = ReaderBuilder::new()
    .has_headers(layout.has_headers)
    .flexible(true)
    .from_reader(reader);

  let mut order: Vec<String> = Vec::new();
  let mut series: HashMap<String, Series> = HashMap::new();
  let mut skipped = Vec::new();

  for (i, result) in csv.records().enumerate() {
    let row = i + 1;
    let quote = result
      .map_err(|e| e.to_string())
      .and_then(|record| parse_row(&record, layout));

    match quote {
      Ok(quote) => {
        let entry = series.entry(quote.id.clone()).or_insert_with(|| {
          order.push(quote.id.clone());
          Series::default()
        });
        entry.name = quote.name;
        entry.prices.push(quote.price);
        entry.dates.push(quote.date);
      }
      Err(reason) => {
        warn!(row, %reason, "skipping quote row");
        skipped.push(SkippedRow { row, reason });
      }
    }
  }

  let mut instruments = Vec::with_capacity(order.len());
  for id in order {
    let Some(s) = series.remove(&id) else {
      continue;
    };
    let mut instrument = Instrument::new(id, s.name).key_style(layout.key_style);
    instrument.load_history(s.prices, s.dates)?;
    instruments.push(instrument);
  }

  Ok(LoadOutcome {
    instruments,
    skipped,
  })
}

/// Load a quote file from disk.
pub fn load_path(path: impl AsRef<Path>, layout: &CsvLayout) -> Result<LoadOutcome> {
  let path = path.as_ref();
  let file = File::open(path).with_context(|| format!("failed to open quote file {}", path.display()))?;
  let outcome = load_reader(file, layout).with_context(|| format!("failed to load {}", path.display()))?;

  info!(
    path = %path.display(),
    instruments = outcome.instruments.len(),
    skipped = outcome.skipped.len(),
    "quote file loaded"
  );
  Ok(outcome)
}

/// Load several files into one universe keyed by instrument id. An id seen
/// again in a later source replaces the earlier instrument.
pub fn load_universe(sources: &[(PathBuf, CsvLayout)]) -> Result<BTreeMap<InstrumentId, Arc<Instrument>>> {
  let mut universe = BTreeMap::new();
  for (path, layout) in sources {
    for instrument in load_path(path, layout)?.instruments {
      universe.insert(instrument.id().clone(), Arc::new(instrument));
    }
  }
  Ok(universe)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use tracing_test::traced_test;

  use super::*;
  use crate::period::Granularity;

  const A_SHARE: &str = "\
trade_date,ts_code,open,high,name,low,pre_close,change,vol,close
20000104,600000.SH,0,0,Pudong Bank,0,0,0,0,10.0
20000104,000001.SZ,0,0,Ping An,0,0,0,0,20.0
20010104,600000.SH,0,0,SPD Bank,0,0,0,0,15.0
2001-01-05,000001.SZ,0,0,Ping An,0,0,0,0,21.0
20010105,000001.SZ,0,0,Ping An,0,0,0,0,n/a
20010106,000001.SZ,0,0
20010108,000001.SZ,0,0,Ping An,0,0,0,0,16.0
";

  #[test]
  fn loads_many_instruments_per_file_in_first_seen_order() {
    let outcome = load_reader(A_SHARE.as_bytes(), &CsvLayout::china_a_share()).unwrap();

    let ids: Vec<&str> = outcome.instruments.iter().map(|i| i.id().as_str()).collect();
    assert_eq!(ids, vec!["600000.SH", "000001.SZ"]);

    let spd = &outcome.instruments[0];
    assert_eq!(spd.name(), "SPD Bank");
    assert_eq!(spd.prices(), &[10.0, 15.0]);
    assert!((spd.expected_return(Granularity::Year).unwrap() - 0.5).abs() < 1e-12);

    let ping_an = &outcome.instruments[1];
    assert_eq!(ping_an.prices(), &[20.0, 16.0]);
    assert_eq!(
      ping_an.dates(),
      &[
        NaiveDate::from_ymd_opt(2000, 1, 4).unwrap(),
        NaiveDate::from_ymd_opt(2001, 1, 8).unwrap()
      ]
    );
  }

  #[test]
  fn malformed_rows_are_skipped_not_fatal() {
    let outcome = load_reader(A_SHARE.as_bytes(), &CsvLayout::china_a_share()).unwrap();

    let rows: Vec<usize> = outcome.skipped.iter().map(|s| s.row).collect();
    assert_eq!(rows, vec![1, 5, 6, 7]);
    assert!(outcome.skipped[0].reason.starts_with("bad date 'trade_date'"));
    assert!(outcome.skipped[2].reason.starts_with("bad price 'n/a'"));
    assert_eq!(outcome.skipped[3].reason, "missing name column 4");
  }

  #[test]
  fn fixed_id_layouts_build_one_instrument() {
    let ndx = "Date,Close\n01/03/2000,3790.55\n01/03/2001,2335.04\n13/40/2001,1.0\n";
    let outcome = load_reader(ndx.as_bytes(), &CsvLayout::nasdaq_100()).unwrap();
    assert_eq!(outcome.instruments.len(), 1);
    assert_eq!(outcome.instruments[0].id().as_str(), ".NDX");
    assert_eq!(outcome.instruments[0].name(), "NASDAQ 100");
    assert_eq!(outcome.instruments[0].len(), 2);
    assert_eq!(outcome.skipped.len(), 2);

    let spx = "2000/01/03,1455.22\n2001/01/02,1283.27\n";
    let outcome = load_reader(spx.as_bytes(), &CsvLayout::sp_500()).unwrap();
    assert_eq!(outcome.instruments[0].id().as_str(), ".SAP");
    assert!(outcome.skipped.is_empty());
  }

  #[test]
  fn non_positive_prices_are_skipped() {
    let spx = "2000/01/03,0\n2001/01/02,-3.5\n2002/01/02,1283.27\n2003/01/02,inf\n";
    let outcome = load_reader(spx.as_bytes(), &CsvLayout::sp_500()).unwrap();
    assert_eq!(outcome.instruments[0].prices(), &[1283.27]);

    let reasons: Vec<&str> = outcome.skipped.iter().map(|s| s.reason.as_str()).collect();
    assert_eq!(
      reasons,
      vec![
        "non-positive price '0'",
        "non-positive price '-3.5'",
        "non-finite price 'inf'"
      ]
    );
  }

  #[test]
  fn headers_can_be_declared() {
    let layout = CsvLayout {
      has_headers: true,
      ..CsvLayout::sp_500()
    };
    let outcome = load_reader("date,close\n2000/01/03,1.0\n".as_bytes(), &layout).unwrap();
    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.instruments[0].len(), 1);
  }

  #[test]
  fn layout_presets_by_name() {
    assert_eq!(CsvLayout::preset("NDX").unwrap(), CsvLayout::nasdaq_100());
    assert_eq!(CsvLayout::preset("china-a-share").unwrap(), CsvLayout::china_a_share());
    assert!(CsvLayout::preset("ftse").is_err());
  }

  #[test]
  fn universe_merges_files_and_later_ids_win() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a_share.csv");
    let second = dir.path().join("spx.csv");
    let third = dir.path().join("spx_revised.csv");
    File::create(&first).unwrap().write_all(A_SHARE.as_bytes()).unwrap();
    File::create(&second).unwrap().write_all(b"2000/01/03,1.0\n2001/01/03,2.0\n").unwrap();
    File::create(&third).unwrap().write_all(b"2000/01/03,1.0\n2001/01/03,3.0\n").unwrap();

    let universe = load_universe(&[
      (first, CsvLayout::china_a_share()),
      (second, CsvLayout::sp_500()),
      (third, CsvLayout::sp_500()),
    ])
    .unwrap();

    let ids: Vec<&str> = universe.keys().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec![".SAP", "000001.SZ", "600000.SH"]);
    assert_eq!(universe[&InstrumentId::new(".SAP")].prices(), &[1.0, 3.0]);
  }

  #[test]
  fn missing_file_is_an_error_with_context() {
    let err = load_path("/definitely/not/here.csv", &CsvLayout::sp_500()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to open quote file"));
  }

  #[test]
  #[traced_test]
  fn skipped_rows_are_logged() {
    load_reader("garbage,1.0\n".as_bytes(), &CsvLayout::sp_500()).unwrap();
    assert!(logs_contain("skipping quote row"));
  }
}
