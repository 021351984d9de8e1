use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use frontier_rs::frontier::FrontierConfig;
use frontier_rs::frontier::FrontierSearch;
use frontier_rs::instrument::Instrument;
use frontier_rs::instrument::InstrumentId;
use frontier_rs::loader::load_universe;
use frontier_rs::loader::CsvLayout;
use frontier_rs::period::BucketKeyStyle;
use frontier_rs::period::Granularity;
use frontier_rs::visualization::FrontierPlotter;
use prettytable::row;
use prettytable::Cell;
use prettytable::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "frontier-rs")]
#[command(about = "Brute-force efficient frontier over quote files", long_about = None)]
struct Cli {
  /// Quote file as `<layout>=<path>`; layouts: china-a-share, nasdaq-100, sp-500
  #[arg(short, long = "source", required = true)]
  sources: Vec<String>,

  /// Instrument ids to combine, in order (default: every loaded instrument)
  #[arg(long, value_delimiter = ',')]
  ids: Vec<String>,

  /// Weight step is 1/resolution
  #[arg(short, long, default_value_t = 10)]
  resolution: u32,

  /// day, week, month or year
  #[arg(short, long, default_value = "year")]
  granularity: Granularity,

  /// Decimals kept when bucketing expected returns
  #[arg(long, default_value_t = 2)]
  decimals: u32,

  /// Use the legacy unpadded period keys
  #[arg(long)]
  unpadded_keys: bool,

  /// Evaluate compositions on all cores
  #[arg(long)]
  parallel: bool,

  /// Refuse searches larger than this
  #[arg(long)]
  max_compositions: Option<u128>,

  /// Print the composition count and exit
  #[arg(long)]
  count_only: bool,

  /// Write an HTML chart of the frontier here
  #[arg(long)]
  plot: Option<PathBuf>,
}

fn parse_source(raw: &str, key_style: BucketKeyStyle) -> Result<(PathBuf, CsvLayout)> {
  let Some((layout, path)) = raw.split_once('=') else {
    bail!("source '{raw}' is not of the form <layout>=<path>");
  };
  let layout = CsvLayout {
    key_style,
    ..CsvLayout::preset(layout)?
  };
  Ok((PathBuf::from(path), layout))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();
  let key_style = if cli.unpadded_keys {
    BucketKeyStyle::Unpadded
  } else {
    BucketKeyStyle::Padded
  };

  let sources = cli
    .sources
    .iter()
    .map(|raw| parse_source(raw, key_style))
    .collect::<Result<Vec<_>>>()?;
  let mut universe = load_universe(&sources)?;

  let instruments: Vec<Arc<Instrument>> = if cli.ids.is_empty() {
    universe.into_values().collect()
  } else {
    cli
      .ids
      .iter()
      .map(|id| {
        universe
          .remove(&InstrumentId::new(id.as_str()))
          .with_context(|| format!("instrument '{id}' not found in any source"))
      })
      .collect::<Result<_>>()?
  };

  let search = FrontierSearch::new(FrontierConfig {
    resolution: cli.resolution,
    granularity: cli.granularity,
    return_decimals: cli.decimals,
    max_compositions: cli.max_compositions,
    parallel: cli.parallel,
    collect_points: cli.plot.is_some(),
  });

  let count = search.count(instruments.len())?;
  println!("{} instruments, {count} compositions", instruments.len());
  if cli.count_only {
    return Ok(());
  }

  let frontier = search.run(&instruments)?;

  let mut table = Table::new();
  let mut header = row!["return", "risk"];
  for instrument in &instruments {
    header.add_cell(Cell::new(instrument.id().as_str()));
  }
  table.set_titles(header);
  for entry in frontier.entries() {
    let mut line = row![
      format!("{:.*}", cli.decimals as usize, entry.expected_return),
      format!("{:.6}", entry.risk)
    ];
    for w in entry.weights {
      line.add_cell(Cell::new(&format!("{w:.3}")));
    }
    table.add_row(line);
  }
  table.printstd();

  if let Some(best) = frontier.min_risk() {
    info!(
      expected_return = best.expected_return,
      risk = best.risk,
      "minimum-risk portfolio"
    );
  }

  if let Some(path) = cli.plot {
    let title = format!("Efficient frontier ({}, 1/{})", cli.granularity, cli.resolution);
    FrontierPlotter::new()
      .title(&title)
      .register(&frontier, "portfolio")
      .plot()
      .write_html(&path);
    info!(path = %path.display(), "frontier chart written");
  }

  Ok(())
}
