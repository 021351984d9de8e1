//! # Visualization
//!
//! $$
//! \{(\sigma_p, \mu_p)\}_{\mathbf w} \cup \mathcal F \mapsto \text{risk/return chart}
//! $$
//!
use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use plotly::common::Line;
use plotly::common::Marker;
use plotly::common::Mode;
use plotly::layout::Axis;
use plotly::layout::Margin;

use crate::frontier::Frontier;

struct FrontierSeries {
  label: String,
  cloud: Vec<(f64, f64)>,
  risk: Vec<f64>,
  expected_return: Vec<f64>,
  weights: Vec<String>,
}

/// Risk on the x axis, expected return on the y axis. Each registered
/// frontier contributes a line and, when it carries raw points, a cloud of
/// markers.
pub struct FrontierPlotter {
  series: Vec<FrontierSeries>,
  title: String,
  marker_size: usize,
  line_width: f64,
  show_cloud: bool,
}

impl Default for FrontierPlotter {
  fn default() -> Self {
    Self::new()
  }
}

impl FrontierPlotter {
  pub fn new() -> Self {
    Self {
      series: Vec::new(),
      title: "Efficient Frontier".into(),
      marker_size: 4,
      line_width: 2.0,
      show_cloud: true,
    }
  }

  pub fn title(mut self, title: &str) -> Self {
    self.title = title.into();
    self
  }

  pub fn marker_size(mut self, size: usize) -> Self {
    self.marker_size = size;
    self
  }

  pub fn line_width(mut self, w: f64) -> Self {
    self.line_width = w;
    self
  }

  pub fn show_cloud(mut self, show: bool) -> Self {
    self.show_cloud = show;
    self
  }

  pub fn register(mut self, frontier: &Frontier, label: &str) -> Self {
    let mut risk = Vec::with_capacity(frontier.len());
    let mut expected_return = Vec::with_capacity(frontier.len());
    let mut weights = Vec::with_capacity(frontier.len());
    for entry in frontier.entries() {
      risk.push(entry.risk);
      expected_return.push(entry.expected_return);
      weights.push(format!(
        "w = [{}]",
        entry
          .weights
          .iter()
          .map(|w| format!("{w:.3}"))
          .collect::<Vec<_>>()
          .join(", ")
      ));
    }

    self.series.push(FrontierSeries {
      label: label.into(),
      cloud: frontier
        .points
        .iter()
        .map(|p| (p.risk, p.expected_return))
        .collect(),
      risk,
      expected_return,
      weights,
    });
    self
  }

  pub fn plot(self) -> Plot {
    let mut plot = Plot::new();
    plot.set_layout(
      Layout::new()
        .title(self.title.as_str())
        .auto_size(true)
        .margin(Margin::new().left(64).right(24).top(72).bottom(56))
        .x_axis(Axis::new().title("risk (σ)").zero_line(false))
        .y_axis(Axis::new().title("expected return (μ)").zero_line(false)),
    );

    for series in self.series {
      if self.show_cloud && !series.cloud.is_empty() {
        let (x, y): (Vec<f64>, Vec<f64>) = series.cloud.into_iter().unzip();
        let cloud = Scatter::new(x, y)
          .mode(Mode::Markers)
          .marker(Marker::new().size(self.marker_size).opacity(0.35))
          .name(format!("{} portfolios", series.label).as_str());
        plot.add_trace(cloud);
      }

      let line = Scatter::new(series.risk, series.expected_return)
        .mode(Mode::LinesMarkers)
        .line(Line::new().width(self.line_width))
        .hover_text_array(series.weights)
        .name(format!("{} frontier", series.label).as_str());
      plot.add_trace(line);
    }

    plot
  }

  pub fn show(self) {
    self.plot().show();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::NaiveDate;

  use super::*;
  use crate::frontier::FrontierConfig;
  use crate::frontier::FrontierSearch;
  use crate::instrument::Instrument;

  fn yearly(id: &str, prices: &[f64]) -> Arc<Instrument> {
    let dates = (0..prices.len())
      .map(|i| NaiveDate::from_ymd_opt(2000 + i as i32, 1, 1).unwrap())
      .collect();
    Arc::new(Instrument::with_history(id, id, prices.to_vec(), dates).unwrap())
  }

  fn frontier(collect_points: bool) -> Frontier {
    let instruments = vec![
      yearly("a", &[100., 150., 120., 130.]),
      yearly("b", &[10., 11., 15., 12.]),
    ];
    FrontierSearch::new(FrontierConfig {
      resolution: 4,
      collect_points,
      ..FrontierConfig::default()
    })
    .run(&instruments)
    .unwrap()
  }

  #[test]
  fn plot_frontier_with_cloud() {
    let plot = FrontierPlotter::new()
      .title("a/b")
      .marker_size(6)
      .register(&frontier(true), "yearly")
      .plot();

    let json = plot.to_json();
    assert!(json.contains("yearly portfolios"));
    assert!(json.contains("yearly frontier"));
    assert!(json.contains("w = [1.000, 0.000]"));
  }

  #[test]
  fn cloud_is_skipped_without_points_or_when_hidden() {
    let json = FrontierPlotter::new()
      .register(&frontier(false), "bare")
      .plot()
      .to_json();
    assert!(!json.contains("bare portfolios"));

    let json = FrontierPlotter::new()
      .show_cloud(false)
      .register(&frontier(true), "hidden")
      .plot()
      .to_json();
    assert!(!json.contains("hidden portfolios"));
    assert!(json.contains("hidden frontier"));
  }

  #[test]
  fn plot_writes_html() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frontier.html");
    FrontierPlotter::new()
      .register(&frontier(true), "yearly")
      .plot()
      .write_html(&path);
    assert!(path.exists());
  }
}
