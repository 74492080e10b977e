//! Per-kind data preparation: parameters in, [`Figure`] plus summary data out.

mod data;
mod fields;
mod functions;
mod matrix;

use log::debug;
use serde_json::Value;

use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::eval::AxisRange;
use crate::render::{Figure, Layer, Rgb};
use crate::request::{Params, VisualizationKind};
use crate::stats;

pub use data::{pie_slices, DEFAULT_PIE_VALUES};
pub use matrix::{default_heatmap, heatmap_matrix};

/// A prepared chart: what to draw and what to report back.
#[derive(Clone, Debug)]
pub struct Chart {
    pub figure: Figure,
    pub data: Value,
}

/// Prepare the chart for `kind`. Every kind has exactly one builder.
pub fn build(kind: VisualizationKind, params: &Params, config: &VizConfig) -> Result<Chart> {
    debug!("building {kind} chart");
    match kind {
        VisualizationKind::Function2d => functions::function_2d(params, config),
        VisualizationKind::Functions2d => functions::functions_2d(params, config),
        VisualizationKind::Function3d => functions::function_3d(params, config),
        VisualizationKind::Parametric3d => functions::parametric_3d(params, config),
        VisualizationKind::Histogram => data::histogram(params, config),
        VisualizationKind::Scatter => data::scatter(params),
        VisualizationKind::Boxplot => data::boxplot(params),
        VisualizationKind::Violin => data::violin(params),
        VisualizationKind::Bar => data::bar(params),
        VisualizationKind::Heatmap => matrix::heatmap(params, config),
        VisualizationKind::Pie => data::pie(params),
        VisualizationKind::Contour => fields::contour(params, config),
        VisualizationKind::ComplexFunction => fields::complex_function(params, config),
        VisualizationKind::TimeSeries => data::time_series(params),
        VisualizationKind::CorrelationMatrix => matrix::correlation_matrix(params),
        VisualizationKind::SlopeField => fields::slope_field(params),
    }
}

fn required<'a>(params: &Params<'a>, key: &str) -> Result<&'a str> {
    params
        .str(key)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| VizError::MissingParameter(key.to_string()))
}

fn color_param(params: &Params, default: Rgb) -> Rgb {
    params.str("color").and_then(Rgb::parse).unwrap_or(default)
}

/// `[lo, hi]` widened by 5% on each side; a degenerate span becomes `value ± 1`.
fn padded(lo: f64, hi: f64) -> AxisRange {
    if !(lo.is_finite() && hi.is_finite()) {
        return AxisRange::new(-1.0, 1.0);
    }
    if hi - lo < 1e-12 {
        return AxisRange::new(lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    AxisRange::new(lo - pad, hi + pad)
}

fn bounds(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Display window for sampled values: the 1st to 99th percentile, so poles
/// do not flatten the rest of the curve.
fn value_window(values: &[f64]) -> AxisRange {
    if values.is_empty() {
        return AxisRange::new(-1.0, 1.0);
    }
    let lo = stats::percentile(values, 1.0);
    let hi = stats::percentile(values, 99.0);
    padded(lo, hi)
}

/// Split samples into polylines, breaking on undefined values or values outside `window`.
fn polylines(points: impl IntoIterator<Item = (f64, Option<f64>)>, window: AxisRange) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (x, y) in points {
        match y {
            Some(y) if y >= window.min && y <= window.max => current.push((x, y)),
            _ => {
                if current.len() > 1 {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}

fn line_layers(runs: Vec<Vec<(f64, f64)>>, color: Rgb) -> impl Iterator<Item = Layer> {
    runs.into_iter().map(move |points| Layer::Line {
        points,
        color,
        width: 2,
    })
}

fn range_json(range: AxisRange) -> Value {
    serde_json::json!([range.min, range.max])
}
