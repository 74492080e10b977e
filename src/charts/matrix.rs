use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use super::{bounds, Chart};
use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::eval::AxisRange;
use crate::render::color::{normalize, Colormap};
use crate::render::{Figure, Layer, Plane, Rect, Rgb};
use crate::request::Params;
use crate::stats;

const DEFAULT_HEATMAP_SIZE: usize = 5;

/// Seeded 5x5 matrix of uniform values in `[0, 1)`.
pub fn default_heatmap(seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..DEFAULT_HEATMAP_SIZE)
        .map(|_| (0..DEFAULT_HEATMAP_SIZE).map(|_| rng.gen::<f64>()).collect())
        .collect()
}

/// `x_data`, `y_data` and a flat `values` list of `len(x) * len(y)` entries,
/// reshaped into one row per y value.
fn reshape_flat(params: &Params) -> Option<Vec<Vec<f64>>> {
    let nx = params.get("x_data")?.as_array()?.len();
    let ny = params.get("y_data")?.as_array()?.len();
    let values = params.numbers("values")?;
    if nx == 0 || ny == 0 || values.len() != nx * ny {
        return None;
    }
    let flat: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    Some(flat.chunks(nx).map(<[f64]>::to_vec).collect())
}

/// The matrix a heatmap request describes, if any: the alternative flat
/// format first, then `data`. Ragged rows are padded with NaN.
pub fn heatmap_matrix(params: &Params) -> Option<Vec<Vec<f64>>> {
    let mut rows = reshape_flat(params).or_else(|| params.matrix("data"))?;
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return None;
    }
    for row in &mut rows {
        row.resize(width, f64::NAN);
    }
    Some(rows)
}

/// Labels for `n` ticks: truncated or extended with `{filler} i`.
fn fit_labels(labels: Option<Vec<String>>, n: usize, filler: &str) -> Vec<String> {
    let mut labels = labels.unwrap_or_default();
    labels.truncate(n);
    let have = labels.len();
    labels.extend((have + 1..=n).map(|i| format!("{filler} {i}")));
    labels
}

/// Colored cells with row 0 at the top.
fn cells(rows: &[Vec<f64>], cmap: Colormap, lo: f64, hi: f64) -> Plane {
    let height = rows.len();
    let width = rows.first().map_or(0, Vec::len);
    let mut rects = Vec::with_capacity(width * height);
    for (i, row) in rows.iter().enumerate() {
        let y = (height - 1 - i) as f64;
        for (j, v) in row.iter().enumerate() {
            let color = if v.is_finite() {
                cmap.at(normalize(*v, lo, hi))
            } else {
                Rgb::GRAY
            };
            let x = j as f64;
            rects.push(Rect {
                x0: x - 0.5,
                y0: y - 0.5,
                x1: x + 0.5,
                y1: y + 0.5,
                color,
            });
        }
    }
    Plane::new(
        AxisRange::new(-0.5, width as f64 - 0.5),
        AxisRange::new(-0.5, height as f64 - 0.5),
    )
    .with(Layer::Rects(rects))
}

pub(super) fn heatmap(params: &Params, config: &VizConfig) -> Result<Chart> {
    let flat = reshape_flat(params).is_some();
    let rows = match heatmap_matrix(params) {
        Some(rows) => rows,
        None => {
            info!("heatmap without data, using the seeded default matrix");
            default_heatmap(config.heatmap_seed)
        }
    };
    let finite: Vec<f64> = rows.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    let (min, max) = bounds(finite.iter().copied())
        .ok_or_else(|| VizError::Domain("heatmap data has no finite values".into()))?;

    let lo = params.f64("vmin").unwrap_or(min);
    let hi = params.f64("vmax").unwrap_or(max);
    let cmap = Colormap::from_name(params.str("cmap").unwrap_or("viridis"));
    let plane = cells(&rows, cmap, lo, hi);

    let fallback = |key: &str| if flat { params.strings(key) } else { None };
    let x_labels = params.strings("x_labels").or_else(|| fallback("x_data"));
    let y_labels = params.strings("y_labels").or_else(|| fallback("y_data"));
    let width = rows[0].len();

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "min_value": min,
            "max_value": max,
            "mean_value": stats::mean(&finite),
            "shape": [rows.len(), width],
            "x_labels": fit_labels(x_labels, width, "Col"),
            "y_labels": fit_labels(y_labels, rows.len(), "Row"),
        }),
    })
}

pub(super) fn correlation_matrix(params: &Params) -> Result<Chart> {
    let mut rows = params
        .matrix("data")
        .ok_or_else(|| VizError::MissingParameter("data".into()))?;

    let matrix = if stats::is_correlation_matrix(&rows) {
        rows
    } else {
        if params.bool_or("variables_in_rows", false) {
            rows = stats::transpose(&rows);
        }
        if rows.len() < 2 {
            return Err(VizError::Domain(
                "correlation needs at least two observations per variable".into(),
            ));
        }
        stats::corrcoef(&rows)
    };

    let n = matrix.len();
    let labels = match params.strings("labels") {
        Some(labels) if labels.len() == n => labels,
        _ => (1..=n).map(|i| format!("Var {i}")).collect(),
    };
    let cmap = Colormap::from_name(params.str("cmap").unwrap_or("coolwarm"));
    let lo = params.f64("vmin").unwrap_or(-1.0);
    let hi = params.f64("vmax").unwrap_or(1.0);

    Ok(Chart {
        figure: Figure::Plane(cells(&matrix, cmap, lo, hi)),
        data: json!({
            "correlation_matrix": matrix,
            "variables": labels,
        }),
    })
}
