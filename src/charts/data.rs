use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use super::{bounds, color_param, line_layers, padded, polylines, range_json, Chart};
use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::eval::AxisRange;
use crate::render::color::cycle;
use crate::render::{Figure, Layer, Plane, Rect, Rgb};
use crate::request::Params;
use crate::stats::{self, Summary};

/// Used when a pie chart arrives without usable values.
pub const DEFAULT_PIE_VALUES: [f64; 3] = [25.0, 30.0, 45.0];

const DEFAULT_SAMPLE_SIZE: usize = 100;
const WEDGE_STEPS: usize = 96;

fn statistics_json(datasets: &[Vec<f64>]) -> Value {
    let summaries: Vec<Option<Summary>> = datasets.iter().map(|d| Summary::of(d)).collect();
    match summaries.as_slice() {
        [single] => json!(single),
        many => json!(many),
    }
}

/// Flat list or list of lists, with non-finite entries dropped.
fn datasets(params: &Params, key: &str) -> Result<Vec<Vec<f64>>> {
    let rows = params
        .matrix(key)
        .ok_or_else(|| VizError::MissingParameter(key.to_string()))?;
    let cleaned: Vec<Vec<f64>> = rows
        .into_iter()
        .map(|r| r.into_iter().filter(|v| v.is_finite()).collect::<Vec<_>>())
        .filter(|r| !r.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(VizError::MissingParameter(key.to_string()));
    }
    Ok(cleaned)
}

fn labels_for(params: &Params, n: usize, prefix: &str) -> Vec<String> {
    match params.strings("labels") {
        Some(labels) if labels.len() == n => labels,
        _ => (1..=n).map(|i| format!("{prefix} {i}")).collect(),
    }
}

/// Standard normal sample from a seeded generator (Box-Muller).
fn normal_sample(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen();
            (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
        })
        .collect()
}

pub(super) fn histogram(params: &Params, config: &VizConfig) -> Result<Chart> {
    let data = match params.finite_numbers("data") {
        Some(d) if !d.is_empty() => d,
        _ => {
            info!("histogram without data, using a seeded normal sample");
            normal_sample(config.heatmap_seed, DEFAULT_SAMPLE_SIZE)
        }
    };
    let bins = params.usize_or("bins", 10);
    let (edges, counts) = stats::histogram(&data, bins);
    let color = color_param(params, Rgb::SKY);
    let rects = counts
        .iter()
        .enumerate()
        .map(|(i, c)| Rect {
            x0: edges[i],
            y0: 0.0,
            x1: edges[i + 1],
            y1: *c as f64,
            color,
        })
        .collect();
    let peak = counts.iter().copied().max().unwrap_or(0) as f64;
    let x = AxisRange::new(edges[0], edges[edges.len() - 1]);
    let plane = Plane::new(x, AxisRange::new(0.0, (peak * 1.1).max(1.0))).with(Layer::Rects(rects));

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "statistics": Summary::of(&data),
            "bin_edges": edges,
            "counts": counts,
        }),
    })
}

pub(super) fn scatter(params: &Params) -> Result<Chart> {
    let (xs, ys) = match (params.numbers("x_data"), params.numbers("y_data")) {
        (Some(xs), Some(ys)) => (xs, ys),
        _ => {
            let rows = params
                .matrix("data")
                .filter(|rows| rows.iter().all(|r| r.len() >= 2))
                .ok_or_else(|| VizError::MissingParameter("x_data".into()))?;
            rows.iter().map(|r| (Some(r[0]), Some(r[1]))).unzip()
        }
    };
    let points: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if points.is_empty() {
        return Err(VizError::MissingParameter("x_data".into()));
    }

    let (px, py): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
    let x = bounds(px.iter().copied()).map_or(AxisRange::new(-1.0, 1.0), |(a, b)| padded(a, b));
    let y = bounds(py.iter().copied()).map_or(AxisRange::new(-1.0, 1.0), |(a, b)| padded(a, b));
    let mut plane = Plane::new(x, y);

    let fit = stats::linear_fit(&px, &py);
    if let Some((slope, intercept)) = fit.filter(|_| params.bool_or("show_regression", true)) {
        plane.push(Layer::Line {
            points: vec![(x.min, slope * x.min + intercept), (x.max, slope * x.max + intercept)],
            color: Rgb::RED,
            width: 2,
        });
    }
    plane.push(Layer::Points {
        points,
        color: color_param(params, Rgb::BLUE),
        radius: 4,
    });

    let correlation = stats::corrcoef(&px.iter().zip(&py).map(|(a, b)| vec![*a, *b]).collect::<Vec<_>>());
    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "points": px.len(),
            "regression": fit.map(|(slope, intercept)| json!({"slope": slope, "intercept": intercept})),
            "correlation": correlation.first().and_then(|r| r.get(1)).copied().filter(|v| v.is_finite()),
            "x_statistics": Summary::of(&px),
            "y_statistics": Summary::of(&py),
        }),
    })
}

fn distribution_frame(sets: &[Vec<f64>]) -> Plane {
    let (lo, hi) = bounds(sets.iter().flatten().copied()).unwrap_or((0.0, 1.0));
    Plane::new(AxisRange::new(0.4, sets.len() as f64 + 0.6), padded(lo, hi))
}

pub(super) fn boxplot(params: &Params) -> Result<Chart> {
    let sets = datasets(params, "data")?;
    let labels = labels_for(params, sets.len(), "Dataset");
    let fill = color_param(params, Rgb::SKY);
    let mut plane = distribution_frame(&sets);
    let mut boxes = Vec::new();
    let mut strokes = Vec::new();
    let mut outliers = Vec::new();

    for (i, set) in sets.iter().enumerate() {
        let Some(s) = Summary::of(set) else { continue };
        let pos = i as f64 + 1.0;
        let (lo_fence, hi_fence) = (s.q1 - 1.5 * s.iqr, s.q3 + 1.5 * s.iqr);
        let inside = set.iter().copied().filter(|v| *v >= lo_fence && *v <= hi_fence);
        let (w_lo, w_hi) = bounds(inside).unwrap_or((s.q1, s.q3));
        boxes.push(Rect {
            x0: pos - 0.25,
            y0: s.q1,
            x1: pos + 0.25,
            y1: s.q3,
            color: fill,
        });
        strokes.push([(pos - 0.25, s.median), (pos + 0.25, s.median)]);
        strokes.push([(pos, w_lo), (pos, s.q1)]);
        strokes.push([(pos, s.q3), (pos, w_hi)]);
        strokes.push([(pos - 0.1, w_lo), (pos + 0.1, w_lo)]);
        strokes.push([(pos - 0.1, w_hi), (pos + 0.1, w_hi)]);
        outliers.extend(
            set.iter()
                .filter(|v| **v < lo_fence || **v > hi_fence)
                .map(|v| (pos, *v)),
        );
    }

    plane.push(Layer::Rects(boxes));
    plane.push(Layer::Segments {
        segments: strokes,
        color: Rgb::BLACK,
    });
    if !outliers.is_empty() {
        plane.push(Layer::Points {
            points: outliers,
            color: Rgb::BLACK,
            radius: 3,
        });
    }

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({"labels": labels, "statistics": statistics_json(&sets)}),
    })
}

pub(super) fn violin(params: &Params) -> Result<Chart> {
    let sets = datasets(params, "data")?;
    let labels = labels_for(params, sets.len(), "Dataset");
    let fill = color_param(params, Rgb::SKY);
    let mut plane = distribution_frame(&sets);
    let mut medians = Vec::new();

    for (i, set) in sets.iter().enumerate() {
        let pos = i as f64 + 1.0;
        let Some((lo, hi)) = bounds(set.iter().copied()) else { continue };
        let grid = AxisRange::new(lo, hi.max(lo + 1e-9)).linspace(100);
        let density = stats::gaussian_kde(set, &grid);
        let peak = density.iter().copied().fold(0.0, f64::max);
        let scale = if peak > 0.0 { 0.4 / peak } else { 0.0 };

        let right = grid.iter().zip(&density).map(|(y, d)| (pos + d * scale, *y));
        let left = grid.iter().zip(&density).rev().map(|(y, d)| (pos - d * scale, *y));
        plane.push(Layer::Polygon {
            points: right.chain(left).collect(),
            color: fill,
        });
        let median = stats::percentile(set, 50.0);
        medians.push([(pos - 0.1, median), (pos + 0.1, median)]);
    }
    plane.push(Layer::Segments {
        segments: medians,
        color: Rgb::BLACK,
    });

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({"labels": labels, "statistics": statistics_json(&sets)}),
    })
}

pub(super) fn bar(params: &Params) -> Result<Chart> {
    let values: Vec<f64> = params
        .numbers("values")
        .ok_or_else(|| VizError::MissingParameter("values".into()))?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
        .collect();
    let labels = labels_for(params, values.len(), "Category");
    let horizontal = params.bool_or("horizontal", false);
    let color = color_param(params, Rgb::SKY);

    let (lo, hi) = bounds(values.iter().copied().chain([0.0])).unwrap_or((0.0, 1.0));
    let value_axis = padded(lo, hi);
    let category_axis = AxisRange::new(-0.6, values.len() as f64 - 0.4);
    let rects = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let (c0, c1) = (i as f64 - 0.4, i as f64 + 0.4);
            if horizontal {
                Rect { x0: 0.0, y0: c0, x1: *v, y1: c1, color }
            } else {
                Rect { x0: c0, y0: 0.0, x1: c1, y1: *v, color }
            }
        })
        .collect();
    let plane = if horizontal {
        Plane::new(value_axis, category_axis)
    } else {
        Plane::new(category_axis, value_axis)
    };

    Ok(Chart {
        figure: Figure::Plane(plane.with(Layer::Rects(rects))),
        data: json!({"values": values, "labels": labels}),
    })
}

/// Values and labels after the pie fallbacks: missing or null values count as
/// zero, negatives are flipped, and an all-zero pie gets the default split.
pub fn pie_slices(
    values: Option<Vec<Option<f64>>>,
    labels: Option<Vec<String>>,
) -> (Vec<f64>, Vec<String>) {
    let mut values: Vec<f64> = match values {
        Some(v) if !v.is_empty() => v
            .into_iter()
            .map(|x| x.filter(|x| x.is_finite()).unwrap_or(0.0).abs())
            .collect(),
        _ => {
            info!("pie chart without values, using defaults");
            DEFAULT_PIE_VALUES.to_vec()
        }
    };
    if values.iter().sum::<f64>() == 0.0 {
        info!("pie chart values were all zero, using defaults");
        values = DEFAULT_PIE_VALUES.to_vec();
    }
    let labels = match labels {
        Some(l) if l.len() == values.len() => l,
        _ => (1..=values.len()).map(|i| format!("Category {i}")).collect(),
    };
    (values, labels)
}

pub(super) fn pie(params: &Params) -> Result<Chart> {
    let (values, labels) = pie_slices(params.numbers("values"), params.strings("labels"));
    let total: f64 = values.iter().sum();
    let percentages: Vec<f64> = values.iter().map(|v| v / total * 100.0).collect();
    let start = params.f64("startangle").unwrap_or(0.0).to_radians();

    let mut plane = Plane::new(AxisRange::new(-1.4, 1.4), AxisRange::new(-1.05, 1.05));
    let mut angle = start;
    for (i, v) in values.iter().enumerate() {
        let sweep = v / total * std::f64::consts::TAU;
        let steps = ((sweep / std::f64::consts::TAU) * WEDGE_STEPS as f64).ceil().max(1.0) as usize;
        let mut points = vec![(0.0, 0.0)];
        points.extend((0..=steps).map(|k| {
            let a = angle + sweep * k as f64 / steps as f64;
            (a.cos(), a.sin())
        }));
        plane.push(Layer::Polygon {
            points,
            color: cycle(i),
        });
        angle += sweep;
    }

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "values": values,
            "labels": labels,
            "percentages": percentages,
        }),
    })
}

pub(super) fn time_series(params: &Params) -> Result<Chart> {
    let rows = params
        .matrix("data")
        .ok_or_else(|| VizError::MissingParameter("data".into()))?;
    let length = rows.iter().map(Vec::len).max().unwrap_or(0);
    let times: Vec<f64> = match params.finite_numbers("times") {
        Some(t) if t.len() >= length => t,
        _ => (0..length).map(|i| i as f64).collect(),
    };
    let names = match params.strings("series_names") {
        Some(n) if n.len() == rows.len() => n,
        _ => (1..=rows.len()).map(|i| format!("Series {i}")).collect(),
    };

    let x = bounds(times.iter().copied().take(length)).map_or(AxisRange::new(0.0, 1.0), |(a, b)| padded(a, b));
    let y = bounds(rows.iter().flatten().copied()).map_or(AxisRange::new(-1.0, 1.0), |(a, b)| padded(a, b));
    let mut plane = Plane::new(x, y);
    let single = rows.len() == 1;
    for (i, row) in rows.iter().enumerate() {
        let color = if single { color_param(params, Rgb::BLUE) } else { cycle(i) };
        let samples = times.iter().copied().zip(row.iter().map(|v| v.is_finite().then_some(*v)));
        plane.layers.extend(line_layers(polylines(samples, y), color));
    }

    let finite: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| r.iter().copied().filter(|v| v.is_finite()).collect())
        .collect();
    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "series": names,
            "length": length,
            "time_range": range_json(x),
            "statistics": statistics_json(&finite),
        }),
    })
}
