use log::debug;
use num_complex::Complex64;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::{color_param, line_layers, polylines, range_json, required, Chart};
use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::eval::{
    sample_complex, sample_surface, AxisRange, CompiledExpr, ComplexExpr, DEFAULT_RANGE_3D,
};
use crate::normalize::{normalize_expression, preprocess_with, rewrite};
use crate::render::color::{self, cycle, hsv, Colormap};
use crate::render::{Figure, Layer, Plane, Rect, Rgb};
use crate::request::Params;

static IMAGINARY_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d|\.)\s*([ijI])\b").expect("valid regex"));
static DERIVATIVE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:dy\s*/\s*dx|y'|y_prime)\s*=").expect("valid regex"));

/// Rectangles centred on each sample of a regular mesh.
fn cell(xs: &[f64], ys: &[f64], i: usize, j: usize, color: Rgb) -> Rect {
    let half = |v: &[f64], k: usize| -> (f64, f64) {
        let lo = if k == 0 { v[0] } else { (v[k - 1] + v[k]) / 2.0 };
        let hi = if k + 1 == v.len() { v[k] } else { (v[k] + v[k + 1]) / 2.0 };
        (lo, hi)
    };
    let (x0, x1) = half(xs, i);
    let (y0, y1) = half(ys, j);
    Rect {
        x0,
        y0,
        x1,
        y1,
        color,
    }
}

/// `levels` evenly spaced values strictly inside `(lo, hi)`.
fn contour_levels(lo: f64, hi: f64, levels: usize) -> Vec<f64> {
    let step = (hi - lo) / (levels + 1) as f64;
    (1..=levels).map(|k| lo + step * k as f64).collect()
}

pub(super) fn contour(params: &Params, config: &VizConfig) -> Result<Chart> {
    let raw = required(params, "expression")?;
    let expression = preprocess_with(raw, "z", config.branch)?;
    let compiled = CompiledExpr::from_text(&expression, &["x", "y"])?;
    let grid = sample_surface(
        &compiled,
        params.range_or("x_range", DEFAULT_RANGE_3D),
        params.range_or("y_range", DEFAULT_RANGE_3D),
        params.usize_or("num_points", config.sampling.contour),
        config.sampling.shrink_factor,
    )?;
    let (lo, hi) = grid
        .value_bounds()
        .ok_or_else(|| VizError::Domain(format!("`{expression}` has no finite values")))?;
    let level_count = params.usize_or("levels", 20);
    let levels = contour_levels(lo, hi, level_count);
    let cmap = Colormap::from_name(params.str("cmap").unwrap_or("viridis"));
    let filled = params.bool_or("filled", true);

    let xs = &grid.xs;
    let ys = grid.ys.clone().unwrap_or_default();
    let (nx, ny) = grid.shape();
    let mut plane = Plane::new(
        AxisRange::new(xs[0], xs[nx - 1]),
        AxisRange::new(ys[0], ys[ny - 1]),
    );

    if filled {
        let mut rects = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                let Some(v) = grid.value_at(i, j) else { continue };
                let band = levels.iter().filter(|l| v >= **l).count();
                let t = band as f64 / level_count.max(1) as f64;
                rects.push(cell(xs, &ys, i, j, cmap.at(t)));
            }
        }
        plane.push(Layer::Rects(rects));
    }

    for (k, level) in levels.iter().enumerate() {
        let segments = marching_squares(&grid.values, xs, &ys, *level);
        if segments.is_empty() {
            continue;
        }
        let t = color::normalize(*level, lo, hi);
        let color = if filled { cmap.at(t).scale(0.6) } else { cmap.at(t) };
        debug!("level {k} at {level}: {} segments", segments.len());
        plane.push(Layer::Segments { segments, color });
    }

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "expression": expression,
            "levels": levels,
            "z_min": lo,
            "z_max": hi,
            "filled": filled,
        }),
    })
}

/// Iso-line segments of `level` through a row-major grid.
fn marching_squares(
    values: &[Option<f64>],
    xs: &[f64],
    ys: &[f64],
    level: f64,
) -> Vec<[(f64, f64); 2]> {
    let nx = xs.len();
    let at = |i: usize, j: usize| values.get(j * nx + i).copied().flatten();
    let mut segments = Vec::new();
    for j in 0..ys.len().saturating_sub(1) {
        for i in 0..nx.saturating_sub(1) {
            let corners = [
                (xs[i], ys[j], at(i, j)),
                (xs[i + 1], ys[j], at(i + 1, j)),
                (xs[i + 1], ys[j + 1], at(i + 1, j + 1)),
                (xs[i], ys[j + 1], at(i, j + 1)),
            ];
            if corners.iter().any(|c| c.2.is_none()) {
                continue;
            }
            let mut crossings = Vec::with_capacity(4);
            for e in 0..4 {
                let (xa, ya, va) = corners[e];
                let (xb, yb, vb) = corners[(e + 1) % 4];
                let (Some(va), Some(vb)) = (va, vb) else { continue };
                if (va < level) != (vb < level) {
                    let t = (level - va) / (vb - va);
                    crossings.push((xa + t * (xb - xa), ya + t * (yb - ya)));
                }
            }
            for pair in crossings.chunks_exact(2) {
                segments.push([pair[0], pair[1]]);
            }
        }
    }
    segments
}

/// How a complex function's values are mapped to color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComplexView {
    Phase,
    Abs,
    Real,
    Imag,
}

impl ComplexView {
    fn from_name(name: &str) -> ComplexView {
        match name.to_ascii_lowercase().as_str() {
            "abs" | "modulus" => ComplexView::Abs,
            "real" | "re" => ComplexView::Real,
            "imag" | "im" => ComplexView::Imag,
            _ => ComplexView::Phase,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ComplexView::Phase => "phase",
            ComplexView::Abs => "abs",
            ComplexView::Real => "real",
            ComplexView::Imag => "imag",
        }
    }

    fn scalar(self, w: Complex64) -> f64 {
        match self {
            ComplexView::Phase => w.arg(),
            ComplexView::Abs => (w.norm() + 1.0).ln(),
            ComplexView::Real => w.re,
            ComplexView::Imag => w.im,
        }
    }
}

/// Phase to hue, magnitude to brightness.
pub fn domain_color(w: Complex64) -> Rgb {
    let hue = (w.arg() + std::f64::consts::PI) / std::f64::consts::TAU;
    let brightness = 0.5 * (1.0 + (w.norm().ln() / 2.0).tanh());
    hsv(hue, 1.0, brightness)
}

pub(super) fn complex_function(params: &Params, config: &VizConfig) -> Result<Chart> {
    let raw = required(params, "expression")?;
    let text = IMAGINARY_LITERAL.replace_all(&rewrite(raw), "$1*$2").into_owned();
    let expr = ComplexExpr::from_text(&text, "z")?;
    let re_range = params.range_or("x_range", DEFAULT_RANGE_3D);
    let im_range = params.range_or("y_range", DEFAULT_RANGE_3D);
    let samples = params.usize_or("num_points", config.sampling.complex);
    let grid = sample_complex(&expr, re_range, im_range, samples);
    let view = ComplexView::from_name(params.str("plot_type").unwrap_or("phase"));

    let scalars: Vec<Option<f64>> = grid
        .values
        .iter()
        .map(|w| w.map(|w| view.scalar(w)).filter(|v| v.is_finite()))
        .collect();
    let (lo, hi) = super::bounds(scalars.iter().flatten().copied())
        .ok_or_else(|| VizError::Domain(format!("`{text}` has no finite values")))?;
    let cmap = match view {
        ComplexView::Abs => Colormap::Viridis,
        _ => Colormap::RdBu,
    };

    let mut rects = Vec::with_capacity(grid.values.len());
    for j in 0..grid.im.len() {
        for i in 0..grid.re.len() {
            let Some(w) = grid.value_at(i, j) else { continue };
            let color = match view {
                ComplexView::Phase => domain_color(w),
                _ => match scalars[j * grid.re.len() + i] {
                    Some(v) => cmap.at(color::normalize(v, lo, hi)),
                    None => continue,
                },
            };
            rects.push(cell(&grid.re, &grid.im, i, j, color));
        }
    }

    Ok(Chart {
        figure: Figure::Plane(Plane::new(re_range, im_range).with(Layer::Rects(rects))),
        data: json!({
            "expression": text,
            "plot_type": view.name(),
            "x_range": range_json(re_range),
            "y_range": range_json(im_range),
        }),
    })
}

/// Classic fourth-order Runge-Kutta for `dy/dx = f(x, y)` over `xs`.
fn rk4(f: &CompiledExpr, xs: &[f64], y0: f64) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(xs.len());
    let mut y = y0;
    out.push(Some(y));
    for w in xs.windows(2) {
        let (x, h) = (w[0], w[1] - w[0]);
        let k1 = f.eval(&[x, y]);
        let k2 = f.eval(&[x + h / 2.0, y + h * k1 / 2.0]);
        let k3 = f.eval(&[x + h / 2.0, y + h * k2 / 2.0]);
        let k4 = f.eval(&[x + h, y + h * k3]);
        y += h / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4);
        if !y.is_finite() {
            out.resize(xs.len(), None);
            return out;
        }
        out.push(Some(y));
    }
    out
}

pub(super) fn slope_field(params: &Params) -> Result<Chart> {
    let raw = required(params, "expression")?;
    let stripped = DERIVATIVE_PREFIX.replace(raw, "");
    let expression = normalize_expression(&stripped)?;
    let f = CompiledExpr::from_text(&expression, &["x", "y"])?;
    let x_range = params.range_or("x_range", DEFAULT_RANGE_3D);
    let y_range = params.range_or("y_range", DEFAULT_RANGE_3D);
    let density = params.usize_or("density", 20).max(2);

    let xs = x_range.linspace(density);
    let ys = y_range.linspace(density);
    let cell_w = x_range.span() / (density - 1) as f64;
    let cell_h = y_range.span() / (density - 1) as f64;
    let half = 0.35 * cell_w.min(cell_h);

    let mut segments = Vec::with_capacity(density * density);
    for y in &ys {
        for x in &xs {
            let slope = f.eval(&[*x, *y]);
            if !slope.is_finite() {
                continue;
            }
            let norm = (1.0 + slope * slope).sqrt();
            let (dx, dy) = (half / norm, half * slope / norm);
            segments.push([(x - dx, y - dy), (x + dx, y + dy)]);
        }
    }

    let mut plane = Plane::new(x_range, y_range).with(Layer::Segments {
        segments,
        color: color_param(params, Rgb::BLACK),
    });

    let solutions = params.finite_numbers("solutions").unwrap_or_default();
    let sol_xs = x_range.linspace(100);
    for (k, y0) in solutions.iter().enumerate() {
        let ys = rk4(&f, &sol_xs, *y0);
        let runs = polylines(sol_xs.iter().copied().zip(ys), y_range);
        plane.layers.extend(line_layers(runs, cycle(k)));
    }

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "expression": expression,
            "x_range": range_json(x_range),
            "y_range": range_json(y_range),
            "solutions": solutions,
        }),
    })
}
