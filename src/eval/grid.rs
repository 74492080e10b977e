use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};
use crate::eval::compile::CompiledExpr;

/// Closed interval sampled along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

pub const DEFAULT_RANGE_2D: AxisRange = AxisRange {
    min: -10.0,
    max: 10.0,
};

pub const DEFAULT_RANGE_3D: AxisRange = AxisRange { min: -5.0, max: 5.0 };

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Same center, span multiplied by `factor`.
    pub fn shrink(&self, factor: f64) -> Self {
        let half = self.span() * factor / 2.0;
        Self::new(self.center() - half, self.center() + half)
    }

    /// `samples` evenly spaced points including both ends.
    pub fn linspace(&self, samples: usize) -> Vec<f64> {
        match samples {
            0 => Vec::new(),
            1 => vec![self.min],
            n => {
                let step = self.span() / (n - 1) as f64;
                (0..n)
                    .map(|i| if i == n - 1 { self.max } else { self.min + step * i as f64 })
                    .collect()
            }
        }
    }
}

/// Sample coordinates with their values; `None` marks an undefined sample.
///
/// Surface values are row-major: `values[j * xs.len() + i]` belongs to `(xs[i], ys[j])`.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationGrid {
    pub xs: Vec<f64>,
    pub ys: Option<Vec<f64>>,
    pub values: Vec<Option<f64>>,
}

impl EvaluationGrid {
    fn from_raw(xs: Vec<f64>, ys: Option<Vec<f64>>, raw: Vec<f64>) -> Self {
        let values = raw
            .into_iter()
            .map(|v| if v.is_finite() { Some(v) } else { None })
            .collect();
        Self { xs, ys, values }
    }

    fn undefined(xs: Vec<f64>, ys: Option<Vec<f64>>) -> Self {
        let len = xs.len() * ys.as_ref().map_or(1, Vec::len);
        Self {
            xs,
            ys,
            values: vec![None; len],
        }
    }

    /// `(columns, rows)`; rows is 1 for a curve.
    pub fn shape(&self) -> (usize, usize) {
        (self.xs.len(), self.ys.as_ref().map_or(1, Vec::len))
    }

    pub fn value_at(&self, i: usize, j: usize) -> Option<f64> {
        let (nx, ny) = self.shape();
        if i >= nx || j >= ny {
            return None;
        }
        self.values.get(j * nx + i).copied().flatten()
    }

    pub fn finite_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v)
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Smallest and largest defined value.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        self.finite_values().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Defined `(x, y)` pairs of a curve.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.xs
            .iter()
            .zip(&self.values)
            .filter_map(|(x, v)| v.map(|y| (*x, y)))
            .collect()
    }
}

/// Evaluate a one-variable expression along `range`.
pub fn sample_curve(
    expr: &CompiledExpr,
    range: AxisRange,
    samples: usize,
    shrink_factor: f64,
) -> Result<EvaluationGrid> {
    with_retry(range, None, shrink_factor, |xr, _| {
        let xs = xr.linspace(samples);
        let raw = expr.eval_columns(&[xs.as_slice()], xs.len());
        guarded(raw, xs, None)
    })
}

/// Evaluate a two-variable expression over the `x_range` by `y_range` mesh.
pub fn sample_surface(
    expr: &CompiledExpr,
    x_range: AxisRange,
    y_range: AxisRange,
    samples: usize,
    shrink_factor: f64,
) -> Result<EvaluationGrid> {
    with_retry(x_range, Some(y_range), shrink_factor, |xr, yr| {
        let xs = xr.linspace(samples);
        let ys = yr.map(|r| r.linspace(samples)).unwrap_or_default();
        let len = xs.len() * ys.len();
        let mut mesh_x = Vec::with_capacity(len);
        let mut mesh_y = Vec::with_capacity(len);
        for y in &ys {
            for x in &xs {
                mesh_x.push(*x);
                mesh_y.push(*y);
            }
        }
        let raw = expr.eval_columns(&[mesh_x.as_slice(), mesh_y.as_slice()], len);
        guarded(raw, xs, Some(ys))
    })
}

/// Value at one point, `None` when it is not finite.
pub fn eval_point(expr: &CompiledExpr, point: &[f64]) -> Option<f64> {
    let v = expr.eval(point);
    v.is_finite().then_some(v)
}

fn guarded(raw: Result<Vec<f64>>, xs: Vec<f64>, ys: Option<Vec<f64>>) -> EvaluationGrid {
    match raw {
        Ok(values) => EvaluationGrid::from_raw(xs, ys, values),
        Err(e) => {
            warn!("grid evaluation failed, marking every sample undefined: {e}");
            EvaluationGrid::undefined(xs, ys)
        }
    }
}

fn with_retry<F>(
    x_range: AxisRange,
    y_range: Option<AxisRange>,
    shrink_factor: f64,
    mut run: F,
) -> Result<EvaluationGrid>
where
    F: FnMut(AxisRange, Option<AxisRange>) -> EvaluationGrid,
{
    let grid = run(x_range, y_range);
    if grid.defined_count() > 0 {
        return Ok(grid);
    }

    let xr = x_range.shrink(shrink_factor);
    let yr = y_range.map(|r| r.shrink(shrink_factor));
    debug!("no finite values on {x_range:?}, retrying on {xr:?}");
    let grid = run(xr, yr);
    if grid.defined_count() > 0 {
        return Ok(grid);
    }
    Err(VizError::Domain(format!(
        "no finite values for x in [{}, {}]",
        x_range.min, x_range.max
    )))
}
