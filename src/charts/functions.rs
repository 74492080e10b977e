use std::f64::consts::TAU;

use log::warn;
use serde_json::json;

use super::{
    bounds, color_param, line_layers, padded, polylines, range_json, required, value_window, Chart,
};
use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::eval::{
    sample_curve, sample_surface, AxisRange, CompiledExpr, EvaluationGrid, DEFAULT_RANGE_2D,
    DEFAULT_RANGE_3D,
};
use crate::normalize::{normalize_expression, preprocess_with};
use crate::render::color::{self, cycle, Colormap};
use crate::render::{Figure, Path3, Plane, Quad, Rgb, Space};
use crate::request::Params;

struct Curve {
    expression: String,
    grid: EvaluationGrid,
}

fn curve(raw: &str, params: &Params, config: &VizConfig) -> Result<Curve> {
    let expression = preprocess_with(raw, "y", config.branch)?;
    let compiled = CompiledExpr::from_text(&expression, &["x"])?;
    let grid = sample_curve(
        &compiled,
        params.range_or("x_range", DEFAULT_RANGE_2D),
        params.usize_or("num_points", config.sampling.curve),
        config.sampling.shrink_factor,
    )?;
    Ok(Curve { expression, grid })
}

fn x_extent(grid: &EvaluationGrid) -> AxisRange {
    match (grid.xs.first(), grid.xs.last()) {
        (Some(lo), Some(hi)) if hi > lo => AxisRange::new(*lo, *hi),
        _ => DEFAULT_RANGE_2D,
    }
}

pub(super) fn function_2d(params: &Params, config: &VizConfig) -> Result<Chart> {
    let raw = required(params, "expression")?;
    let Curve { expression, grid } = curve(raw, params, config)?;
    let defined: Vec<f64> = grid.finite_values().collect();
    let y_range = params.range("y_range").unwrap_or_else(|| value_window(&defined));
    let x_range = x_extent(&grid);

    let runs = polylines(grid.xs.iter().copied().zip(grid.values.iter().copied()), y_range);
    let mut plane = Plane::new(x_range, y_range);
    plane.layers.extend(line_layers(runs, color_param(params, Rgb::BLUE)));

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "expression": expression,
            "x_range": range_json(x_range),
            "y_range": range_json(y_range),
            "defined_points": grid.defined_count(),
            "total_points": grid.values.len(),
        }),
    })
}

pub(super) fn functions_2d(params: &Params, config: &VizConfig) -> Result<Chart> {
    let raws = params
        .strings("expressions")
        .or_else(|| params.strings("functions"))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| VizError::MissingParameter("expressions".into()))?;
    let labels = params.strings("labels").filter(|l| l.len() == raws.len());

    let mut curves = Vec::new();
    let mut first_error = None;
    for (i, raw) in raws.iter().enumerate() {
        match curve(raw, params, config) {
            Ok(c) => curves.push((i, c)),
            Err(e) => {
                warn!("skipping `{raw}`: {e}");
                first_error.get_or_insert(e);
            }
        }
    }
    if curves.is_empty() {
        return Err(first_error.unwrap_or_else(|| VizError::MissingParameter("expressions".into())));
    }

    let defined: Vec<f64> = curves.iter().flat_map(|(_, c)| c.grid.finite_values()).collect();
    let y_range = params.range("y_range").unwrap_or_else(|| value_window(&defined));
    let x_range = x_extent(&curves[0].1.grid);
    let mut plane = Plane::new(x_range, y_range);
    let mut drawn = Vec::new();
    for (i, c) in &curves {
        let runs = polylines(
            c.grid.xs.iter().copied().zip(c.grid.values.iter().copied()),
            y_range,
        );
        plane.layers.extend(line_layers(runs, cycle(*i)));
        let label = labels
            .as_ref()
            .map(|l| l[*i].clone())
            .unwrap_or_else(|| format!("f{}(x)", i + 1));
        drawn.push(json!({"label": label, "expression": c.expression}));
    }

    Ok(Chart {
        figure: Figure::Plane(plane),
        data: json!({
            "functions": drawn,
            "x_range": range_json(x_range),
            "y_range": range_json(y_range),
        }),
    })
}

pub(super) fn function_3d(params: &Params, config: &VizConfig) -> Result<Chart> {
    let raw = required(params, "expression")?;
    let expression = preprocess_with(raw, "z", config.branch)?;
    let compiled = CompiledExpr::from_text(&expression, &["x", "y"])?;
    let grid = sample_surface(
        &compiled,
        params.range_or("x_range", DEFAULT_RANGE_3D),
        params.range_or("y_range", DEFAULT_RANGE_3D),
        params.usize_or("num_points", config.sampling.surface),
        config.sampling.shrink_factor,
    )?;

    let defined: Vec<f64> = grid.finite_values().collect();
    let z_range = value_window(&defined);
    let cmap = Colormap::from_name(params.str("cmap").unwrap_or("viridis"));
    let ys = grid.ys.clone().unwrap_or_default();
    let (nx, ny) = grid.shape();

    let mut quads = Vec::new();
    for j in 0..ny.saturating_sub(1) {
        for i in 0..nx.saturating_sub(1) {
            let corners = [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)];
            let Some(zs) = corners
                .iter()
                .map(|&(a, b)| grid.value_at(a, b))
                .collect::<Option<Vec<f64>>>()
            else {
                continue;
            };
            let clamp = |z: f64| z.clamp(z_range.min, z_range.max);
            let mean = zs.iter().sum::<f64>() / 4.0;
            let mut pts = [[0.0; 3]; 4];
            for (k, &(a, b)) in corners.iter().enumerate() {
                pts[k] = [grid.xs[a], ys[b], clamp(zs[k])];
            }
            quads.push(Quad {
                corners: pts,
                color: cmap.at(color::normalize(clamp(mean), z_range.min, z_range.max)),
            });
        }
    }

    let (z_min, z_max) = bounds(defined.iter().copied()).unwrap_or((f64::NAN, f64::NAN));
    let x_range = x_extent(&grid);
    let y_range = match (ys.first(), ys.last()) {
        (Some(lo), Some(hi)) if hi > lo => AxisRange::new(*lo, *hi),
        _ => DEFAULT_RANGE_3D,
    };
    Ok(Chart {
        figure: Figure::Space(Space {
            x: x_range,
            y: y_range,
            z: z_range,
            quads,
            paths: Vec::new(),
        }),
        data: json!({
            "expression": expression,
            "is_implicit": raw.contains('='),
            "x_range": range_json(x_range),
            "y_range": range_json(y_range),
            "z_min": z_min,
            "z_max": z_max,
            "defined_points": grid.defined_count(),
        }),
    })
}

pub(super) fn parametric_3d(params: &Params, config: &VizConfig) -> Result<Chart> {
    let raws: Vec<String> = match params.strings("expressions") {
        Some(list) if list.len() == 3 => list,
        _ => ["x_expression", "y_expression", "z_expression"]
            .iter()
            .map(|key| required(params, key).map(str::to_string))
            .collect::<Result<_>>()?,
    };
    let expressions = raws
        .iter()
        .map(|r| normalize_expression(r))
        .collect::<Result<Vec<_>>>()?;

    let t_range = params.range_or("t_range", AxisRange::new(0.0, TAU));
    let ts = t_range.linspace(params.usize_or("num_points", config.sampling.parametric));
    let mut columns = Vec::with_capacity(3);
    for text in &expressions {
        let compiled = CompiledExpr::from_text(text, &["t"])?;
        columns.push(compiled.eval_columns(&[ts.as_slice()], ts.len())?);
    }

    let mut runs: Vec<Vec<[f64; 3]>> = vec![Vec::new()];
    for k in 0..ts.len() {
        let p = [columns[0][k], columns[1][k], columns[2][k]];
        if p.iter().all(|v| v.is_finite()) {
            if let Some(run) = runs.last_mut() {
                run.push(p);
            }
        } else if runs.last().is_some_and(|r| !r.is_empty()) {
            runs.push(Vec::new());
        }
    }
    runs.retain(|r| r.len() > 1);
    if runs.is_empty() {
        return Err(VizError::Domain(format!(
            "parametric curve has no finite points for t in [{}, {}]",
            t_range.min, t_range.max
        )));
    }

    let axis = |k: usize| {
        let (lo, hi) = bounds(runs.iter().flatten().map(|p| p[k])).unwrap_or((-1.0, 1.0));
        padded(lo, hi)
    };
    let color = color_param(params, Rgb::BLUE);
    let point_count: usize = runs.iter().map(Vec::len).sum();
    let (x, y, z) = (axis(0), axis(1), axis(2));
    Ok(Chart {
        figure: Figure::Space(Space {
            x,
            y,
            z,
            quads: Vec::new(),
            paths: runs
                .into_iter()
                .map(|points| Path3 { points, color })
                .collect(),
        }),
        data: json!({
            "x_expression": expressions[0],
            "y_expression": expressions[1],
            "z_expression": expressions[2],
            "t_range": range_json(t_range),
            "points": point_count,
        }),
    })
}
