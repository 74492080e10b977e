//! Request and result records exchanged with callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VizError};
use crate::eval::{AxisRange, CompiledExpr};
use crate::normalize::normalize_expression;

/// Every chart the visualizer can draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationKind {
    #[serde(rename = "function_2d")]
    Function2d,
    #[serde(rename = "functions_2d")]
    Functions2d,
    #[serde(rename = "function_3d")]
    Function3d,
    #[serde(rename = "parametric_3d")]
    Parametric3d,
    Histogram,
    Scatter,
    Boxplot,
    Violin,
    Bar,
    Heatmap,
    Pie,
    Contour,
    ComplexFunction,
    TimeSeries,
    CorrelationMatrix,
    SlopeField,
}

impl VisualizationKind {
    pub const ALL: [VisualizationKind; 16] = [
        VisualizationKind::Function2d,
        VisualizationKind::Functions2d,
        VisualizationKind::Function3d,
        VisualizationKind::Parametric3d,
        VisualizationKind::Histogram,
        VisualizationKind::Scatter,
        VisualizationKind::Boxplot,
        VisualizationKind::Violin,
        VisualizationKind::Bar,
        VisualizationKind::Heatmap,
        VisualizationKind::Pie,
        VisualizationKind::Contour,
        VisualizationKind::ComplexFunction,
        VisualizationKind::TimeSeries,
        VisualizationKind::CorrelationMatrix,
        VisualizationKind::SlopeField,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VisualizationKind::Function2d => "function_2d",
            VisualizationKind::Functions2d => "functions_2d",
            VisualizationKind::Function3d => "function_3d",
            VisualizationKind::Parametric3d => "parametric_3d",
            VisualizationKind::Histogram => "histogram",
            VisualizationKind::Scatter => "scatter",
            VisualizationKind::Boxplot => "boxplot",
            VisualizationKind::Violin => "violin",
            VisualizationKind::Bar => "bar",
            VisualizationKind::Heatmap => "heatmap",
            VisualizationKind::Pie => "pie",
            VisualizationKind::Contour => "contour",
            VisualizationKind::ComplexFunction => "complex_function",
            VisualizationKind::TimeSeries => "time_series",
            VisualizationKind::CorrelationMatrix => "correlation_matrix",
            VisualizationKind::SlopeField => "slope_field",
        }
    }
}

impl fmt::Display for VisualizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VisualizationKind {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        VisualizationKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| VizError::UnsupportedKind(wanted.to_string()))
    }
}

/// One chart request. Consumed by a single render call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualizationRequest {
    #[serde(rename = "visualization_type")]
    pub kind: VisualizationKind,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl VisualizationRequest {
    pub fn new(kind: VisualizationKind, parameters: Map<String, Value>) -> Self {
        Self { kind, parameters }
    }

    /// Build a request from an extracted object. Accepts `type` as a synonym
    /// for `visualization_type` and flat objects without a `parameters` key.
    pub fn from_extraction(mut found: Map<String, Value>) -> Result<Self> {
        let kind = found
            .remove("visualization_type")
            .or_else(|| found.remove("type"))
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| VizError::Extraction("no visualization_type in model output".into()))?
            .parse()?;
        let parameters = match found.remove("parameters") {
            Some(Value::Object(p)) => p,
            _ => found,
        };
        Ok(Self { kind, parameters })
    }
}

/// Outcome of one request. Exactly one of `file_path` and `base64_image` is set on success.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_type: Option<VisualizationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VisualizationResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Typed, forgiving access to request parameters.
#[derive(Clone, Copy, Debug)]
pub struct Params<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.str(key).unwrap_or(default).to_string()
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(number)
    }

    pub fn usize_or(&self, key: &str, default: usize) -> usize {
        self.f64(key)
            .filter(|v| *v >= 1.0)
            .map_or(default, |v| v as usize)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// `[min, max]` or `{"min":..,"max":..}`; reversed pairs are swapped.
    pub fn range(&self, key: &str) -> Option<AxisRange> {
        let (a, b) = match self.get(key)? {
            Value::Array(items) if items.len() == 2 => (number(&items[0])?, number(&items[1])?),
            Value::Object(o) => (number(o.get("min")?)?, number(o.get("max")?)?),
            _ => return None,
        };
        if a == b {
            return None;
        }
        Some(AxisRange::new(a.min(b), a.max(b)))
    }

    pub fn range_or(&self, key: &str, default: AxisRange) -> AxisRange {
        self.range(key).unwrap_or(default)
    }

    /// Numeric list; entries that are not numbers become `None`.
    pub fn numbers(&self, key: &str) -> Option<Vec<Option<f64>>> {
        match self.get(key)? {
            Value::Array(items) => Some(items.iter().map(number).collect()),
            _ => None,
        }
    }

    /// Numeric list with non-numbers dropped.
    pub fn finite_numbers(&self, key: &str) -> Option<Vec<f64>> {
        self.numbers(key)
            .map(|v| v.into_iter().flatten().filter(|x| x.is_finite()).collect())
    }

    /// List of numeric rows. A flat list is read as a single row.
    pub fn matrix(&self, key: &str) -> Option<Vec<Vec<f64>>> {
        let items = self.get(key)?.as_array()?;
        if items.iter().all(|v| !v.is_array()) {
            let row: Vec<f64> = items.iter().filter_map(number).collect();
            return (!row.is_empty()).then(|| vec![row]);
        }
        let rows: Vec<Vec<f64>> = items
            .iter()
            .filter_map(Value::as_array)
            .map(|row| row.iter().map(|v| number(v).unwrap_or(f64::NAN)).collect())
            .collect();
        (!rows.is_empty()).then_some(rows)
    }

    pub fn strings(&self, key: &str) -> Option<Vec<String>> {
        let items = self.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

/// Numbers, numeric strings and booleans all count as numbers. Strings may
/// also hold pi arithmetic such as `"-pi"` or `"pi/2"`.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim().trim_end_matches('%').trim();
            s.parse().ok().or_else(|| constant(s))
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

// Only pi arithmetic; dates like `2020-01-05` must not turn into subtractions.
fn constant(text: &str) -> Option<f64> {
    if !text.to_ascii_lowercase().contains("pi") && !text.contains('\u{03C0}') {
        return None;
    }
    let normalized = normalize_expression(text).ok()?;
    let value = CompiledExpr::from_text(&normalized, &[]).ok()?.eval(&[]);
    value.is_finite().then_some(value)
}
