//! Turns loosely formatted math and model output into evaluable expressions and
//! rendered charts.

pub mod charts;
pub mod config;
pub mod error;
pub mod eval;
pub mod expr;
pub mod extract;
pub mod format;
pub mod llm;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod prelude;
pub mod render;
pub mod request;
pub mod solver;
pub mod stats;
pub mod store;

pub use config::VizConfig;
pub use error::{Result, VizError};
pub use eval::{AxisRange, CompiledExpr, EvaluationGrid};
pub use expr::{Expr, Func, Rational, add, div, mul, neg, one, pow, rational, sub, zero};
pub use extract::{Extraction, extract_parameters};
pub use format::pretty;
pub use normalize::{normalize_expression, preprocess, preprocess_with};
pub use parser::parse_expr;
pub use pipeline::Visualizer;
pub use request::{VisualizationKind, VisualizationRequest, VisualizationResult};
pub use solver::{BranchPolicy, isolate};
