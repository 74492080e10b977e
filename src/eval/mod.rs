//! Numeric evaluation of parsed expressions over sample grids.

pub mod compile;
pub mod complex;
pub mod grid;

pub use compile::CompiledExpr;
pub use complex::{sample_complex, ComplexExpr, ComplexGrid};
pub use grid::{
    eval_point, sample_curve, sample_surface, AxisRange, EvaluationGrid, DEFAULT_RANGE_2D,
    DEFAULT_RANGE_3D,
};
