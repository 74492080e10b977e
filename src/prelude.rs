//! The types most callers need, for glob import.

pub use crate::config::VizConfig;
pub use crate::error::{Result, VizError};
pub use crate::extract::extract_parameters;
pub use crate::llm::{Completion, LanguageModel};
pub use crate::normalize::{normalize_expression, preprocess};
pub use crate::pipeline::Visualizer;
pub use crate::render::{Renderer, SvgRenderer};
pub use crate::request::{VisualizationKind, VisualizationRequest, VisualizationResult};
pub use crate::store::{FileRecoveryStore, MemoryRecoveryStore, RecoveryRecord, RecoveryStore};
