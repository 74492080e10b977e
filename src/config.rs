//! Runtime settings, loadable from a JSON file.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};
use crate::solver::BranchPolicy;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "MATHVIZ_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizConfig {
    /// Directory for rendered files and the recovery record.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Write image files; when false results carry base64 instead.
    #[serde(default = "default_true")]
    pub persist: bool,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub branch: BranchPolicy,
    #[serde(default = "default_heatmap_seed")]
    pub heatmap_seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Samples per axis for each kind of grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_curve_samples")]
    pub curve: usize,
    #[serde(default = "default_surface_samples")]
    pub surface: usize,
    #[serde(default = "default_contour_samples")]
    pub contour: usize,
    #[serde(default = "default_complex_samples")]
    pub complex: usize,
    #[serde(default = "default_parametric_samples")]
    pub parametric: usize,
    /// Span multiplier for the single retry when a grid has no finite value.
    #[serde(default = "default_shrink_factor")]
    pub shrink_factor: f64,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("visualizations")
}
fn default_true() -> bool {
    true
}
fn default_heatmap_seed() -> u64 {
    42
}
fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_curve_samples() -> usize {
    100
}
fn default_surface_samples() -> usize {
    50
}
fn default_contour_samples() -> usize {
    100
}
fn default_complex_samples() -> usize {
    100
}
fn default_parametric_samples() -> usize {
    1000
}
fn default_shrink_factor() -> f64 {
    0.5
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            persist: true,
            canvas: CanvasConfig::default(),
            sampling: SamplingConfig::default(),
            branch: BranchPolicy::default(),
            heatmap_seed: default_heatmap_seed(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            curve: default_curve_samples(),
            surface: default_surface_samples(),
            contour: default_contour_samples(),
            complex: default_complex_samples(),
            parametric: default_parametric_samples(),
            shrink_factor: default_shrink_factor(),
        }
    }
}

impl VizConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: VizConfig = serde_json::from_str(&text)?;
        config.validate()?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from the file named by `MATHVIZ_CONFIG`, or use defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => {
                debug!("{CONFIG_ENV} not set, using default configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(VizError::Config("canvas size must be non-zero".into()));
        }
        let s = &self.sampling;
        if [s.curve, s.surface, s.contour, s.complex, s.parametric].contains(&0) {
            return Err(VizError::Config("sample counts must be positive".into()));
        }
        if !(s.shrink_factor > 0.0 && s.shrink_factor < 1.0) {
            return Err(VizError::Config(format!(
                "shrink_factor must lie in (0, 1), got {}",
                s.shrink_factor
            )));
        }
        Ok(())
    }
}
