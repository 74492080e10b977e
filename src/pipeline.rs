//! Request orchestration: dispatch, render, persist, record.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use log::{error, info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::charts;
use crate::config::VizConfig;
use crate::error::{Result, VizError};
use crate::extract::extract_parameters;
use crate::llm::LanguageModel;
use crate::render::{Renderer, SvgRenderer};
use crate::request::{Params, VisualizationKind, VisualizationRequest, VisualizationResult};
use crate::store::{FileRecoveryStore, RecoveryRecord, RecoveryStore};

/// Owns the configuration, the renderer and the recovery slot. Every public
/// entry point returns a [`VisualizationResult`]; errors never escape.
pub struct Visualizer<R, S> {
    config: VizConfig,
    renderer: R,
    store: S,
}

impl Visualizer<SvgRenderer, FileRecoveryStore> {
    /// SVG output sized from the config, recovery record kept under `storage_dir`.
    pub fn from_config(config: VizConfig) -> Self {
        let renderer = SvgRenderer::new(config.canvas.width, config.canvas.height);
        let store = FileRecoveryStore::new(&config.storage_dir);
        Self::new(config, renderer, store)
    }
}

impl<R: Renderer, S: RecoveryStore> Visualizer<R, S> {
    pub fn new(config: VizConfig, renderer: R, store: S) -> Self {
        Self {
            config,
            renderer,
            store,
        }
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn latest(&self) -> Option<RecoveryRecord> {
        self.store.get()
    }

    pub fn render(&self, request: &VisualizationRequest) -> VisualizationResult {
        match self.try_render(request) {
            Ok(result) => result,
            Err(e) => {
                error!("{} visualization failed: {e}", request.kind);
                VisualizationResult::failure(format!("Error in {} visualization: {e}", request.kind))
            }
        }
    }

    /// Render from a kind name and raw parameters, rejecting unknown kinds up front.
    pub fn render_json(&self, kind: &str, parameters: Map<String, Value>) -> VisualizationResult {
        match kind.parse::<VisualizationKind>() {
            Ok(kind) => self.render(&VisualizationRequest::new(kind, parameters)),
            Err(e) => {
                warn!("rejected request: {e}");
                VisualizationResult::failure(e.to_string())
            }
        }
    }

    /// Ask `model` for a chart description, recover it from the reply and render it.
    pub fn handle_prompt(&self, model: &impl LanguageModel, prompt: &str) -> VisualizationResult {
        let completion = model.generate(prompt);
        if !completion.success {
            return VisualizationResult::failure("language model request failed");
        }
        let found = extract_parameters(&completion.response);
        if found.is_empty() {
            let e = VizError::Extraction("no structured data in model response".into());
            warn!("{e}");
            return VisualizationResult::failure(e.to_string());
        }
        match VisualizationRequest::from_extraction(found) {
            Ok(request) => self.render(&request),
            Err(e) => {
                warn!("{e}");
                VisualizationResult::failure(e.to_string())
            }
        }
    }

    fn try_render(&self, request: &VisualizationRequest) -> Result<VisualizationResult> {
        let kind = request.kind;
        let params = Params::new(&request.parameters);
        let chart = charts::build(kind, &params, &self.config)?;
        let bytes = self.renderer.render(&chart.figure)?;

        let mut result = VisualizationResult {
            success: true,
            plot_type: Some(kind),
            data: Some(chart.data),
            ..VisualizationResult::default()
        };
        if self.config.persist && params.bool_or("save", true) {
            let path = self.output_path(kind, params.str("filename"));
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(&path, &bytes)?;
            info!("saved {kind} visualization to {}", path.display());
            result.file_path = Some(path.display().to_string());
        } else {
            result.base64_image = Some(STANDARD.encode(&bytes));
        }

        self.store.set(RecoveryRecord {
            kind,
            timestamp: Utc::now().to_rfc3339(),
            file_path: result.file_path.clone(),
        });
        Ok(result)
    }

    fn output_path(&self, kind: VisualizationKind, filename: Option<&str>) -> PathBuf {
        let ext = self.renderer.extension();
        // Only the final component of a caller-supplied name is used.
        let requested = filename
            .and_then(|name| Path::new(name.trim()).file_name())
            .map(PathBuf::from);
        let name = match requested {
            Some(name) if name.extension().is_some() => name,
            Some(name) => name.with_extension(ext),
            None => {
                let id = Uuid::new_v4().simple().to_string();
                PathBuf::from(format!(
                    "{kind}_{}_{}.{ext}",
                    Utc::now().format("%Y%m%d_%H%M%S"),
                    &id[..8]
                ))
            }
        };
        self.config.storage_dir.join(name)
    }
}
