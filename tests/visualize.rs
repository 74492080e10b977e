use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use mathviz::charts::{default_heatmap, pie_slices, DEFAULT_PIE_VALUES};
use mathviz::llm::Completion;
use mathviz::render::{Figure, Renderer, SvgRenderer};
use mathviz::store::{FileRecoveryStore, MemoryRecoveryStore, RecoveryRecord, RecoveryStore};
use mathviz::{Result, VisualizationKind, VisualizationResult, Visualizer, VizConfig};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct StubRenderer {
    calls: Arc<AtomicUsize>,
}

impl Renderer for StubRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, _figure: &Figure) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(b"figure".to_vec())
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn config_in(dir: &TempDir) -> VizConfig {
    VizConfig {
        storage_dir: dir.path().to_path_buf(),
        ..VizConfig::default()
    }
}

fn stub_visualizer(dir: &TempDir) -> (Visualizer<StubRenderer, MemoryRecoveryStore>, Arc<AtomicUsize>) {
    let renderer = StubRenderer::default();
    let calls = renderer.calls.clone();
    (
        Visualizer::new(config_in(dir), renderer, MemoryRecoveryStore::new()),
        calls,
    )
}

fn data_f64(result: &VisualizationResult, key: &str) -> f64 {
    result.data.as_ref().and_then(|d| d[key].as_f64()).expect(key)
}

#[test]
fn pie_with_null_values_uses_the_default_split() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, _) = stub_visualizer(&dir);
    let result = viz.render_json("pie", params(json!({"values": [null, null, null], "save": false})));
    assert!(result.success, "{:?}", result.error);
    let data = result.data.expect("data");
    assert_eq!(data["values"], json!(DEFAULT_PIE_VALUES.to_vec()));
    assert_eq!(data["labels"], json!(["Category 1", "Category 2", "Category 3"]));
    assert!(result.base64_image.is_some());
    assert!(result.file_path.is_none());
}

#[test]
fn pie_slices_degrade_to_defaults() {
    let (values, labels) = pie_slices(Some(vec![Some(-1.0), Some(3.0)]), Some(vec!["only".into()]));
    assert_eq!(values, vec![1.0, 3.0]);
    assert_eq!(labels, vec!["Category 1", "Category 2"]);

    let (values, _) = pie_slices(Some(vec![Some(0.0), None]), None);
    assert_eq!(values, DEFAULT_PIE_VALUES.to_vec());

    let (values, labels) = pie_slices(None, Some(vec!["a".into(), "b".into(), "c".into()]));
    assert_eq!(values, DEFAULT_PIE_VALUES.to_vec());
    assert_eq!(labels, vec!["a", "b", "c"]);
}

#[test]
fn empty_heatmap_uses_the_seeded_matrix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, _) = stub_visualizer(&dir);
    let result = viz.render_json("heatmap", params(json!({"data": [], "save": false})));
    assert!(result.success, "{:?}", result.error);

    let matrix = default_heatmap(42);
    assert_eq!(matrix, default_heatmap(42));
    assert_eq!(matrix.len(), 5);
    assert!(matrix.iter().all(|row| row.len() == 5));
    let flat: Vec<f64> = matrix.into_iter().flatten().collect();
    assert!(flat.iter().all(|v| (0.0..1.0).contains(v)));

    let min = flat.iter().copied().fold(f64::INFINITY, f64::min);
    let max = flat.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = flat.iter().sum::<f64>() / flat.len() as f64;
    assert_relative_eq!(data_f64(&result, "min_value"), min);
    assert_relative_eq!(data_f64(&result, "max_value"), max);
    assert_relative_eq!(data_f64(&result, "mean_value"), mean, epsilon = 1e-12);
}

#[test]
fn heatmap_accepts_flat_values_with_axes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, _) = stub_visualizer(&dir);
    let result = viz.render_json(
        "heatmap",
        params(json!({
            "x_data": ["a", "b", "c"],
            "y_data": ["r1", "r2"],
            "values": [1, 2, 3, 4, 5, 6],
            "save": false
        })),
    );
    assert!(result.success, "{:?}", result.error);
    let data = result.data.expect("data");
    assert_eq!(data["shape"], json!([2, 3]));
    assert_eq!(data["x_labels"], json!(["a", "b", "c"]));
    assert_eq!(data["y_labels"], json!(["r1", "r2"]));
    assert_eq!(data["max_value"], json!(6.0));
}

#[test]
fn unknown_kinds_are_rejected_before_rendering() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, calls) = stub_visualizer(&dir);
    let result = viz.render_json("sankey", Map::new());
    assert!(!result.success);
    assert!(result.error.expect("error").contains("sankey"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(viz.latest().is_none());
}

#[test]
fn files_are_written_and_recorded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let viz = Visualizer::new(
        config_in(&dir),
        SvgRenderer::new(400, 300),
        MemoryRecoveryStore::new(),
    );
    let result = viz.render_json("function_2d", params(json!({"expression": "y = sin(x)^2"})));
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.plot_type, Some(VisualizationKind::Function2d));
    assert!(result.base64_image.is_none());

    let path = result.file_path.clone().expect("file path");
    assert!(path.ends_with(".svg"));
    let name = std::path::Path::new(&path).file_name().and_then(|n| n.to_str()).expect("name");
    assert!(name.starts_with("function_2d_"));
    let svg = fs::read_to_string(&path).expect("read svg");
    assert!(svg.contains("<svg"));

    let latest = viz.latest().expect("recovery record");
    assert_eq!(latest.kind, VisualizationKind::Function2d);
    assert_eq!(latest.file_path.as_deref(), Some(path.as_str()));
    assert!(chrono::DateTime::parse_from_rfc3339(&latest.timestamp).is_ok());
    assert_eq!(result.data.expect("data")["expression"], json!("np.sin(x)**2"));
}

#[test]
fn requested_filenames_stay_in_the_storage_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, _) = stub_visualizer(&dir);
    let result = viz.render_json("bar", params(json!({"values": [1, 2], "filename": "my_bars"})));
    assert_eq!(result.file_path, Some(dir.path().join("my_bars.txt").display().to_string()));

    let result = viz.render_json("bar", params(json!({"values": [1, 2], "filename": "../escape.png"})));
    assert_eq!(result.file_path, Some(dir.path().join("escape.png").display().to_string()));
}

#[test]
fn disabled_persistence_returns_base64() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = VizConfig {
        persist: false,
        ..config_in(&dir)
    };
    let viz = Visualizer::new(config, StubRenderer::default(), MemoryRecoveryStore::new());
    let result = viz.render_json("bar", params(json!({"values": [1, 2]})));
    assert_eq!(result.base64_image.as_deref(), Some("ZmlndXJl"));
    assert!(result.file_path.is_none());
    assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[test]
fn implicit_surface_renders_the_upper_sheet() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, _) = stub_visualizer(&dir);
    let result = viz.render_json(
        "function_3d",
        params(json!({"expression": "z^2-x^2-y^2=-4", "is_implicit": true, "save": false})),
    );
    assert!(result.success, "{:?}", result.error);
    let data = result.data.clone().expect("data");
    assert_eq!(data["expression"], json!("np.sqrt(np.abs(x**2+y**2-4))"));
    assert_eq!(data["is_implicit"], json!(true));
    assert!(data_f64(&result, "z_min") >= 0.0);
}

#[test]
fn failures_become_structured_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, calls) = stub_visualizer(&dir);
    let cases = vec![
        ("function_2d", json!({}), "missing required parameter: expression"),
        ("function_3d", json!({"expression": "z^3 = x"}), "cannot isolate"),
        ("function_2d", json!({"expression": "np.sqrt(-1-x^2)"}), "domain error"),
        ("function_2d", json!({"expression": "x +* 2"}), "parse error"),
        ("bar", json!({"labels": ["a"]}), "missing required parameter: values"),
        ("boxplot", json!({"data": "lots"}), "missing required parameter: data"),
    ];
    for (kind, raw, expected) in cases {
        let result = viz.render_json(kind, params(raw));
        assert!(!result.success, "{kind} should fail");
        let error = result.error.expect("error message");
        assert!(error.contains(expected), "{kind}: `{error}` lacks `{expected}`");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn every_kind_renders_to_svg() {
    let dir = tempfile::tempdir().expect("tempdir");
    let viz = Visualizer::new(config_in(&dir), SvgRenderer::default(), MemoryRecoveryStore::new());
    let requests = vec![
        (VisualizationKind::Function2d, json!({"expression": "tan(x)"})),
        (VisualizationKind::Functions2d, json!({"expressions": ["sin(x)", "cos(x)"], "labels": ["s", "c"]})),
        (VisualizationKind::Function3d, json!({"expression": "x^2 - y^2", "num_points": 15})),
        (
            VisualizationKind::Parametric3d,
            json!({"x_expression": "cos(t)", "y_expression": "sin(t)", "z_expression": "t/(2pi)"}),
        ),
        (VisualizationKind::Histogram, json!({"data": [1, 2, 2, 3, 3, 3], "bins": 3})),
        (VisualizationKind::Scatter, json!({"x_data": [1, 2, 3, 4], "y_data": [2, 4, 5, 8]})),
        (VisualizationKind::Boxplot, json!({"data": [[1, 2, 3, 4, 10], [2, 3, 4]]})),
        (VisualizationKind::Violin, json!({"data": [1, 2, 2, 3, 4, 4, 5]})),
        (VisualizationKind::Bar, json!({"values": [3, -5, 2], "horizontal": true})),
        (VisualizationKind::Heatmap, json!({"data": [[1, 2], [3, 4]], "cmap": "coolwarm"})),
        (VisualizationKind::Pie, json!({"values": [1, 2, 3], "startangle": 90})),
        (VisualizationKind::Contour, json!({"expression": "x^2 - y^2", "num_points": 30, "levels": 5})),
        (VisualizationKind::ComplexFunction, json!({"expression": "f(z) = z^2 + 2i", "num_points": 30})),
        (VisualizationKind::TimeSeries, json!({"data": [[1, 3, 2, 5], [2, 2, 3, 1]]})),
        (VisualizationKind::CorrelationMatrix, json!({"data": [[1, 2], [2, 4], [3, 7]]})),
        (VisualizationKind::SlopeField, json!({"expression": "dy/dx = x - y", "solutions": [0, 1]})),
    ];
    assert_eq!(requests.len(), VisualizationKind::ALL.len());
    for (kind, raw) in requests {
        let mut parameters = params(raw);
        parameters.insert("save".into(), json!(false));
        let result = viz.render_json(kind.name(), parameters);
        assert!(result.success, "{kind} failed: {:?}", result.error);
        assert_eq!(result.plot_type, Some(kind));
        assert!(result.base64_image.as_deref().is_some_and(|b| !b.is_empty()));
    }
}

#[test]
fn chart_summaries_report_statistics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, _) = stub_visualizer(&dir);

    let scatter = viz.render_json("scatter", params(json!({"x_data": [0, 1, 2, 3], "y_data": [1, 3, 5, 7]})));
    let data = scatter.data.expect("scatter data");
    assert_relative_eq!(data["regression"]["slope"].as_f64().expect("slope"), 2.0);
    assert_relative_eq!(data["correlation"].as_f64().expect("r"), 1.0, epsilon = 1e-12);

    let histogram = viz.render_json("histogram", params(json!({"data": []})));
    let data = histogram.data.expect("histogram data");
    assert_eq!(data["statistics"]["count"], json!(100));
    assert_eq!(data["counts"].as_array().map(Vec::len), Some(10));

    let boxes = viz.render_json("boxplot", params(json!({"data": [[1, 2, 3, 4], [10, 20]]})));
    let data = boxes.data.expect("boxplot data");
    assert_eq!(data["statistics"][0]["median"], json!(2.5));
    assert_eq!(data["statistics"][1]["count"], json!(2));

    let identity = json!([[1.0, 0.5], [0.5, 1.0]]);
    let corr = viz.render_json("correlation_matrix", params(json!({"data": identity.clone()})));
    let data = corr.data.expect("correlation data");
    assert_eq!(data["correlation_matrix"], identity);
    assert_eq!(data["variables"], json!(["Var 1", "Var 2"]));
}

#[test]
fn prompts_flow_through_the_model() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (viz, _) = stub_visualizer(&dir);

    let model = |_: &str| {
        Completion::ok("Here you go:\n```json\n{\"visualization_type\": \"pie\", \"parameters\": {\"values\": [30,40,30], \"save\": false}}\n```")
    };
    let result = viz.handle_prompt(&model, "show me a pie");
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.plot_type, Some(VisualizationKind::Pie));

    let chatty = |_: &str| Completion::ok("I would rather not draw anything.");
    let result = viz.handle_prompt(&chatty, "show me a pie");
    assert!(!result.success);
    assert!(result.error.expect("error").contains("extraction failed"));

    let broken = |_: &str| Completion::default();
    assert!(!viz.handle_prompt(&broken, "anything").success);
}

#[test]
fn failure_results_serialize_without_empty_fields() {
    let failure = VisualizationResult::failure("boom");
    assert_eq!(
        serde_json::to_value(&failure).expect("serialize"),
        json!({"success": false, "error": "boom"})
    );
}

#[test]
fn recovery_records_survive_in_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let record = RecoveryRecord {
        kind: VisualizationKind::Heatmap,
        timestamp: "2024-01-01T00:00:00+00:00".into(),
        file_path: Some("heatmap.svg".into()),
    };
    let store = FileRecoveryStore::new(dir.path());
    assert!(store.get().is_none());
    store.set(record.clone());
    assert!(store.path().exists());

    let reopened = FileRecoveryStore::new(dir.path());
    assert_eq!(reopened.get(), Some(record));
}

#[test]
fn memory_store_keeps_the_last_write() {
    let store = MemoryRecoveryStore::new();
    for kind in [VisualizationKind::Bar, VisualizationKind::Pie] {
        store.set(RecoveryRecord {
            kind,
            timestamp: "2024-01-01T00:00:00+00:00".into(),
            file_path: None,
        });
    }
    assert_eq!(store.get().map(|r| r.kind), Some(VisualizationKind::Pie));
}
