use approx::assert_relative_eq;
use mathviz::extract::{clean_json, close_brackets, extract_parameters, strip_comments};
use mathviz::request::Params;
use mathviz::{VisualizationKind, VisualizationRequest};
use serde_json::{json, Value};

fn extracted(text: &str) -> Value {
    Value::Object(extract_parameters(text))
}

#[test]
fn fenced_block_is_parsed() {
    let text = "```json\n{\"visualization_type\": \"pie\", \"parameters\": {\"values\": [30,40,30]}}\n```";
    assert_eq!(
        extracted(text),
        json!({"visualization_type": "pie", "parameters": {"values": [30, 40, 30]}})
    );
}

#[test]
fn garbage_yields_an_empty_map() {
    assert!(extract_parameters("I could not think of a chart for that, sorry.").is_empty());
    assert!(extract_parameters("").is_empty());
    assert!(extract_parameters("{{{{").is_empty());
}

#[test]
fn python_flavoured_objects_are_repaired() {
    let text = "Sure! {visualization_type: 'histogram', parameters: {data: [1, 2, None], normed: True,},} Enjoy.";
    assert_eq!(
        extracted(text),
        json!({
            "visualization_type": "histogram",
            "parameters": {"data": [1, 2, null], "normed": true}
        })
    );
}

#[test]
fn truncated_output_is_closed() {
    let text = "```json\n{\"visualization_type\": \"bar\", \"parameters\": {\"values\": [1, 2, 3]\n```";
    assert_eq!(
        extracted(text),
        json!({"visualization_type": "bar", "parameters": {"values": [1, 2, 3]}})
    );
}

#[test]
fn anchored_key_recovers_the_right_object() {
    let text = "{not json at all, just prose in braces} then {\"visualization_type\": \"scatter\"}";
    assert_eq!(extracted(text), json!({"visualization_type": "scatter"}));
}

#[test]
fn aliases_are_renamed() {
    let pie = extracted(r#"{"visualization_type": "pie", "parameters": {"sizes": [1, 2]}}"#);
    assert_eq!(pie["parameters"]["values"], json!([1, 2]));

    let bar = extracted(r#"{"visualization_type": "bar", "parameters": {"sizes": [1, 2]}}"#);
    assert_eq!(bar["parameters"]["sizes"], json!([1, 2]));

    let curve = extracted(r#"{"visualization_type": "function_2d", "parameters": {"function": "x^2"}}"#);
    assert_eq!(curve["parameters"]["expression"], json!("x**2"));
}

#[test]
fn percentages_keep_their_magnitude() {
    let pie = extracted(r#"{"visualization_type": "pie", "parameters": {"values": [30%, 45%, "25%"]}}"#);
    assert_eq!(pie["parameters"]["values"], json!([30, 45, 25]));
}

#[test]
fn implicit_surfaces_are_flagged() {
    let found = extracted(
        r#"{"visualization_type": "function_3d", "parameters": {"expression": "z^2 = x^2 + y^2"}}"#,
    );
    assert_eq!(found["parameters"]["is_implicit"], json!(true));
    assert_eq!(found["parameters"]["expression"], json!("z**2 = x**2 + y**2"));

    let explicit = extracted(
        r#"{"visualization_type": "function_3d", "parameters": {"expression": "x^2 + y^2"}}"#,
    );
    assert!(explicit["parameters"].get("is_implicit").is_none());
}

#[test]
fn comments_are_removed_outside_strings() {
    let text = "{\"url\": \"http://example.com\"} // trailing note";
    assert_eq!(strip_comments(text).trim_end(), "{\"url\": \"http://example.com\"}");
    assert_eq!(strip_comments("[1, /* two */ 3]"), "[1,  3]");
}

#[test]
fn open_brackets_close_innermost_first() {
    assert_eq!(close_brackets("{\"a\": [1, 2"), "{\"a\": [1, 2]}");
    assert_eq!(close_brackets("{\"a\": \"unterminated"), "{\"a\": \"unterminated\"}");
    assert_eq!(close_brackets("{\"a\": 1}"), "{\"a\": 1}");
}

#[test]
fn cleaning_is_stable() {
    let raw = "{visualization_type: 'pie', parameters: {values: [1, 2,], labels: ['a', 'b']}";
    let once = clean_json(raw);
    assert_eq!(clean_json(&once), once);
    assert!(serde_json::from_str::<Value>(&once).is_ok());
}

#[test]
fn extraction_feeds_requests() {
    let found = extract_parameters(r#"{"type": "histogram", "data": [1, 2, 3], "bins": 3}"#);
    let request = VisualizationRequest::from_extraction(found).expect("request");
    assert_eq!(request.kind, VisualizationKind::Histogram);
    assert_eq!(request.parameters["bins"], json!(3));

    let unknown = extract_parameters(r#"{"visualization_type": "sankey"}"#);
    assert!(VisualizationRequest::from_extraction(unknown).is_err());
}

#[test]
fn bare_pi_in_ranges_is_recovered() {
    let found = extracted(
        r#"{"visualization_type": "function_2d", "parameters": {"expression": "sin(x)", "x_range": [-pi, pi]}}"#,
    );
    assert_eq!(found["visualization_type"], json!("function_2d"));
    assert_eq!(found["parameters"]["expression"], json!("np.sin(x)"));
    let range = found["parameters"]["x_range"].as_array().expect("range array");
    assert_relative_eq!(range[0].as_f64().expect("min"), -3.14159, epsilon = 1e-12);
    assert_relative_eq!(range[1].as_f64().expect("max"), 3.14159, epsilon = 1e-12);

    let wide = extracted(r#"{"visualization_type": "function_2d", "parameters": {"x_range": [-2*pi, π/2], "note": "pi"}}"#);
    let range = wide["parameters"]["x_range"].as_array().expect("range array");
    assert_relative_eq!(range[0].as_f64().expect("min"), -6.28318, epsilon = 1e-12);
    assert_relative_eq!(range[1].as_f64().expect("max"), 1.570795, epsilon = 1e-12);
    assert_eq!(wide["parameters"]["note"], json!("pi"));
}

#[test]
fn quoted_pi_bounds_read_as_numbers() {
    let map = serde_json::Map::from_iter([(
        "x_range".to_string(),
        json!(["-pi", "2*pi"]),
    )]);
    let range = Params::new(&map).range("x_range").expect("range");
    assert_relative_eq!(range.min, -3.14159, epsilon = 1e-12);
    assert_relative_eq!(range.max, 6.28318, epsilon = 1e-12);
    let dates = serde_json::Map::from_iter([("x_range".to_string(), json!(["2020-01-05", "2021"]))]);
    assert!(Params::new(&dates).range("x_range").is_none());
}
