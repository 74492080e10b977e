//! Recovery of `{visualization_type, parameters}` objects from free-form model output.
//!
//! Strategies run in order and the first object that parses wins. Nothing in
//! this module returns an error: total failure is an empty map.

pub mod clean;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub use clean::{clean_json, close_brackets, strip_comments};

pub type Extraction = Map<String, Value>;

static FENCED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("valid regex"));
static KIND_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']visualization_type["']"#).expect("valid regex"));
static IMPLICIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[zZ]\s*(?:\^|\*\*)\s*2[^=]*=|=.*[zZ]\s*(?:\^|\*\*)\s*2").expect("valid regex"));

/// Named extraction strategies, tried in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    FencedBlock,
    LongestObject,
    AnchoredKey,
}

impl Strategy {
    pub const ORDER: [Strategy; 3] = [
        Strategy::FencedBlock,
        Strategy::LongestObject,
        Strategy::AnchoredKey,
    ];

    fn candidates(self, text: &str) -> Vec<String> {
        match self {
            Strategy::FencedBlock => FENCED
                .captures_iter(text)
                .map(|caps| caps[1].to_string())
                .collect(),
            Strategy::LongestObject => brace_objects(text)
                .into_iter()
                .max_by_key(|s| s.len())
                .map(str::to_string)
                .into_iter()
                .collect(),
            Strategy::AnchoredKey => anchored_object(text).into_iter().collect(),
        }
    }
}

/// Parse the first recoverable object out of `text`, or return an empty map.
pub fn extract_parameters(text: &str) -> Extraction {
    for strategy in Strategy::ORDER {
        for candidate in strategy.candidates(text) {
            if let Some(mut found) = parse_candidate(&candidate) {
                debug!("extracted parameters with {strategy:?}");
                mark_implicit(&mut found);
                return found;
            }
        }
        debug!("{strategy:?} found nothing parseable");
    }
    warn!("all extraction strategies failed");
    Map::new()
}

fn parse_candidate(candidate: &str) -> Option<Extraction> {
    let cleaned = clean_json(candidate);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!("candidate rejected after cleanup: {e}");
            None
        }
    }
}

/// Every top-level `{...}` span. An object left open runs to the end of the text.
fn brace_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=idx]);
                }
            }
            _ => {}
        }
    }
    if depth > 0 {
        spans.push(&text[start..]);
    }
    spans
}

/// The object enclosing the first `"visualization_type"` key.
fn anchored_object(text: &str) -> Option<String> {
    let key = KIND_KEY.find(text)?;
    let open = text[..key.start()].rfind('{')?;
    brace_objects(&text[open..])
        .first()
        .map(|s| s.to_string())
}

// Flags `z^2 ... = ...` expressions so callers know an equation is coming.
fn mark_implicit(found: &mut Extraction) {
    let nested = matches!(found.get("parameters"), Some(Value::Object(_)));
    let params = if nested {
        match found.get_mut("parameters") {
            Some(Value::Object(p)) => p,
            _ => return,
        }
    } else {
        found
    };
    let implicit = params
        .get("expression")
        .and_then(Value::as_str)
        .is_some_and(|e| e.contains('=') && IMPLICIT.is_match(e));
    if implicit {
        params.insert("is_implicit".to_string(), Value::Bool(true));
    }
}
