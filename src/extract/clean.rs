//! Repairs for almost-JSON emitted by language models.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::normalize::{prefix_functions, replace_pi, rewrite_carets};

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("valid regex"));
static PY_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([:\[,=]\s*)(None|True|False)\b").expect("valid regex"));
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));
static VALUES_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""values"\s*:\s*\[([^\[\]]*)\]"#).expect("valid regex"));
static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""?(-?\d+(?:\.\d+)?)\s*%"?"#).expect("valid regex"));
static PRODUCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d+(?:\.\d+)?(?:\s*[*/]\s*-?\d+(?:\.\d+)?)+").expect("valid regex")
});
static FACTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([*/]?)\s*(-?\d+(?:\.\d+)?)").expect("valid regex"));
static PIE_KIND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""visualization_type"\s*:\s*"pie""#).expect("valid regex"));

/// Apply every repair in order. Running it on its own output changes nothing.
pub fn clean_json(raw: &str) -> String {
    let text = strip_comments(raw);
    let text = text.replace('\'', "\"");
    let text = BARE_KEY.replace_all(&text, "$1\"$2\":").into_owned();
    let text = PY_LITERAL
        .replace_all(&text, |caps: &Captures| {
            let literal = match &caps[2] {
                "None" => "null",
                "True" => "true",
                _ => "false",
            };
            format!("{}{literal}", &caps[1])
        })
        .into_owned();
    let text = TRAILING_COMMA.replace_all(&text, "$1").into_owned();
    let text = map_segments(
        &text,
        |body| prefix_functions(&rewrite_carets(body)),
        |bare| fold_products(&replace_pi(bare)),
    );
    let text = rename_aliases(&text);
    let text = strip_percentages(&text);
    close_brackets(&text)
}

/// Remove `//` line comments and `/* */` block comments outside string literals.
pub fn strip_comments(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                    i += 1;
                }
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match (c, chars.get(i + 1)) {
            ('"' | '\'', _) => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

// `inside` sees the body of every string literal, `outside` the text between them.
// Math inside strings gets the same caret and function rewrite as expressions.
fn map_segments(
    input: &str,
    inside: impl Fn(&str) -> String,
    outside: impl Fn(&str) -> String,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('"') {
        out.push_str(&outside(&rest[..start]));
        out.push('"');
        let body = &rest[start + 1..];
        let Some(end) = string_end(body) else {
            out.push_str(body);
            return out;
        };
        out.push_str(&inside(&body[..end]));
        out.push('"');
        rest = &body[end + 1..];
    }
    out.push_str(&outside(rest));
    out
}

/// Bare constant arithmetic such as `2*3.14159` or `3.14159/2` becomes a single number.
fn fold_products(input: &str) -> String {
    PRODUCT
        .replace_all(input, |caps: &Captures| {
            let mut value = 1.0;
            for factor in FACTOR.captures_iter(&caps[0]) {
                let Ok(x) = factor[2].parse::<f64>() else {
                    return caps[0].to_string();
                };
                if &factor[1] == "/" {
                    value /= x;
                } else {
                    value *= x;
                }
            }
            if value.is_finite() {
                value.to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn string_end(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(idx),
            _ => {}
        }
    }
    None
}

fn rename_aliases(input: &str) -> String {
    let text = input.replace("\"function\":", "\"expression\":");
    if PIE_KIND.is_match(&text) && text.contains("\"sizes\":") && !text.contains("\"values\":") {
        return text.replace("\"sizes\":", "\"values\":");
    }
    text
}

/// `"values": [30%, 45%, "25%"]` becomes `"values": [30, 45, 25]`.
fn strip_percentages(input: &str) -> String {
    VALUES_ARRAY
        .replace_all(input, |caps: &Captures| {
            let body = &caps[1];
            if !body.contains('%') {
                return caps[0].to_string();
            }
            let numbers = PERCENT.replace_all(body, "$1");
            format!("\"values\": [{numbers}]")
        })
        .into_owned()
}

/// Close any brace, bracket or string left open, innermost first.
pub fn close_brackets(input: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in input.chars() {
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
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = input.trim_end().to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}
