//! Cleanup of loosely formatted math text into a backend-ready expression.
//!
//! The rewrite is an ordered list of pure steps (see [`PIPELINE`]). Ordering
//! matters: Unicode superscripts become carets before carets become `**`, and
//! function prefixing must see the final operator spelling.

pub mod rules;

use log::{debug, info};

use crate::error::Result;
use crate::parser::parse_expr;
use crate::solver::{self, BranchPolicy};

pub use rules::{
    balance_parentheses, prefix_functions, replace_pi, replace_unicode, rewrite_carets,
    strip_assignment_prefix, PI_LITERAL,
};

/// A single normalization step.
pub type Step = fn(&str) -> String;

/// The rewrite steps in application order.
pub const PIPELINE: [(&str, Step); 6] = [
    ("strip_assignment_prefix", strip_assignment_prefix),
    ("replace_unicode", replace_unicode),
    ("rewrite_carets", rewrite_carets),
    ("prefix_functions", prefix_functions),
    ("replace_pi", replace_pi),
    ("balance_parentheses", balance_parentheses),
];

/// Run every rewrite step without validating the result.
pub fn rewrite(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    for (name, step) in PIPELINE {
        let next = step(&text);
        if next != text {
            debug!("{name}: `{text}` -> `{next}`");
            if name == "balance_parentheses" {
                info!("closed unbalanced parentheses in `{text}`");
            }
        }
        text = next;
    }
    text
}

/// Normalize a single expression and check that it parses.
pub fn normalize_expression(raw: &str) -> Result<String> {
    let text = rewrite(raw);
    parse_expr(&text)?;
    Ok(text)
}

/// Normalize an expression or equation and return an explicit expression for `dependent`.
pub fn preprocess(raw: &str, dependent: &str) -> Result<String> {
    preprocess_with(raw, dependent, BranchPolicy::default())
}

/// Like [`preprocess`] with an explicit square-root branch policy.
pub fn preprocess_with(raw: &str, dependent: &str, policy: BranchPolicy) -> Result<String> {
    let text = rewrite(raw);
    let explicit = if text.contains('=') {
        info!("treating `{text}` as an equation in `{dependent}`");
        let solved = solver::isolate(&text, dependent, policy)?;
        info!("reformulated `{text}` as `{dependent} = {solved}`");
        solved
    } else {
        text
    };
    parse_expr(&explicit)?;
    Ok(explicit)
}
