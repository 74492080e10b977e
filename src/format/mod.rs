//! Formatting helpers that turn expression trees back into normalized text.

pub mod expr;

pub use expr::{pretty, show_rational, BACKEND_NAMESPACE};
