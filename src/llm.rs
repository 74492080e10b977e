//! The language-model collaborator.

use serde::{Deserialize, Serialize};

/// Raw completion returned by a model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub success: bool,
    #[serde(default)]
    pub response: String,
}

impl Completion {
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: response.into(),
        }
    }
}

/// Anything that can complete a prompt. Its output is always treated as untrusted text.
pub trait LanguageModel {
    fn generate(&self, prompt: &str) -> Completion;
}

impl<F> LanguageModel for F
where
    F: Fn(&str) -> Completion,
{
    fn generate(&self, prompt: &str) -> Completion {
        self(prompt)
    }
}
