use thiserror::Error;

pub type Result<T> = std::result::Result<T, VizError>;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("parse error in `{input}`: {message}")]
    Parse { input: String, message: String },
    #[error("cannot isolate `{variable}` in `{equation}`")]
    UnsolvableEquation { equation: String, variable: String },
    #[error("domain error: {0}")]
    Domain(String),
    #[error("unsupported visualization type: {0}")]
    UnsupportedKind(String),
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl VizError {
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        VizError::Parse {
            input: input.into(),
            message: message.into(),
        }
    }
}
