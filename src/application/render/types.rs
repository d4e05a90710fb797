use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Source markdown, possibly mixed with raw HTML, captured from content storage.
    pub markdown: String,
    /// Optional label (usually the article slug) attached to log events.
    #[serde(default)]
    pub label: Option<String>,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.label = Some(label);
        }
        self
    }

    pub(crate) fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("-")
    }
}

/// Table-of-contents entry derived from a heading element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingRecord {
    /// Final `id` attribute of the heading in the rendered HTML.
    pub id: String,
    /// Flattened, trimmed heading text.
    pub text: String,
    /// Heading level, 1 through 6.
    pub level: u8,
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Sanitised HTML fragment, safe for unescaped insertion into a page body.
    pub html: String,
    /// Navigable headings in document order.
    pub headings: Vec<HeadingRecord>,
}

impl RenderOutput {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Structured errors surfaced by the rendering pipeline. Unknown markup is
/// never an error; only resource guards fail a render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("input is {size} bytes, exceeding the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },
    #[error("document nesting reached depth {depth}, exceeding the limit of {limit}")]
    NestingTooDeep { depth: usize, limit: usize },
    #[error("document would build at least {estimate} elements, exceeding the limit of {limit}")]
    TooManyElements { estimate: usize, limit: usize },
    #[error("html formatting failed: {message}")]
    Format { message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
