mod config;
mod headings;
mod highlight;
mod lower;
mod parse;
mod sanitize;
mod serialize;

use std::{num::NonZeroUsize, sync::Arc};

use comrak::{Arena, parse_document};
use once_cell::sync::OnceCell;
use syntect::html::ClassStyle;
use thiserror::Error;
use tracing::debug;

use crate::application::render::types::{
    HeadingRecord, RenderError, RenderOutput, RenderRequest, RenderService,
};
use crate::domain::{
    schema::{SanitizationSchema, SchemaError, SchemaOverride},
    tree::Document,
};

use self::config::default_options;
use self::highlight::CodeHighlighter;

pub use headings::TocLevels;
pub(crate) use serialize::serialize_element;

pub const DEFAULT_MAX_INPUT_BYTES: NonZeroUsize = NonZeroUsize::new(1024 * 1024).unwrap();
pub const DEFAULT_MAX_NESTING_DEPTH: NonZeroUsize = NonZeroUsize::new(128).unwrap();
pub const DEFAULT_MAX_ELEMENTS: NonZeroUsize = NonZeroUsize::new(200_000).unwrap();
pub const DEFAULT_ANCHOR_CLASS: &str = "heading-anchor";

/// Markdown rendering pipeline: comrak parsing, html5ever lowering, an
/// allow-list sanitizer, heading passes, and syntect highlighting.
pub struct MarkdownRenderService {
    options: comrak::Options<'static>,
    schema: SanitizationSchema,
    highlighter: CodeHighlighter,
    config: RenderPipelineConfig,
}

impl MarkdownRenderService {
    /// Build a renderer for `config`. Fails only when the schema overrides
    /// are rejected.
    pub fn new(config: RenderPipelineConfig) -> Result<Self, RenderConfigError> {
        let schema = SanitizationSchema::base().with_overrides(&config.schema_overrides)?;
        Ok(Self::from_parts(schema, config))
    }

    fn from_parts(schema: SanitizationSchema, config: RenderPipelineConfig) -> Self {
        let class_style = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
        Self {
            options: default_options(),
            schema,
            highlighter: CodeHighlighter::new(class_style),
            config,
        }
    }

    /// The effective allow-list, base schema merged with overrides.
    pub fn schema(&self) -> &SanitizationSchema {
        &self.schema
    }

    /// Render markdown while skipping the sanitisation stage. This is
    /// intended for diagnostics when refining sanitizer rules; the output is
    /// never safe to display.
    pub fn render_unsanitized(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let label = request.label();
        let Some(document) = self.lower_stage(&request.markdown)? else {
            return Ok(String::new());
        };
        let (document, _) = self.heading_stage(document);
        let document = self.highlighter.highlight(document, label);
        Ok(serialize::serialize(&document))
    }

    /// Parse and lower. `None` means the input had no content at all.
    fn lower_stage(&self, markdown: &str) -> Result<Option<Document>, RenderError> {
        parse::check_input_size(markdown, self.config.max_input_bytes.get())?;
        if markdown.trim().is_empty() {
            return Ok(None);
        }

        let max_depth = self.config.max_nesting_depth.get();
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        parse::check_ast_depth(root, max_depth)?;
        lower::lower(
            root,
            &self.options,
            max_depth,
            self.config.max_elements.get(),
        )
        .map(Some)
    }

    fn sanitize_stage(&self, document: Document, label: &str) -> Document {
        let (document, report) = sanitize::sanitize(document, &self.schema);
        if !report.is_clean() {
            debug!(
                target = "application::render::sanitize",
                document = label,
                unwrapped_elements = report.unwrapped_elements,
                dropped_subtrees = report.dropped_subtrees,
                dropped_attributes = report.dropped_attributes,
                "Sanitizer removed disallowed markup"
            );
        }
        document
    }

    fn heading_stage(&self, document: Document) -> (Document, Vec<HeadingRecord>) {
        let document = headings::assign_heading_ids(document);
        let records = headings::collect_headings(&document, self.config.toc_levels);
        let document = if self.config.autolink_heading_anchors {
            headings::inject_heading_anchors(document, &self.config.anchor_class)
        } else {
            document
        };
        (document, records)
    }
}

impl Default for MarkdownRenderService {
    fn default() -> Self {
        Self::from_parts(SanitizationSchema::base(), RenderPipelineConfig::default())
    }
}

impl RenderService for MarkdownRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let label = request.label();
        let Some(document) = self.lower_stage(&request.markdown)? else {
            return Ok(RenderOutput::empty());
        };

        let document = self.sanitize_stage(document, label);
        let (document, headings) = self.heading_stage(document);
        let document = self.highlighter.highlight(document, label);
        let html = serialize::serialize(&document);

        debug!(
            target = "application::render::service",
            document = label,
            bytes = html.len(),
            headings = headings.len(),
            "Rendered markdown"
        );

        Ok(RenderOutput { html, headings })
    }
}

/// Tunables for [`MarkdownRenderService`], usually derived from
/// [`crate::config::RenderSettings`].
#[derive(Debug, Clone)]
pub struct RenderPipelineConfig {
    pub max_input_bytes: NonZeroUsize,
    pub max_nesting_depth: NonZeroUsize,
    pub max_elements: NonZeroUsize,
    pub toc_levels: TocLevels,
    pub autolink_heading_anchors: bool,
    pub anchor_class: String,
    pub schema_overrides: Vec<SchemaOverride>,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_elements: DEFAULT_MAX_ELEMENTS,
            toc_levels: TocLevels::default(),
            autolink_heading_anchors: true,
            anchor_class: DEFAULT_ANCHOR_CLASS.to_string(),
            schema_overrides: Vec::new(),
        }
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            max_input_bytes: settings.max_input_bytes,
            max_nesting_depth: settings.max_nesting_depth,
            max_elements: settings.max_elements,
            toc_levels: settings.toc_levels,
            autolink_heading_anchors: settings.autolink_heading_anchors,
            anchor_class: settings.anchor_class.clone(),
            schema_overrides: settings.schema_overrides.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

static RENDER_SERVICE: OnceCell<Arc<MarkdownRenderService>> = OnceCell::new();

/// Install the process-wide renderer. Must run before the first call to
/// [`render_service`]; later calls fail with `AlreadyConfigured`.
pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    let service = MarkdownRenderService::new(config)?;
    RENDER_SERVICE
        .set(Arc::new(service))
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

/// Access the shared render service instance, initialised with defaults on
/// first use when nothing was configured.
pub fn render_service() -> Arc<MarkdownRenderService> {
    Arc::clone(RENDER_SERVICE.get_or_init(|| Arc::new(MarkdownRenderService::default())))
}
