//! Markdown rendering pipeline.
//!
//! The pipeline is pure: it accepts markdown input, produces deterministic
//! HTML output plus the heading records used for navigation, and surfaces
//! structured errors. Nothing here touches the filesystem or installs a
//! subscriber; the binary owns those concerns.

mod service;
mod toc;
mod types;

pub use service::{
    DEFAULT_ANCHOR_CLASS, DEFAULT_MAX_ELEMENTS, DEFAULT_MAX_INPUT_BYTES, DEFAULT_MAX_NESTING_DEPTH,
    MarkdownRenderService, RenderConfigError, RenderPipelineConfig, TocLevels,
    configure_render_service, render_service,
};
pub use toc::DEFAULT_TOC_TITLE;
pub use types::{HeadingRecord, RenderError, RenderOutput, RenderRequest, RenderService};
