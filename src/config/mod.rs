//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, str::FromStr};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::render::{
    DEFAULT_ANCHOR_CLASS, DEFAULT_MAX_ELEMENTS, DEFAULT_MAX_INPUT_BYTES, DEFAULT_MAX_NESTING_DEPTH,
    TocLevels,
};
use crate::domain::schema::{SanitizationSchema, SchemaOverride};

pub use cli::{
    CliArgs, Command, LoggingOverrides, OutputFormat, RenderArgs, RenderOverrides, SchemaArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "inkpress";
const ENV_PREFIX: &str = "INKPRESS";
/// Upper bound for `render.max_nesting_depth`; every tree pass recurses at
/// most this deep.
const MAX_NESTING_DEPTH_CEILING: usize = 1024;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub max_input_bytes: NonZeroUsize,
    pub max_nesting_depth: NonZeroUsize,
    pub max_elements: NonZeroUsize,
    pub toc_levels: TocLevels,
    pub autolink_heading_anchors: bool,
    pub anchor_class: String,
    pub schema_overrides: Vec<SchemaOverride>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Render(args) => raw.apply_render_overrides(&args.overrides),
        Command::Schema(args) => raw.apply_logging_overrides(&args.logging),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    render: RawRenderSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    max_input_bytes: Option<u64>,
    max_nesting_depth: Option<u64>,
    max_elements: Option<u64>,
    toc_min_level: Option<u8>,
    toc_max_level: Option<u8>,
    autolink_heading_anchors: Option<bool>,
    anchor_class: Option<String>,
    schema_overrides: Option<Vec<SchemaOverride>>,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        self.apply_logging_overrides(&overrides.logging);

        if let Some(bytes) = overrides.max_input_bytes {
            self.render.max_input_bytes = Some(bytes);
        }
        if let Some(depth) = overrides.max_nesting_depth {
            self.render.max_nesting_depth = Some(depth);
        }
        if let Some(elements) = overrides.max_elements {
            self.render.max_elements = Some(elements);
        }
        if let Some(level) = overrides.toc_min_level {
            self.render.toc_min_level = Some(level);
        }
        if let Some(level) = overrides.toc_max_level {
            self.render.toc_max_level = Some(level);
        }
        if overrides.no_heading_anchors {
            self.render.autolink_heading_anchors = Some(false);
        }
        if let Some(class) = overrides.anchor_class.as_ref() {
            self.render.anchor_class = Some(class.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings { logging, render } = raw;

        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;

        Ok(Self { logging, render })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let max_input_bytes = match render.max_input_bytes {
        Some(value) => non_zero_usize(value, "render.max_input_bytes")?,
        None => DEFAULT_MAX_INPUT_BYTES,
    };

    let max_nesting_depth = match render.max_nesting_depth {
        Some(value) => non_zero_usize(value, "render.max_nesting_depth")?,
        None => DEFAULT_MAX_NESTING_DEPTH,
    };
    if max_nesting_depth.get() > MAX_NESTING_DEPTH_CEILING {
        return Err(LoadError::invalid(
            "render.max_nesting_depth",
            format!("must not exceed {MAX_NESTING_DEPTH_CEILING}"),
        ));
    }

    let max_elements = match render.max_elements {
        Some(value) => non_zero_usize(value, "render.max_elements")?,
        None => DEFAULT_MAX_ELEMENTS,
    };

    let defaults = TocLevels::default();
    let min = render.toc_min_level.unwrap_or(defaults.min());
    let max = render.toc_max_level.unwrap_or(defaults.max());
    let toc_levels = TocLevels::new(min, max).ok_or_else(|| {
        LoadError::invalid(
            "render.toc_levels",
            format!("expected 1 <= toc_min_level <= toc_max_level <= 6, got {min}..={max}"),
        )
    })?;

    let anchor_class = render
        .anchor_class
        .map(|class| class.trim().to_string())
        .unwrap_or_else(|| DEFAULT_ANCHOR_CLASS.to_string());
    if anchor_class.is_empty() || anchor_class.contains(char::is_whitespace) {
        return Err(LoadError::invalid(
            "render.anchor_class",
            "must be a single non-empty class name",
        ));
    }

    let schema_overrides = render.schema_overrides.unwrap_or_default();
    SanitizationSchema::base()
        .with_overrides(&schema_overrides)
        .map_err(|err| LoadError::invalid("render.schema_overrides", err.to_string()))?;

    Ok(RenderSettings {
        max_input_bytes,
        max_nesting_depth,
        max_elements,
        toc_levels,
        autolink_heading_anchors: render.autolink_heading_anchors.unwrap_or(true),
        anchor_class,
        schema_overrides,
    })
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration from the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    use clap::Parser;

    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
