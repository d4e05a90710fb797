use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the inkpress binary.
#[derive(Debug, Parser)]
#[command(
    name = "inkpress",
    version,
    about = "Render Markdown into sanitised HTML with heading anchors"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "INKPRESS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a Markdown file (or `-` for stdin) and print the result.
    Render(Box<RenderArgs>),
    /// Print the effective sanitization schema as JSON.
    Schema(SchemaArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Markdown source file; `-` reads standard input.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// What to print on stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    pub format: OutputFormat,

    /// Skip the sanitizer. Diagnostic output only; never publish it.
    #[arg(long = "no-sanitize", action = clap::ArgAction::SetTrue)]
    pub no_sanitize: bool,

    /// Title of the table-of-contents widget printed with `--format toc`.
    #[arg(long = "toc-title", value_name = "TEXT")]
    pub toc_title: Option<String>,

    /// Label attached to log events; defaults to the input file name.
    #[arg(long, value_name = "TEXT")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The sanitised HTML fragment.
    Html,
    /// `{ "html": ..., "headings": [...] }`.
    Json,
    /// Table-of-contents navigation markup.
    Toc,
}

#[derive(Debug, Args, Clone)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Pretty-print the JSON document.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the maximum accepted input size in bytes.
    #[arg(long = "max-input-bytes", value_name = "BYTES")]
    pub max_input_bytes: Option<u64>,

    /// Override the maximum element nesting depth.
    #[arg(long = "max-nesting-depth", value_name = "DEPTH")]
    pub max_nesting_depth: Option<u64>,

    /// Override the element budget checked before HTML parsing.
    #[arg(long = "max-elements", value_name = "COUNT")]
    pub max_elements: Option<u64>,

    /// Shallowest heading level collected into the table of contents.
    #[arg(long = "toc-min-level", value_name = "LEVEL")]
    pub toc_min_level: Option<u8>,

    /// Deepest heading level collected into the table of contents.
    #[arg(long = "toc-max-level", value_name = "LEVEL")]
    pub toc_max_level: Option<u8>,

    /// Do not wrap heading content in self-links.
    #[arg(long = "no-heading-anchors", action = clap::ArgAction::SetTrue)]
    pub no_heading_anchors: bool,

    /// Override the class placed on heading self-links.
    #[arg(long = "anchor-class", value_name = "CLASS")]
    pub anchor_class: Option<String>,
}
