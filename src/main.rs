use std::{
    fs,
    io::{self, Write},
    path::Path,
    process,
};

use inkpress::{
    application::{
        error::AppError,
        render::{
            DEFAULT_TOC_TITLE, RenderPipelineConfig, RenderRequest, RenderService,
            configure_render_service, render_service,
        },
    },
    config::{self, Command, OutputFormat, RenderArgs, SchemaArgs},
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    configure_render_service(RenderPipelineConfig::from(&settings.render))?;

    match cli_args.command {
        Command::Render(args) => run_render(&args),
        Command::Schema(args) => run_schema(&args),
    }
}

fn run_render(args: &RenderArgs) -> Result<(), AppError> {
    let (markdown, default_label) = read_input(&args.input)?;
    let label = args.label.clone().unwrap_or(default_label);
    let request = RenderRequest::new(markdown).with_label(label);

    let renderer = render_service();
    let rendered = if args.no_sanitize {
        info!(
            document = request.label.as_deref().unwrap_or("-"),
            "Sanitizer disabled; output is not safe to publish"
        );
        renderer.render_unsanitized(&request)?
    } else {
        let output = renderer.render(&request)?;
        match args.format {
            OutputFormat::Html => output.html,
            OutputFormat::Json => serde_json::to_string_pretty(&output).map_err(InfraError::from)?,
            OutputFormat::Toc => {
                output.toc_html(args.toc_title.as_deref().unwrap_or(DEFAULT_TOC_TITLE))
            }
        }
    };

    write_stdout(&rendered)
}

fn run_schema(args: &SchemaArgs) -> Result<(), AppError> {
    let renderer = render_service();
    let schema = renderer.schema();
    let json = if args.pretty {
        serde_json::to_string_pretty(schema)
    } else {
        serde_json::to_string(schema)
    }
    .map_err(InfraError::from)?;

    write_stdout(&json)
}

/// Read the markdown source; `-` means stdin. Returns the text and a label
/// for log events.
fn read_input(path: &Path) -> Result<(String, String), AppError> {
    if path == Path::new("-") {
        let markdown = io::read_to_string(io::stdin())?;
        return Ok((markdown, "stdin".to_string()));
    }

    let markdown = fs::read_to_string(path)?;
    let label = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("document")
        .to_owned();
    Ok((markdown, label))
}

fn write_stdout(text: &str) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
