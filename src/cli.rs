use crate::config::load_config;
use crate::ir::{CircleRecord, records_from_json, records_from_json5};
use crate::layout::compute_layout;
use crate::layout_dump::{LabelView, LayoutDump, write_layout_dump};
use crate::parser::parse_org_structure;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "orgchart",
    version,
    about = "Circle-packing layout for organization charts"
)]
pub struct Args {
    /// Input file (.json, .json5, .org, .txt) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the JSON layout. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Phantom refinement passes after the first pack
    #[arg(long = "max-passes")]
    pub max_passes: Option<usize>,

    /// Evaluate label visibility at this zoom level
    #[arg(long = "zoom")]
    pub zoom: Option<f64>,

    /// Circle id treated as focused for label decisions
    #[arg(long = "focus")]
    pub focus: Option<String>,

    /// Input format
    #[arg(long = "format", value_enum, default_value = "auto")]
    pub format: InputFormat,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Auto,
    Json,
    Json5,
    Markup,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(max_passes) = args.max_passes {
        config.pack.max_passes = max_passes;
    }

    let (input, detected) = read_input(args.input.as_deref())?;
    let format = match args.format {
        InputFormat::Auto => detected,
        explicit => explicit,
    };
    let records = parse_records(&input, format)?;

    let layout = compute_layout(&records, &config)?;
    for warning in &layout.warnings {
        warn!(%warning, "layout input");
    }
    info!(
        nodes = layout.nodes.len(),
        passes = layout.passes,
        converged = layout.converged,
        phantoms = layout.phantom_count,
        "layout computed"
    );

    let mut dump = LayoutDump::from_layout(&layout);
    if args.zoom.is_some() || args.focus.is_some() {
        let view = LabelView {
            zoom: config.zoom.clamp(args.zoom.unwrap_or(config.zoom.initial_level)),
            focus: args.focus.clone(),
        };
        dump = dump.with_labels(&layout, &view, &config.labels, config.bounds.padding);
    }
    write_layout_dump(args.output.as_deref(), &dump)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<(String, InputFormat)> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok((content, detect_format(path)));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, InputFormat::Auto))
}

fn detect_format(path: &Path) -> InputFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => InputFormat::Json,
        Some("json5") => InputFormat::Json5,
        Some("org" | "txt") => InputFormat::Markup,
        _ => InputFormat::Auto,
    }
}

fn parse_records(input: &str, format: InputFormat) -> Result<Vec<CircleRecord>> {
    match format {
        InputFormat::Json => Ok(records_from_json(input)?),
        InputFormat::Json5 => records_from_json5(input),
        InputFormat::Markup => parse_markup(input),
        InputFormat::Auto => {
            let trimmed = input.trim_start();
            if trimmed.starts_with('[') || trimmed.starts_with('{') {
                records_from_json5(input)
            } else {
                parse_markup(input)
            }
        }
    }
}

fn parse_markup(input: &str) -> Result<Vec<CircleRecord>> {
    let output = parse_org_structure(input);
    for issue in &output.warnings {
        warn!(line = issue.line, kind = ?issue.kind, "{}", issue.message);
    }
    for issue in &output.errors {
        tracing::error!(line = issue.line, kind = ?issue.kind, "{}", issue.message);
    }
    Ok(output.into_records()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(detect_format(Path::new("a.json")), InputFormat::Json);
        assert_eq!(detect_format(Path::new("a.json5")), InputFormat::Json5);
        assert_eq!(detect_format(Path::new("team.org")), InputFormat::Markup);
        assert_eq!(detect_format(Path::new("notes")), InputFormat::Auto);
    }

    #[test]
    fn auto_format_sniffs_content() {
        let json = r#"[{"id": "a", "name": "A"}]"#;
        assert_eq!(parse_records(json, InputFormat::Auto).unwrap().len(), 1);

        let markup = "root: Acme\n- circle: Ops\n";
        let records = parse_records(markup, InputFormat::Auto).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].parent_id.as_deref(), Some("acme"));
    }

    #[test]
    fn markup_errors_surface() {
        let err = parse_records("- circle: A\n--- circle: B\n", InputFormat::Markup).unwrap_err();
        assert!(err.to_string().contains("Cannot skip levels"));
    }

    #[test]
    fn args_parse_overrides() {
        let args = Args::try_parse_from([
            "orgchart", "-i", "org.json", "-w", "1024", "--max-passes", "4", "--zoom", "2", "-vv",
        ])
        .unwrap();
        assert_eq!(args.width, Some(1024.0));
        assert_eq!(args.max_passes, Some(4));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.format, InputFormat::Auto);
    }
}
