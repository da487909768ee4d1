use crate::config::load_config;
use crate::di::serialize_definitions;
use crate::layout::compute_definitions_layout;
use crate::layout_dump::write_layout_dump;
use crate::markup::write_definitions;
use crate::parser::{parse_bpmn, parse_json};
use crate::validate::lint;
use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(
    name = "bpmn-autolayout",
    version,
    about = "Computes diagram interchange geometry for BPMN processes"
)]
pub struct Args {
    /// Input file (.bpmn/.xml, or .json for the structure model) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file with layout and lint overrides
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Write the computed geometry as JSON to this path
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Emit only the BPMNDiagram elements instead of the merged document
    #[arg(long = "di-only")]
    pub di_only: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputFormat {
    Xml,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    debug!(args:?; "Parsed arguments");

    let config = load_config(args.config.as_deref()).context("failed to load config file")?;
    let (input, format) = read_input(args.input.as_deref())?;

    let (defs, markup) = match format {
        InputFormat::Json => {
            let defs = parse_json(&input).context("failed to decode JSON structure")?;
            let markup = write_definitions(&defs);
            (defs, markup)
        }
        InputFormat::Xml => {
            let defs = parse_bpmn(&input).context("failed to decode BPMN markup")?;
            (defs, input)
        }
    };

    for warning in lint(&defs, Some(&markup), &config.lint) {
        warn!("{warning}");
    }

    let layout = compute_definitions_layout(&defs, &config.layout)?;
    info!(width = layout.width, height = layout.height; "Layout complete");

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &defs, &layout)
            .with_context(|| format!("failed to write layout dump to {}", path.display()))?;
    }

    let document = serialize_definitions(&defs, &layout);
    let output = if args.di_only {
        let mut xml = document.to_xml();
        xml.push('\n');
        xml
    } else {
        document
            .merge_into(&markup)
            .context("failed to merge diagram interchange")?
    };
    write_output(&output, args.output.as_deref())
}

fn init_logging(level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {level}. Using 'warn' instead.");
        LevelFilter::Warn
    });
    // A logger may already be installed when embedded; keep it.
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<(String, InputFormat)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            return Ok((read_stdin()?, InputFormat::Xml));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok((content, detect_format(path)));
    }
    Ok((read_stdin()?, InputFormat::Xml))
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn detect_format(path: &Path) -> InputFormat {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "json" | "json5"))
        .unwrap_or(false);
    if is_json {
        InputFormat::Json
    } else {
        InputFormat::Xml
    }
}

fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn detects_json_input_by_extension() {
        assert_eq!(detect_format(Path::new("order.json")), InputFormat::Json);
        assert_eq!(detect_format(Path::new("order.JSON5")), InputFormat::Json);
        assert_eq!(detect_format(Path::new("order.bpmn")), InputFormat::Xml);
        assert_eq!(detect_format(Path::new("order")), InputFormat::Xml);
    }

    #[test]
    fn parses_documented_flags() {
        Args::command().debug_assert();
        let args = Args::try_parse_from([
            "bpmn-autolayout",
            "-i",
            "in.bpmn",
            "-o",
            "out.bpmn",
            "-c",
            "layout.json",
            "--dump-layout",
            "dump.json",
            "--di-only",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.input.as_deref(), Some(Path::new("in.bpmn")));
        assert_eq!(args.config.as_deref(), Some(Path::new("layout.json")));
        assert!(args.di_only);
        assert_eq!(args.log_level, "debug");
    }
}
