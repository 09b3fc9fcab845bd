use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use oni_core::core_api::{Engine, ParseOptions};
use oni_core::known_ids::{FileIds, KnownIds};
use oni_render::{JsonStyle, render_json, render_summary_text};
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE")]
    path: PathBuf,
    /// Write output to PATH instead of stdout ("-" for stdout).
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
    /// Spaces per indent level; 0 prints compact JSON.
    #[arg(long, default_value_t = 2)]
    indent: usize,
    /// Print a plain-text summary instead of JSON.
    #[arg(long)]
    text: bool,
    /// Include parse warnings in the output.
    #[arg(long)]
    warnings: bool,
    #[arg(long = "known-traits", value_name = "FILE")]
    known_traits: Option<PathBuf>,
    #[arg(long = "known-effects", value_name = "FILE")]
    known_effects: Option<PathBuf>,
    /// Raise log verbosity on stderr (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn parse_options(cli: &Cli) -> ParseOptions {
    if cli.known_traits.is_none() && cli.known_effects.is_none() {
        return ParseOptions::default();
    }
    let mut source = FileIds::new();
    if let Some(path) = &cli.known_traits {
        source = source.with_traits(path);
    }
    if let Some(path) = &cli.known_effects {
        source = source.with_effects(path);
    }
    ParseOptions {
        known_ids: Some(Arc::new(KnownIds::from_source(&source))),
        ..ParseOptions::default()
    }
}

fn to_json_string(value: &JsonValue, indent: usize) -> Result<String, serde_json::Error> {
    if indent == 0 {
        return serde_json::to_string(value);
    }
    let indent = " ".repeat(indent);
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = Engine::with_options(parse_options(&cli));
    let result = engine.parse_file(&cli.path);
    let save = match (&result.save_game, result.success) {
        (Some(save), true) => save,
        _ => {
            eprintln!(
                "error: {}",
                result.error_message().unwrap_or("save could not be parsed")
            );
            process::exit(1);
        }
    };

    let rendered = if cli.text {
        let mut text = render_summary_text(save, &result.entities);
        if cli.warnings && !result.warnings.is_empty() {
            text.push_str("\nWarnings\n");
            for warning in &result.warnings {
                text.push_str(&format!("  {warning}\n"));
            }
        }
        text
    } else {
        let mut json = render_json(save, &result.entities, JsonStyle::ContractV1);
        if cli.warnings
            && let JsonValue::Object(map) = &mut json
        {
            map.insert(
                "warnings".to_string(),
                JsonValue::Array(
                    result
                        .warnings
                        .iter()
                        .cloned()
                        .map(JsonValue::String)
                        .collect(),
                ),
            );
        }
        let mut out = to_json_string(&json, cli.indent).unwrap_or_else(|e| {
            eprintln!("error: rendering JSON output: {e}");
            process::exit(1);
        });
        out.push('\n');
        out
    };

    match cli.out.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            fs::write(path, rendered).unwrap_or_else(|e| {
                eprintln!("error: writing {}: {e}", path.display());
                process::exit(1);
            });
        }
        _ => print!("{rendered}"),
    }
}
