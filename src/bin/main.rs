//! JSON merge CLI
//!
//! Command-line tool for deep-merging JSON and JSON5 documents into one file.

use std::fs;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use merge_json::{
    combine, decode, load_documents, CombineError, CombineOutput, DocumentId, ExportModule, Format,
    JsonSpace, MergeOptions, DEFAULT_FILE_NAME,
};

#[derive(Parser)]
#[command(name = "merge-json")]
#[command(about = "Deep-merge JSON documents into a single file")]
#[command(version)]
struct Cli {
    /// Input documents, merged in the order given
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (default: stdout, or <first input dir>/<file name> when a file name is set)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with merge options; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file name, placed next to the first input
    #[arg(long)]
    file_name: Option<String>,

    /// Object or array to start merging into
    #[arg(long, value_name = "JSON")]
    start: Option<String>,

    /// Object or array merged over the result last
    #[arg(long, value_name = "JSON")]
    end: Option<String>,

    /// Object merged over every input document
    #[arg(long, value_name = "JSON")]
    edit: Option<String>,

    /// Wrap output as `module.exports = ...;`, or `<NAME> = ...;` with `--export-module=NAME`
    #[arg(
        long,
        value_name = "NAME",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    export_module: Option<String>,

    /// Concatenate arrays instead of merging them by index
    #[arg(long)]
    concat_arrays: bool,

    /// Replace arrays instead of merging them by index
    #[arg(long)]
    no_merge_arrays: bool,

    /// Indent string or number of spaces ("" for single-line output)
    #[arg(long, allow_hyphen_values = true)]
    indent: Option<String>,

    /// Read and write JSON5
    #[arg(long)]
    json5: bool,

    /// Drop members with this key from the output (repeatable)
    #[arg(long = "omit-key", value_name = "KEY")]
    omit_keys: Vec<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a JSON value given on the command line
fn parse_arg_value(flag: &str, text: &str, format: Format) -> Result<Value, CombineError> {
    decode(text, &DocumentId::new(flag), format)
}

/// Interpret an indent argument: digits mean a number of spaces
fn parse_indent(indent: &str) -> JsonSpace {
    match indent.parse::<usize>() {
        Ok(count) => JsonSpace::Count(count),
        Err(_) => JsonSpace::Text(indent.replace("\\t", "\t")),
    }
}

/// Build options from the config file (if any) and command-line flags
fn build_options(cli: &Cli) -> Result<MergeOptions, CombineError> {
    let mut options = match &cli.config {
        Some(path) => MergeOptions::from_toml_file(path)?,
        None => MergeOptions::default(),
    };

    if cli.json5 {
        options.json5 = true;
    }
    let format = options.format();

    if let Some(file_name) = &cli.file_name {
        options.file_name = file_name.clone();
    }
    if let Some(start) = &cli.start {
        options.start_obj = Some(parse_arg_value("--start", start, format)?);
    }
    if let Some(end) = &cli.end {
        options.end_obj = Some(parse_arg_value("--end", end, format)?);
    }
    if let Some(edit) = &cli.edit {
        options.edit = Some(parse_arg_value("--edit", edit, format)?);
    }
    if let Some(name) = &cli.export_module {
        options.export_module = if name.is_empty() {
            ExportModule::ModuleExports
        } else {
            ExportModule::variable(name.clone())
        };
    }
    if cli.concat_arrays {
        options.concat_arrays = true;
    }
    if cli.no_merge_arrays {
        options.merge_arrays = false;
    }
    if let Some(indent) = &cli.indent {
        options.json_space = parse_indent(indent);
    }
    if !cli.omit_keys.is_empty() {
        let omit = cli.omit_keys.clone();
        options = options.with_replacer(move |key, value| {
            if omit.iter().any(|k| k == key) {
                None
            } else {
                Some(value.clone())
            }
        });
    }

    Ok(options)
}

/// Write output to file or stdout
fn write_output(output: &CombineOutput, target: Option<&PathBuf>) -> Result<(), CombineError> {
    match target {
        Some(path) => {
            fs::write(path, &output.contents)?;
            info!(path = %path.display(), "Wrote merged document");
        }
        None => {
            println!("{}", output.contents);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CombineError> {
    let options = build_options(&cli)?;
    // fail on bad start/end values before reading any input
    options.validate()?;

    let documents = load_documents(&cli.inputs)?;

    let Some(output) = combine(&options, documents)? else {
        info!("No input documents with contents; nothing written");
        return Ok(());
    };

    let target = match &cli.output {
        Some(path) => Some(path.clone()),
        None if cli.file_name.is_some() || options.file_name != DEFAULT_FILE_NAME => {
            Some(output.path.clone())
        }
        None => None,
    };

    write_output(&output, target.as_ref())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
