//! Command-line front end for `jpatch-core`.
//!
//! Every subcommand reads its documents from files, falling back to STDIN for
//! the optional last argument, and writes JSON (or YAML with `--yaml`) to
//! STDOUT or the file named by `--output`.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jpatch_core::{apply_stream, extract_added, Diff, Node, Patch};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "JPATCH_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "jpatch", version, about = "Apply, diff, record and split JSON Patch documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write output to FILE instead of STDOUT.
    #[arg(short = 'o', long = "output", global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    /// Read and write YAML instead of JSON.
    #[arg(long, global = true)]
    yaml: bool,

    /// Format of the diagnostics written to STDERR.
    #[arg(long = "log-format", value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply PATCH to DOC (or STDIN) and print the result.
    Apply { patch: PathBuf, doc: Option<PathBuf> },
    /// Print the JSON Patch turning FIRST into SECOND (or STDIN).
    ///
    /// Exits with 1 when the documents differ.
    Diff { first: PathBuf, second: Option<PathBuf> },
    /// Record the effect of PATCH on DOC (or STDIN) as an invertible delta record.
    Prepare { patch: PathBuf, doc: Option<PathBuf> },
    /// Undo a delta record produced by `prepare` on DOC (or STDIN).
    Revert { record: PathBuf, doc: Option<PathBuf> },
    /// Split DOC (or STDIN), the result of PATCH, into remaining and added content.
    Extract { patch: PathBuf, doc: Option<PathBuf> },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    match try_main(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let _ = writeln!(io::stderr(), "jpatch: {err:#}");
            std::process::exit(2);
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    // A subscriber may already be installed when embedded in tests.
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn try_main(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Command::Apply { patch, doc } => run_apply(cli, patch, doc.as_deref()),
        Command::Diff { first, second } => run_diff(cli, first, second.as_deref()),
        Command::Prepare { patch, doc } => {
            let patch = read_patch(cli, patch)?;
            let document = read_document(cli, &InputSource::from(doc.as_deref()))?;
            let record =
                Diff::prepare(&document, &patch).context("failed to prepare delta record")?;
            emit(cli, &record)?;
            Ok(0)
        }
        Command::Revert { record, doc } => {
            let record = read_record(cli, record)?;
            let document = read_document(cli, &InputSource::from(doc.as_deref()))?;
            let reverted = record.revert(&document).context("failed to revert delta record")?;
            emit(cli, &reverted)?;
            Ok(0)
        }
        Command::Extract { patch, doc } => {
            let patch = read_patch(cli, patch)?;
            let document = read_document(cli, &InputSource::from(doc.as_deref()))?;
            let extraction =
                extract_added(&document, &patch).context("failed to extract added content")?;
            emit(cli, &extraction)?;
            Ok(0)
        }
    }
}

fn run_apply(cli: &Cli, patch: &Path, doc: Option<&Path>) -> Result<i32> {
    let patch = read_patch(cli, patch)?;
    let source = InputSource::from(doc);

    if cli.yaml || cli.pretty {
        let document = read_document(cli, &source)?;
        let patched = document.apply_patch(&patch).context("failed to apply patch")?;
        emit(cli, &patched)?;
        return Ok(0);
    }

    debug!(source = ?source, "streaming apply");
    let reader: Box<dyn Read> = match &source {
        InputSource::File(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Box::new(file)
        }
        InputSource::Stdin => Box::new(io::stdin().lock()),
    };
    match &cli.output {
        Some(path) => {
            let mut buffer = Vec::new();
            apply_stream(reader, &mut buffer, &patch).context("failed to apply patch")?;
            fs::write(path, &buffer)
                .with_context(|| format!("failed to write output to {}", path.display()))?;
        }
        None => {
            apply_stream(reader, io::stdout().lock(), &patch).context("failed to apply patch")?;
        }
    }
    Ok(0)
}

fn run_diff(cli: &Cli, first: &Path, second: Option<&Path>) -> Result<i32> {
    let lhs = read_document(cli, &InputSource::File(first.to_path_buf()))
        .context("failed to parse first input")?;
    let rhs = read_document(cli, &InputSource::from(second))
        .context("failed to parse second input")?;

    let patch = lhs.diff(&rhs);
    emit(cli, &patch)?;
    Ok(if patch.is_empty() { 0 } else { 1 })
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

impl From<Option<&Path>> for InputSource {
    fn from(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::File(path.to_path_buf()),
            None => Self::Stdin,
        }
    }
}

fn read_input(source: &InputSource) -> Result<String> {
    match source {
        InputSource::File(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("failed to read STDIN")?;
            Ok(buffer)
        }
    }
}

fn parse_node(input: &str, yaml: bool) -> Result<Node> {
    if yaml {
        Node::from_yaml_str(input).map_err(|err| anyhow!(err))
    } else {
        Node::from_json_str(input).map_err(|err| anyhow!(err))
    }
}

fn read_document(cli: &Cli, source: &InputSource) -> Result<Node> {
    let text = read_input(source)?;
    parse_node(&text, cli.yaml)
}

fn read_patch(cli: &Cli, path: &Path) -> Result<Patch> {
    let node = read_document(cli, &InputSource::File(path.to_path_buf()))
        .with_context(|| format!("failed to parse patch {}", path.display()))?;
    Patch::from_json_value(node.to_json_value())
        .with_context(|| format!("invalid patch {}", path.display()))
}

fn read_record(cli: &Cli, path: &Path) -> Result<Diff> {
    let node = read_document(cli, &InputSource::File(path.to_path_buf()))
        .with_context(|| format!("failed to parse delta record {}", path.display()))?;
    serde_json::from_value(node.to_json_value())
        .with_context(|| format!("invalid delta record {}", path.display()))
}

fn render<T: Serialize>(cli: &Cli, value: &T) -> Result<String> {
    let mut text = if cli.yaml {
        serde_yaml::to_string(value).context("failed to encode YAML")?
    } else if cli.pretty {
        serde_json::to_string_pretty(value).context("failed to encode JSON")?
    } else {
        serde_json::to_string(value).context("failed to encode JSON")?
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

fn emit<T: Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let rendered = render(cli, value)?;
    if let Some(path) = &cli.output {
        fs::write(path, rendered.as_bytes())
            .with_context(|| format!("failed to write output to {}", path.display()))?;
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes()).context("failed to write STDOUT")?;
        stdout.flush().ok();
    }
    Ok(())
}
