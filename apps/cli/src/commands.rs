//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use multilookup_core::{Processor, Route, Transfer, TriggerResult, validate_config};
use multilookup_lookup::LookupRegistry;
use multilookup_shared::{
    Attributes, FlowUnit, MIME_TYPE_ATTRIBUTE, MultiLookupError, ProcessorConfig, init_config,
    load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// MultiLookup: enrich records with several lookups in one pass.
#[derive(Parser)]
#[command(
    name = "multilookup",
    version,
    about = "Apply ordered lookup operations to record files and route records by outcome.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Check a processor configuration and list every problem found.
    Validate {
        /// Config file (defaults to ~/.multilookup/multilookup.toml).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Enrich one or more record files.
    Run {
        /// Config file (defaults to ~/.multilookup/multilookup.toml).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input record file; each file is processed as one batch.
        #[arg(short, long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for routed outputs.
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Extra batch attribute passed to lookups (key=value, repeatable).
        #[arg(long = "attr", value_parser = parse_attribute)]
        attrs: Vec<(String, String)>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with a working sample.
    Init,
    /// Show resolved configuration.
    Show {
        /// Config file (defaults to ~/.multilookup/multilookup.toml).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn parse_attribute(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "multilookup=info",
        1 => "multilookup=debug",
        _ => "multilookup=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Validate { config } => cmd_validate(config.as_deref()).await,
        Command::Run {
            config,
            inputs,
            out_dir,
            attrs,
        } => cmd_run(config.as_deref(), &inputs, &out_dir, attrs).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show { config } => cmd_config_show(config.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<ProcessorConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

async fn cmd_validate(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let registry = LookupRegistry::from_config(&config.services)?;
    let failures = validate_config(&config, &registry);

    if failures.is_empty() {
        println!("Configuration is valid.");
        return Ok(());
    }

    for failure in &failures {
        println!("  {failure}");
    }
    Err(eyre!("{} validation failure(s)", failures.len()))
}

async fn cmd_run(
    config_path: Option<&Path>,
    inputs: &[PathBuf],
    out_dir: &Path,
    attrs: Vec<(String, String)>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let registry = LookupRegistry::from_config(&config.services)?;
    let processor = Arc::new(Processor::from_config(&config, &registry)?);

    std::fs::create_dir_all(out_dir).map_err(|e| MultiLookupError::io(out_dir, e))?;

    info!(
        inputs = inputs.len(),
        strategy = processor.strategy().as_str(),
        "running enrichment"
    );

    let extra: Attributes = attrs.into_iter().collect();
    let mut handles = Vec::with_capacity(inputs.len());
    for input in inputs {
        let processor = Arc::clone(&processor);
        let input = input.clone();
        let out_dir = out_dir.to_path_buf();
        let extra = extra.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            process_file(&processor, &input, &out_dir, extra).map(|result| (input, result))
        }));
    }

    let mut failed = 0usize;
    println!();
    for handle in handles {
        let (input, result) = handle.await??;
        match result.summary {
            Some(summary) => println!(
                "  {}: {} enriched, {} not enriched",
                input.display(),
                summary.enriched,
                summary.not_enriched
            ),
            None => {
                failed += 1;
                println!("  {}: routed to failure", input.display());
            }
        }
    }
    println!();

    if failed > 0 {
        return Err(eyre!("{failed} input(s) routed to failure"));
    }
    Ok(())
}

/// Process one input file as one batch and write its routed outputs.
fn process_file(
    processor: &Processor,
    input: &Path,
    out_dir: &Path,
    extra: Attributes,
) -> Result<TriggerResult> {
    let content = std::fs::read(input).map_err(|e| MultiLookupError::io(input, e))?;

    let mut attributes = extra;
    if let Some(name) = input.file_name() {
        attributes.insert("filename".into(), name.to_string_lossy().into_owned());
    }
    if let Some(dir) = input.parent() {
        attributes.insert("path".into(), dir.to_string_lossy().into_owned());
    }

    let result = processor.on_trigger(FlowUnit::new(attributes, content));
    for transfer in &result.transfers {
        write_transfer(input, out_dir, transfer)?;
    }
    Ok(result)
}

/// Write `<stem>.<route>.<ext>` and its `<stem>.<route>.attributes.json` sidecar.
fn write_transfer(input: &Path, out_dir: &Path, transfer: &Transfer) -> Result<()> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".into());
    let ext = output_extension(input, transfer);
    let route = transfer.route.as_str();

    let content_path = out_dir.join(format!("{stem}.{route}.{ext}"));
    std::fs::write(&content_path, &transfer.unit.content)
        .map_err(|e| MultiLookupError::io(&content_path, e))?;

    let sidecar = serde_json::json!({
        "uuid": transfer.unit.id,
        "route": route,
        "attributes": transfer.unit.attributes,
    });
    let sidecar_path = out_dir.join(format!("{stem}.{route}.attributes.json"));
    std::fs::write(&sidecar_path, serde_json::to_vec_pretty(&sidecar)?)
        .map_err(|e| MultiLookupError::io(&sidecar_path, e))?;

    Ok(())
}

fn output_extension(input: &Path, transfer: &Transfer) -> String {
    match transfer.route {
        Route::Enriched | Route::NotEnriched => {
            match transfer.unit.attributes.get(MIME_TYPE_ATTRIBUTE).map(String::as_str) {
                Some("application/json") => "json".into(),
                _ => "ndjson".into(),
            }
        }
        Route::Original | Route::Failure => input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dat".into()),
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
