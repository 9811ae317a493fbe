use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;

use rapid_engine::DocumentStore;
use rapid_server::{RapidConfig, RapidServer};
use rapid_types::{Document, StorePath, PATH_FIELD};

use crate::cli::*;

/// Read when `--config` is not given and the file exists.
const DEFAULT_CONFIG_FILE: &str = "rapid.toml";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Read(args) => cmd_read(&config, args, format),
        Command::Write(args) => cmd_write(&config, args, format),
        Command::Delete(args) => cmd_delete(&config, args, format),
        Command::Config => cmd_config(&config, format),
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<RapidConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                return Ok(RapidConfig::default());
            }
            fallback
        }
    };
    tracing::debug!(path = %path.display(), "loading configuration");
    Ok(RapidConfig::load(&path)?)
}

fn open_store(config: &RapidConfig) -> anyhow::Result<DocumentStore> {
    config.open_store().context("failed to open table backend")
}

fn parse_document(text: &str) -> anyhow::Result<Document> {
    let json: serde_json::Value = serde_json::from_str(text).context("document is not valid JSON")?;
    let mut document = Document::from_json(json)?;
    document.remove(PATH_FIELD);
    Ok(document)
}

fn print_json(value: &serde_json::Value, format: OutputFormat) -> anyhow::Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Text => serde_json::to_string_pretty(value)?,
    };
    println!("{text}");
    Ok(())
}

fn cmd_serve(mut config: RapidConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    let server = RapidServer::from_config(&config)?;
    println!(
        "Rapid server on {} (backend: {:?})",
        config.server.bind_addr.to_string().bold(),
        config.table.backend
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_read(config: &RapidConfig, args: PathArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = StorePath::parse(&args.path)?;
    let outcome = open_store(config)?.read(&path)?;
    match outcome.to_json() {
        Some(json) => print_json(&json, format),
        None => anyhow::bail!("nothing stored at {path}"),
    }
}

fn cmd_write(config: &RapidConfig, args: WriteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = StorePath::parse(&args.path)?;
    let text = match args.json {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read document from stdin")?;
            buf
        }
    };
    let document = parse_document(&text)?;
    let stored = open_store(config)?.write(&path, document)?;

    if format == OutputFormat::Text {
        let at = stored.path().unwrap_or(path.as_str());
        println!("{} Stored at {}", "✓".green().bold(), at.yellow());
    }
    print_json(&stored.to_json(), format)
}

fn cmd_delete(config: &RapidConfig, args: PathArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = StorePath::parse(&args.path)?;
    let deleted = open_store(config)?.delete(&path)?;
    match format {
        OutputFormat::Json => print_json(
            &serde_json::json!({"path": path.as_str(), "deleted": deleted}),
            format,
        ),
        OutputFormat::Text => {
            println!(
                "{} Deleted {} rows under {}",
                "✓".green().bold(),
                deleted.to_string().bold(),
                path.as_str().yellow()
            );
            Ok(())
        }
    }
}

fn cmd_config(config: &RapidConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(config)?, format),
        OutputFormat::Text => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
