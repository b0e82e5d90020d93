//! dabba CLI - Command line interface for a dabba store
//!
//! Each invocation opens the store, runs one command, prints JSON to
//! stdout and closes the store. Logs go to stderr (`RUST_LOG`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use dabba::{FileId, Meta, Store};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dabba")]
#[command(about = "A content-addressed blob store with revision history")]
#[command(version)]
struct Cli {
    /// Path to the store root
    #[arg(short, long, default_value = ".dabba")]
    root: PathBuf,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a store
    Init,

    // === Logical File Commands ===
    /// Store a file as a new logical file
    Put {
        /// File to read
        path: PathBuf,
    },

    /// Store a file as the next revision of an existing id
    Update {
        /// The file id
        id: i64,
        /// File to read
        path: PathBuf,
    },

    /// Show a file; text content is inlined
    Get {
        /// The file id
        id: i64,
    },

    /// Show the revision log of a file
    Log {
        /// The file id
        id: i64,
    },

    /// List all logical files
    List,

    // === Named File Commands ===
    /// Store a file under a name with metadata
    NamedPut {
        /// Name to store under
        name: String,
        /// File to read
        path: PathBuf,
        /// Metadata entries as key=value
        #[arg(short, long = "meta", value_parser = parse_meta_entry)]
        meta: Vec<(String, String)>,
    },

    /// Show a named file
    NamedGet {
        /// The name
        name: String,
    },

    /// Show the metadata of a named file
    Meta {
        /// The name
        name: String,
    },

    /// Show or set the default document
    StartFile {
        /// New start file name
        name: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut store = Store::open(&cli.root)
        .with_context(|| format!("opening store at {}", cli.root.display()))?;

    match cli.command {
        Commands::Init => {
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Initialized store at {}", cli.root.display())
                }),
            )?;
        }

        Commands::Put { path } => {
            let mut file = open_input(&path)?;
            let id = store.put(&mut file)?;
            let record = store.resolve(id)?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "id": id,
                    "object_id": record.object_id
                }),
            )?;
        }

        Commands::Update { id, path } => {
            let mut file = open_input(&path)?;
            let hash = store.update(FileId(id), &mut file)?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "id": id,
                    "object_id": hash
                }),
            )?;
        }

        Commands::Get { id } => {
            let file = store.read(FileId(id))?;
            output(cli.format, &serde_json::to_value(&file)?)?;
        }

        Commands::Log { id } => {
            let log = store.history(FileId(id))?;
            output(cli.format, &serde_json::to_value(&log)?)?;
        }

        Commands::List => {
            let files = store.list()?;
            output(cli.format, &serde_json::to_value(&files)?)?;
        }

        Commands::NamedPut { name, path, meta } => {
            let mut file = open_input(&path)?;
            let meta: Meta = meta.into_iter().collect();
            store.named().write(&name, &mut file, &meta)?;
            output(
                cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "name": name
                }),
            )?;
        }

        Commands::NamedGet { name } => {
            let mut file = store.named().get(&name)?;
            let content = if file.is_text() {
                Some(file.content()?)
            } else {
                None
            };
            output(
                cli.format,
                &serde_json::json!({
                    "name": file.name(),
                    "type": file.content_type(),
                    "is_image": file.is_image(),
                    "meta": file.meta(),
                    "path": file.path().display().to_string(),
                    "content": content
                }),
            )?;
        }

        Commands::Meta { name } => {
            let meta = store.named().meta(&name)?;
            output(cli.format, &serde_json::to_value(&meta)?)?;
        }

        Commands::StartFile { name } => {
            if name.is_some() {
                store.set_start_file(name)?;
            }
            output(
                cli.format,
                &serde_json::json!({ "start-file": store.start_file() }),
            )?;
        }
    }

    store.close()?;
    Ok(())
}

fn open_input(path: &Path) -> anyhow::Result<fs::File> {
    fs::File::open(path).with_context(|| format!("opening {}", path.display()))
}

fn parse_meta_entry(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}

fn output(format: OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Text => serde_json::to_string_pretty(value)?,
    };
    println!("{}", rendered);
    Ok(())
}
