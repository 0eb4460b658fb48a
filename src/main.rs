//! upbox CLI - Command line interface for an upbox storage root
//!
//! Uploads, fetches and inspects files in a local store using the same
//! pipeline a server would. Several processes may work on one root at once.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use upbox::{Error, Storage, StorageConfig, UploadResponse};

#[derive(Parser)]
#[command(name = "upbox")]
#[command(about = "A content-addressed file hosting store with short public aliases")]
#[command(version)]
struct Cli {
    /// Storage root directory (overrides the config file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Path to a JSON config file (default: ~/.config/upbox/config.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Public URL prefix used in upload results
    #[arg(long)]
    base_url: Option<String>,

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
    /// Create the storage layout
    Init,

    /// Upload files ("-" reads stdin)
    Put {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Name to report instead of the file name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Write a file's content to stdout or a path
    Get {
        /// Public ID, e.g. abcdef.png
        id: String,
        /// Output path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a file's hash, size and serving headers
    Stat {
        /// Public ID, e.g. abcdef.png
        id: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Init => {
            let storage = Storage::open(config)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "message": format!("Initialized store at {}", storage.config().root.display())
                }),
            );
        }

        Commands::Put { files, name } => {
            let storage = Storage::open(config)?;
            let mut results = Vec::new();
            for path in &files {
                let display_name = match &name {
                    Some(name) => name.clone(),
                    None => file_name(path),
                };
                match upload_path(&storage, path, &display_name) {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        print_response(&cli.format, &UploadResponse::failure(&e));
                        std::process::exit(1);
                    }
                }
            }
            print_response(&cli.format, &UploadResponse::success(results));
        }

        Commands::Get { id, output: target } => {
            let storage = Storage::open(config)?;
            let mut served = match storage.get(&id) {
                Ok(served) => served,
                Err(e) => fail(&cli.format, &e),
            };
            match target {
                Some(path) => {
                    let mut file = File::create(&path)?;
                    io::copy(&mut served.file, &mut file)?;
                }
                None => {
                    io::copy(&mut served.file, &mut io::stdout().lock())?;
                }
            }
        }

        Commands::Stat { id } => {
            let storage = Storage::open(config)?;
            let served = match storage.get(&id) {
                Ok(served) => served,
                Err(e) => fail(&cli.format, &e),
            };
            let headers: serde_json::Map<String, serde_json::Value> = served
                .headers(Utc::now())
                .into_iter()
                .map(|(name, value)| (name.to_string(), serde_json::Value::String(value)))
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "id": id,
                    "hash": served.hash.to_hex(),
                    "size": served.content_length,
                    "modified": DateTime::<Utc>::from(served.modified).to_rfc3339(),
                    "headers": headers
                }),
            );
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<StorageConfig> {
    let mut config = match &cli.config {
        Some(path) => StorageConfig::load(path)?,
        None => match StorageConfig::default_path() {
            Some(path) if path.exists() => StorageConfig::load(&path)?,
            _ => StorageConfig::default(),
        },
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.serve.base_url = base_url.clone();
    }
    Ok(config)
}

fn upload_path(storage: &Storage, path: &Path, name: &str) -> upbox::Result<upbox::UploadResult> {
    let upload = if path == Path::new("-") {
        storage.upload(io::stdin().lock(), name)?
    } else {
        storage.upload(File::open(path)?, name)?
    };
    Ok(storage.result_for(name, &upload))
}

fn file_name(path: &Path) -> String {
    if path == Path::new("-") {
        return "stdin".to_string();
    }
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_response(format: &OutputFormat, response: &UploadResponse) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(response).unwrap());
        }
        OutputFormat::Text => match (&response.error_code, &response.description) {
            (Some(code), Some(description)) => println!("ERROR: ({}) {}", code, description),
            _ => {
                for file in &response.files {
                    println!("{}", file.url);
                }
            }
        },
    }
}

fn fail(format: &OutputFormat, error: &Error) -> ! {
    output(
        format,
        &serde_json::json!({
            "status": "error",
            "code": error.status_code(),
            "message": error.to_string()
        }),
    );
    std::process::exit(1);
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value).unwrap());
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value).unwrap());
        }
    }
}
