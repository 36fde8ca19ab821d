//! qiniu-storage: command-line client for the configured storage backend
//!
//! Settings come from `qiniu_storage.json` (or `--config`) plus `QINIU_*` env vars.

use std::path::PathBuf;

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qiniu_storage::{config, create_storage, CipherRegistry, OpenMode, Storage};

#[derive(Parser)]
#[command(
    name = "qiniu-storage",
    about = "Qiniu object storage client",
    version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")")
)]
struct Cli {
    /// Settings file, defaults to ./qiniu_storage.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file, printing the name it was stored under
    Put {
        /// Path to the local file
        local: PathBuf,
        /// Target name, defaults to the local file name
        name: Option<String>,
    },
    /// Download an object
    Get {
        name: String,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Fetch in ranged chunks of this many bytes (content is not decrypted)
        #[arg(long)]
        chunk: Option<u64>,
    },
    /// Delete an object
    Rm { name: String },
    /// Show whether an object exists and its size
    Stat { name: String },
    /// Print the download URL (signed for private buckets)
    Url { name: String },
    /// Print the first free name derived from the given one
    AvailableName { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qiniu_storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load settings / 加载配置
    let settings = match &cli.config {
        Some(path) => config::load_settings_from(path)
            .with_context(|| format!("Failed to load settings from {:?}", path))?,
        None => config::load_settings().context("Failed to load settings")?,
    };
    config::init_settings(settings).context("Failed to initialize settings")?;
    let settings = config::settings();

    let ciphers = CipherRegistry::with_builtin(settings.qiniu.aes_key.as_deref())
        .context("Failed to set up content ciphers")?;
    let storage = create_storage(&settings, &ciphers)
        .with_context(|| format!("Failed to create '{}' storage", settings.backend))?;
    tracing::debug!("Using storage backend: {}", storage.name());

    match cli.command {
        Commands::Put { local, name } => {
            let name = match name {
                Some(name) => name,
                None => local
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("Local path has no file name")?,
            };
            let content = tokio::fs::read(&local)
                .await
                .with_context(|| format!("Failed to read {:?}", local))?;
            let saved = storage.save(&name, Bytes::from(content)).await?;
            println!("{}", saved);
        }
        Commands::Get { name, out, chunk } => {
            let data = download(storage.as_ref(), &name, chunk).await?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, &data)
                        .await
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("{} bytes written to {:?}", data.len(), path);
                }
                None => {
                    use tokio::io::AsyncWriteExt;
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
        }
        Commands::Rm { name } => {
            storage.delete(&name).await?;
            println!("deleted {}", name);
        }
        Commands::Stat { name } => {
            let exists = storage.exists(&name).await?;
            let size = storage.size(&name).await?;
            println!("name:   {}", name);
            println!("exists: {}", exists);
            println!("size:   {}", size);
        }
        Commands::Url { name } => {
            println!("{}", storage.url(&name)?);
        }
        Commands::AvailableName { name } => {
            println!("{}", storage.get_available_name(&name).await?);
        }
    }

    Ok(())
}

/// 下载对象，可按块读取 / Download an object, optionally in ranged chunks
async fn download(storage: &dyn Storage, name: &str, chunk: Option<u64>) -> anyhow::Result<Bytes> {
    let mut file = storage.open(name, OpenMode::Read)?;

    let Some(chunk) = chunk.filter(|n| *n > 0) else {
        let data = file.read(None).await?;
        file.close().await?;
        return Ok(data);
    };

    let total = file.size().await?;
    let mut data = BytesMut::with_capacity(total as usize);
    while (data.len() as u64) < total {
        let part = file.read(Some(chunk)).await?;
        if part.is_empty() {
            break;
        }
        tracing::debug!("Fetched {}/{} bytes of {}", data.len() + part.len(), total, name);
        data.extend_from_slice(&part);
    }
    file.close().await?;

    Ok(data.freeze())
}
