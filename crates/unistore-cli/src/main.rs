mod commands;

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use unistore_core::error::StorageError;

#[derive(Parser)]
#[command(name = "unistore")]
#[command(about = "One command line for S3, GCS and local object storage")]
#[command(version)]
struct Cli {
    /// Path to the unistore config directory (default: ~/.unistore)
    #[arg(long, global = true, env = "UNISTORE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration using the local backend
    Init,

    /// Upload a file as an object
    Put {
        bucket: String,
        key: OsString,
        /// File to upload
        file: PathBuf,
        /// Content type; sniffed from the first bytes when omitted
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        cache_control: Option<String>,
        #[arg(long)]
        content_encoding: Option<String>,
        #[arg(long)]
        content_language: Option<String>,
        #[arg(long)]
        content_disposition: Option<String>,
        /// Canned ACL: private or public-read
        #[arg(long)]
        acl: Option<String>,
        /// User metadata as key=value, repeatable
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },

    /// Download an object to a file, or to stdout
    Get {
        bucket: String,
        key: OsString,
        /// Destination file (default: stdout)
        dest: Option<PathBuf>,
    },

    /// Show object headers
    Head { bucket: String, key: OsString },

    /// Delete one or more objects
    Rm {
        bucket: String,
        #[arg(required = true)]
        keys: Vec<OsString>,
        /// Only report failures when deleting several keys
        #[arg(long)]
        quiet: bool,
    },

    /// Server-side copy of an object
    Cp {
        src_bucket: String,
        src_key: OsString,
        dst_bucket: String,
        dst_key: OsString,
    },

    /// List objects and directories
    Ls {
        bucket: String,
        #[arg(long, default_value = "")]
        prefix: String,
        /// Page size
        #[arg(long, default_value_t = 1000)]
        size: usize,
        /// Resume after this entry
        #[arg(long, default_value = "")]
        cursor: String,
        /// Follow cursors until the listing is exhausted
        #[arg(long)]
        all: bool,
        /// Print entries as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let not_found = e
                .downcast_ref::<StorageError>()
                .is_some_and(StorageError::is_not_found);
            if not_found {
                eprintln!("Error: not found: {e:#}");
                ExitCode::from(2)
            } else {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("unistore=info".parse()?),
        )
        .init();

    let base_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => unistore_core::config::StorageConfig::default_base_dir()?,
    };

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Init => commands::init::run(&base_dir),
        Commands::Put {
            bucket,
            key,
            file,
            content_type,
            cache_control,
            content_encoding,
            content_language,
            content_disposition,
            acl,
            meta,
        } => {
            let opts = commands::put::PutOptions {
                content_type,
                cache_control,
                content_encoding,
                content_language,
                content_disposition,
                acl,
                meta,
            };
            rt.block_on(commands::put::run(&base_dir, &bucket, &key, &file, opts))
        }
        Commands::Get { bucket, key, dest } => {
            rt.block_on(commands::get::run(&base_dir, &bucket, &key, dest.as_deref()))
        }
        Commands::Head { bucket, key } => {
            rt.block_on(commands::head::run(&base_dir, &bucket, &key))
        }
        Commands::Rm {
            bucket,
            keys,
            quiet,
        } => rt.block_on(commands::rm::run(&base_dir, &bucket, &keys, quiet)),
        Commands::Cp {
            src_bucket,
            src_key,
            dst_bucket,
            dst_key,
        } => rt.block_on(commands::cp::run(
            &base_dir,
            &src_bucket,
            &src_key,
            &dst_bucket,
            &dst_key,
        )),
        Commands::Ls {
            bucket,
            prefix,
            size,
            cursor,
            all,
            json,
        } => {
            let opts = commands::ls::LsOptions {
                prefix,
                size,
                cursor,
                all,
                json,
            };
            rt.block_on(commands::ls::run(&base_dir, &bucket, opts))
        }
        Commands::Config => commands::config::run(&base_dir),
    }
}
