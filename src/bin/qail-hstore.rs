//! qail-hstore — inspect and round-trip hstore values
//!
//! # Usage
//!
//! ```bash
//! # Decode the text format
//! qail-hstore decode '"a"=>"1", "b"=>NULL'
//!
//! # Decode a hex dump of the binary format
//! qail-hstore decode --binary 0000000100000001610000000131
//!
//! # Encode a JSON object
//! qail-hstore encode '{"a": "1", "b": null}' --binary
//!
//! # Look up the hstore OID, installing the extension first
//! qail-hstore resolve --install --database-url postgres://localhost/mydb
//!
//! # Send a value through the server and compare
//! qail-hstore roundtrip '"0"=>"0", "00"=>"a😅b"'
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use qail_hstore::config::{Config, OutputFormat};
use qail_hstore::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qail-hstore")]
#[command(author = "QAIL Contributors")]
#[command(version)]
#[command(about = "PostgreSQL hstore codec CLI", long_about = None)]
#[command(after_help = "EXAMPLES:
    qail-hstore decode '\"a\"=>\"1\", \"b\"=>NULL'
    qail-hstore encode '{\"a\": \"1\"}' --binary
    qail-hstore resolve --install --database-url postgres://localhost/mydb")]
struct Cli {
    /// Output format (overrides the config file)
    #[arg(short, long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Database connection URL
    #[arg(long, env = "QAIL_HSTORE_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Name of the type in pg_type
    #[arg(long, global = true)]
    type_name: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a text-format value, or a hex-encoded binary one
    Decode {
        input: String,
        /// Treat the input as hex-encoded binary format
        #[arg(short, long)]
        binary: bool,
    },
    /// Encode a JSON object of strings/nulls
    Encode {
        json: String,
        /// Emit hex-encoded binary format instead of text
        #[arg(short, long)]
        binary: bool,
    },
    /// Look up the type OID in the connected database
    Resolve {
        /// Run CREATE EXTENSION IF NOT EXISTS hstore first
        #[arg(long)]
        install: bool,
    },
    /// Send a text-format value through the server in both formats
    Roundtrip { input: String },
}

/// Flags merged over the config file.
struct Settings {
    format: OutputFormat,
    database_url: Option<String>,
    type_name: String,
}

impl Settings {
    fn merge(cli: &Cli, config: Config) -> Self {
        Self {
            format: cli.format.or(config.format).unwrap_or_default(),
            type_name: cli
                .type_name
                .clone()
                .unwrap_or_else(|| config.type_name().to_string()),
            database_url: cli.database_url.clone().or(config.database_url),
        }
    }

    async fn connect(&self) -> Result<HstoreDB> {
        let Some(url) = &self.database_url else {
            bail!("No database URL. Use --database-url or set QAIL_HSTORE_DATABASE_URL");
        };
        HstoreDB::connect(url)
            .await
            .context("Failed to connect to database")
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "qail_hstore=debug"
    } else {
        "qail_hstore=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::merge(&cli, Config::load()?);

    match cli.command {
        Commands::Decode { input, binary } => {
            let hstore = if binary {
                let bytes = hex::decode(input.trim()).context("Input is not valid hex")?;
                decode_binary(&bytes)?
            } else {
                decode_text(&input)?
            };
            print_hstore(&hstore, settings.format);
        }
        Commands::Encode { json, binary } => {
            let hstore: Hstore =
                serde_json::from_str(&json).context("Expected a JSON object of strings or nulls")?;
            if binary {
                println!("{}", hex::encode(encode_binary(&hstore)?));
            } else {
                println!("{}", encode_text(&hstore));
            }
        }
        Commands::Resolve { install } => resolve(&settings, install).await?,
        Commands::Roundtrip { input } => roundtrip(&settings, &input).await?,
    }

    Ok(())
}

async fn resolve(settings: &Settings, install: bool) -> Result<()> {
    let db = settings.connect().await?;
    if install {
        db.install_extension().await?;
        println!("{} extension installed", "✓".green());
    }

    match db.resolve_named(&settings.type_name).await {
        Ok(id) => {
            let format = db.registry().preferred_format(id.oid());
            println!(
                "{} {} {}",
                settings.type_name.white().bold(),
                "oid".dimmed(),
                id.to_string().cyan()
            );
            println!("  {} {:?}", "preferred format:".dimmed(), format);
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::TypeNotInstalled => {
            eprintln!(
                "{}",
                "⚠ Run with --install or execute CREATE EXTENSION hstore".yellow()
            );
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn roundtrip(settings: &Settings, input: &str) -> Result<()> {
    let local = decode_text(input)?;
    println!("{}", "Local decode:".green().bold());
    print_hstore(&local, settings.format);

    let db = settings.connect().await?;
    let id = db.resolve_named(&settings.type_name).await?;
    println!("{} {}", "hstore oid:".dimmed(), id.to_string().cyan());

    let binary = db.echo(&local).await?;
    let parsed = db.echo_text(input).await?;

    println!();
    println!("{}", "Sent as binary parameter:".green().bold());
    print_hstore(&binary, settings.format);
    report_match(&local, &binary);

    println!();
    println!("{}", "Parsed by the server from text:".green().bold());
    print_hstore(&parsed, settings.format);
    report_match(&local, &parsed);

    Ok(())
}

fn report_match(expected: &Hstore, actual: &Hstore) {
    if expected == actual {
        println!("{} matches local decode", "✓".green());
    } else {
        println!("{} differs from local decode", "✗".red());
    }
}

fn print_hstore(hstore: &Hstore, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(hstore).unwrap_or_default());
        }
        OutputFormat::Table => {
            if hstore.is_empty() {
                println!("{}", "(empty)".dimmed());
                return;
            }

            let key_width = hstore
                .keys()
                .map(|k| k.chars().count())
                .max()
                .unwrap_or(0)
                .max("key".len());

            let header = format!("{:key_width$} │ value", "key");
            println!("{}", header.white().bold());
            println!("{}", format!("{}─┼─{}", "─".repeat(key_width), "─".repeat(5)).dimmed());

            for (key, value) in hstore.iter() {
                let value = match value {
                    Some(v) => v.normal(),
                    None => "NULL".dimmed(),
                };
                println!("{:key_width$} │ {}", key, value);
            }

            println!();
            println!("{} pair(s)", hstore.len().to_string().cyan());
        }
    }
}
