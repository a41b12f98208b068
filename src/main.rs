//! lambda-pack CLI
//!
//! Entry point for the `lambda-pack` command-line tool.

use clap::{Parser, Subcommand};
use lambda_pack::iam::PolicyDocument;
use lambda_pack::{build, ArchiveListing, CancelFlag, PackConfig, SourceSpec, EXIT_CODE_CANCELLED};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "lambda-pack")]
#[command(about = "Build Lambda deployment archives", version)]
struct Cli {
    /// Log filter (overrides RUST_LOG and the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a deployment archive
    Build {
        /// Path to config file (default: lambda-pack.toml if present)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Source to add, as PATH or PATH=ROOT (repeatable, replaces config sources)
        #[arg(long, short = 's')]
        source: Vec<String>,

        /// Archive to write
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Deflate single-file sources
        #[arg(long)]
        deflate: bool,

        /// Archive symlink targets instead of rejecting links
        #[arg(long)]
        follow_links: bool,

        /// Output the build report in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the entries of an archive
    List {
        /// Archive to read
        archive: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Decode a policy document and print its canonical encoding
    Policy {
        /// Policy JSON file ("-" for stdin)
        input: String,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            source,
            output,
            deflate,
            follow_links,
            json,
        } => {
            run_build(
                cli.log_level,
                config,
                source,
                output,
                deflate,
                follow_links,
                json,
            );
        }
        Commands::List { archive, json } => {
            init_logging(cli.log_level.as_deref(), "warn");
            run_list(archive, json);
        }
        Commands::Policy { input, pretty } => {
            init_logging(cli.log_level.as_deref(), "warn");
            run_policy(&input, pretty);
        }
    }
}

/// Initialize tracing on stderr.
///
/// Precedence: `--log-level`, then `RUST_LOG`, then `fallback`.
fn init_logging(cli_level: Option<&str>, fallback: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback)),
    }
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

/// Collect CLI flags into a config layer; unset flags leave lower layers alone.
fn cli_overrides(
    sources: &[String],
    output: Option<PathBuf>,
    deflate: bool,
    follow_links: bool,
) -> Result<Value, lambda_pack::ConfigError> {
    let mut layer = Map::new();

    if !sources.is_empty() {
        let specs = sources
            .iter()
            .map(|arg| SourceSpec::parse_arg(arg))
            .collect::<Result<Vec<_>, _>>()?;
        layer.insert("sources".to_string(), json!(specs));
    }
    if let Some(output) = output {
        layer.insert("output".to_string(), json!(output));
    }
    if deflate {
        layer.insert("deflate_single_files".to_string(), json!(true));
    }
    if follow_links {
        layer.insert("follow_links".to_string(), json!(true));
    }

    Ok(Value::Object(layer))
}

fn run_build(
    log_level: Option<String>,
    config_path: Option<PathBuf>,
    sources: Vec<String>,
    output: Option<PathBuf>,
    deflate: bool,
    follow_links: bool,
    json: bool,
) {
    let overrides = match cli_overrides(&sources, output, deflate, follow_links) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let config = match PackConfig::load(config_path.as_deref(), overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    init_logging(log_level.as_deref(), &config.log_level);

    let cancel = CancelFlag::new();
    if let Err(e) = cancel.install_interrupt_handler() {
        eprintln!("Warning: failed to install interrupt handler: {}", e);
    }

    match build(&config, &cancel) {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("Error serializing output: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                println!("{}", report.to_human());
            }
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("Build cancelled: {}", e);
            process::exit(EXIT_CODE_CANCELLED);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_list(archive: PathBuf, json: bool) {
    let listing = match ArchiveListing::from_file(&archive) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error reading {}: {}", archive.display(), e);
            process::exit(1);
        }
    };

    if json {
        match listing.to_json() {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print!("{}", listing.to_human());
        let (files, dirs) = listing.entry_counts();
        println!(
            "{} files, {} directories, {} bytes",
            files,
            dirs,
            listing.total_size()
        );
    }
}

fn run_policy(input: &str, pretty: bool) {
    let bytes = match read_input(input) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {}: {}", input, e);
            process::exit(1);
        }
    };

    let document = match PolicyDocument::from_slice(&bytes) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error decoding policy document: {}", e);
            process::exit(1);
        }
    };

    let encoded = if pretty {
        document.to_json_pretty()
    } else {
        document.to_json()
    };
    match encoded {
        Ok(out) => println!("{}", out),
        Err(e) => {
            eprintln!("Error encoding policy document: {}", e);
            process::exit(1);
        }
    }
}

fn read_input(input: &str) -> io::Result<Vec<u8>> {
    if input == "-" {
        let mut bytes = Vec::new();
        io::stdin().read_to_end(&mut bytes)?;
        Ok(bytes)
    } else {
        fs::read(input)
    }
}
