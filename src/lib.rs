//! Annopipe: composable stream pipelines for annotated-dataset conversion.
//!
//! Annopipe converts annotated-image/audio datasets between on-disk
//! formats by streaming dataset instances through a typed chain of
//! sources, processors, and sinks. Which domain (object detection,
//! classification, segmentation, speech) flows between two stages is
//! negotiated while the pipeline is built, so an impossible stage
//! sequence fails before any file is touched.
//!
//! # Modules
//!
//! - [`domain`]: the closed set of annotation domains and their instance types
//! - [`stream`]: the `Source`/`Processor`/`Sink` contracts and calling-semantics enforcement
//! - [`pipeline`]: the synchronous, depth-first pipeline executor
//! - [`transfer`]: domain-transfer maps and backward pruning
//! - [`build`]: token splitting and the domain-checked pipeline builder
//! - [`registry`]: stage specifiers and the stage-name registry
//! - [`stages`]: built-in format adapters, filters, and converters
//! - [`error`]: error types for annopipe operations

pub mod build;
pub mod config;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod stream;
pub mod transfer;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use config::PipelineConfig;
pub use error::AnnopipeError;

use domain::{Domain, ImageFormat};
use registry::Registry;

/// The annopipe CLI application.
#[derive(Parser)]
#[command(name = "annopipe")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build and run a conversion pipeline from an ordered stage list.
    Convert(ConvertArgs),
    /// List the registered stages.
    Plugins,
    /// List the supported domains.
    Domains,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Image formats in order of preference, used when writing images
    /// whose own format is unknown.
    #[arg(long, value_delimiter = ',', default_value = "png,jpg,bmp")]
    prefer_format: Vec<ImageFormat>,

    /// Stage names, each followed by its own options, e.g.
    /// `from-roi-csv -i in.csv od-to-ic to-subdir -o out/`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    stages: Vec<String>,
}

/// Run the annopipe CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), AnnopipeError> {
    // Repeated init is fine (tests call run() in-process).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();
    let registry = Registry::with_builtins();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(&registry, args),
        Some(Commands::Plugins) => {
            for spec in registry.iter() {
                println!("{:<20} {:<10} {}", spec.name(), spec.kind(), spec.description());
            }
            Ok(())
        }
        Some(Commands::Domains) => {
            for domain in Domain::ALL {
                println!("{:<18} {}", domain.name(), domain.description());
            }
            Ok(())
        }
        None => {
            println!("annopipe {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Composable stream pipelines for annotated-dataset conversion.");
            println!();
            println!("Run 'annopipe --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the convert subcommand.
fn run_convert(registry: &Registry, args: ConvertArgs) -> Result<(), AnnopipeError> {
    let config = PipelineConfig {
        image_format_preference: args.prefer_format,
    };
    let mut pipeline = build::from_options(registry, config, &args.stages)?;
    pipeline.process()
}
