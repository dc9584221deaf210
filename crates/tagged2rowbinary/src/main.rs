use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tagged2rowbinary::{build_parser, init_tracing, Converter};
use tagged2rowbinary_config::RuntimeConfig;
use tracing::info;

/// Convert tagged metric point files into RowBinary rows for the tagged index table
#[derive(Parser)]
#[command(name = "tagged2rowbinary")]
#[command(version)]
#[command(about = "Convert tagged metric point files into RowBinary rows for the tagged index table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Output directory for .rowbinary files (overrides config file)
    #[arg(short, long, value_name = "DIR", global = true)]
    output: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert point files, one .rowbinary output per input
    Convert {
        /// Point files, processed in the given order
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,
    },
    /// Print the insert query for the configured table layout
    Query,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Load base configuration
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_file_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load().context("Failed to load configuration")?
    };

    // Step 2: Apply CLI overrides (highest priority)
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    init_tracing(&config.logging);

    match cli.command {
        Commands::Convert { files } => run_convert(&config, &files),
        Commands::Query => {
            println!("{}", build_parser(&config).insert_query());
            Ok(())
        }
    }
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

fn run_convert(config: &RuntimeConfig, files: &[PathBuf]) -> Result<()> {
    let mut converter = Converter::new(config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        table = %config.tagged.table,
        output = %config.output.path.display(),
        cache = config.cache.enabled,
        "starting conversion"
    );

    println!("{}", converter.parser().insert_query());
    let report = converter.run(files)?;
    for file in &report.files {
        if let Ok(converted) = &file.result {
            println!(
                "{}\t{}",
                converted.output.display(),
                converted.summary.rows_written
            );
        }
    }

    let failed = report.failed();
    if failed > 0 {
        bail!("{} of {} files failed to convert", failed, report.files.len());
    }
    Ok(())
}
