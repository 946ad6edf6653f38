//! cgframe CLI
//!
//! Inspect, restructure, compare and render call-graph profiles stored as
//! JSON literal documents.

use anyhow::Result;
use callgraph_frame::commands::{
    display_summary, display_version, execute_combine, execute_filter, execute_flamegraph,
    execute_normalize, validate_literal_file, CombineArgs, FilterArgs, FlamegraphArgs,
};
use callgraph_frame::flamegraph::FlamegraphConfig;
use callgraph_frame::graphframe::BinaryOp;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

/// cgframe - call-graph profile algebra
#[derive(Parser, Debug)]
#[command(name = "cgframe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print node, root and row counts plus per-root totals
    Summary {
        /// Path to literal JSON document
        file: PathBuf,
    },

    /// Keep rows whose metric reaches a threshold
    Filter {
        /// Path to literal JSON document
        file: PathBuf,

        /// Metric to compare
        #[arg(short, long, default_value = "time")]
        metric: String,

        /// Minimum value kept
        #[arg(long)]
        min: f64,

        /// Keep the original graph instead of squashing it
        #[arg(long)]
        no_squash: bool,

        /// Output path
        #[arg(short, long, default_value = "filtered.json")]
        output: PathBuf,
    },

    /// Merge sibling nodes with identical frames
    Normalize {
        /// Path to literal JSON document
        file: PathBuf,

        /// Output path
        #[arg(short, long, default_value = "normalized.json")]
        output: PathBuf,
    },

    /// Subtract the right profile from the left one
    Diff {
        left: PathBuf,
        right: PathBuf,

        /// Output path
        #[arg(short, long, default_value = "diff.json")]
        output: PathBuf,
    },

    /// Add two profiles node by node
    Add {
        left: PathBuf,
        right: PathBuf,

        /// Output path
        #[arg(short, long, default_value = "sum.json")]
        output: PathBuf,
    },

    /// Render an SVG flamegraph
    Flamegraph {
        /// Path to literal JSON document
        file: PathBuf,

        /// Metric for frame widths (defaults to the first exclusive metric)
        #[arg(short, long)]
        metric: Option<String>,

        /// Output path for the SVG
        #[arg(short, long, default_value = "flamegraph.svg")]
        output: PathBuf,

        /// Also write folded stacks to this path
        #[arg(long)]
        folded: Option<PathBuf>,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200", env = "CGFRAME_WIDTH")]
        width: usize,
    },

    /// Validate a literal JSON document
    Validate {
        /// Path to literal JSON document
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Summary { file } => {
            display_summary(&file)?;
        }

        Commands::Filter {
            file,
            metric,
            min,
            no_squash,
            output,
        } => {
            execute_filter(&FilterArgs {
                input: file,
                metric,
                min,
                squash: !no_squash,
                output,
            })?;
        }

        Commands::Normalize { file, output } => {
            execute_normalize(&file, &output)?;
        }

        Commands::Diff {
            left,
            right,
            output,
        } => {
            execute_combine(&CombineArgs {
                left,
                right,
                op: BinaryOp::Sub,
                output,
            })?;
        }

        Commands::Add {
            left,
            right,
            output,
        } => {
            execute_combine(&CombineArgs {
                left,
                right,
                op: BinaryOp::Add,
                output,
            })?;
        }

        Commands::Flamegraph {
            file,
            metric,
            output,
            folded,
            title,
            width,
        } => {
            let mut config = FlamegraphConfig::new().with_width(width);
            if let Some(title) = title {
                config = config.with_title(title);
            }
            if let Some(metric) = &metric {
                config = config.with_count_name(metric.clone());
            }

            execute_flamegraph(&FlamegraphArgs {
                input: file,
                metric,
                output,
                folded,
                config,
            })?;
        }

        Commands::Validate { file } => {
            validate_literal_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
