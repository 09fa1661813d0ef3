use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "carton")]
#[command(author, version, about = "Carton provisioning control plane")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a (category, action) pair and print the resulting operation
    Parse {
        /// Request category, e.g. "state" or "control"
        category: String,

        /// Action within the category, e.g. "create" or "hard-stop"
        action: String,

        /// Target unit id
        target: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one request against the in-memory provisioner
    Run {
        /// Request category
        category: String,

        /// Action within the category
        action: String,

        /// Target unit id
        target: String,

        /// Image to create the machine from (overrides the configured default)
        #[arg(long)]
        image: Option<String>,

        /// Show the plan without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Read JSON requests from stdin, one per line, and process them
    Serve,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
