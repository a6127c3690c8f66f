//! CLI command definitions for tasktree
//!
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod check;

use check::CheckArgs;
use clap::{Parser, Subcommand};

/// Task tree server and maintenance tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve,

    /// Verify that every task's completion flag agrees with its children
    Check(CheckArgs),
}
