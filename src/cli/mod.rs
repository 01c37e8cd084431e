//! CLI module - Command-line interface for modhub
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// modhub - mod catalog server
#[derive(Parser)]
#[command(name = "modhub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API with background jobs (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Clear every expired user and admin token now
    SweepTokens,

    /// Delete audit log rows older than the given number of days
    CleanupLogs {
        /// Days of logs to keep (1-365)
        #[arg(long, default_value = "30")]
        days: u32,
    },

    /// Generate a new random password for an administrator
    ResetAdminPassword {
        /// Admin username (defaults to the configured bootstrap admin)
        #[arg(long)]
        username: Option<String>,
    },
}

pub use commands::*;
