//! CLI module - command-line interface for labtrack
//!
//! Serving the web UI is the default; the other commands are operator tools
//! that work directly on the configured database.

mod commands;

use clap::{Parser, Subcommand};

/// labtrack - shared lab machine occupancy tracker
#[derive(Parser)]
#[command(name = "labtrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage the machine inventory
    Machine {
        #[command(subcommand)]
        command: MachineCommands,
    },

    /// Show usage logs for one UTC day
    Logs {
        /// Day to show, as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create an account with any role, e.g. the first manager
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Change the role of an account
    Promote {
        email: String,
        /// assigner or manager
        role: String,
    },
    /// List all accounts
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand)]
pub enum MachineCommands {
    /// Register a free machine
    Add { ip: String },
    /// Remove a machine and everything on it, without logging
    #[command(alias = "rm")]
    Remove { ip: String },
    /// Show every machine and who is on it
    #[command(alias = "ls")]
    List,
}

pub use commands::*;
