//! Command-line and environment configuration.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:7878";
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the grade operations over HTTP instead of stdin/stdout.
    Serve {
        /// Address to bind; port 0 picks a free port.
        #[arg(long, env = "GRADEBOOK_ADDR", default_value = DEFAULT_ADDR)]
        addr: SocketAddr,

        /// Largest accepted request body.
        #[arg(long, env = "GRADEBOOK_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
        max_body_bytes: usize,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "gradebookd",
    about = "Grade records, class ranks and report cards over a SQLite workspace",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Workspace directory holding the grade database. The sidecar can also
    /// pick one later with `workspace.select`.
    #[arg(long, env = "GRADEBOOK_WORKSPACE", value_name = "PATH", global = true)]
    pub workspace: Option<PathBuf>,

    /// Log output format (logs always go to stderr).
    #[arg(long, env = "GRADEBOOK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}
