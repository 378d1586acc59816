mod calc;
mod config;
mod db;
mod error;
mod http;
mod ipc;
mod logging;
mod model;
mod rank;
mod report;
mod requests;
mod service;
mod settings;
mod store;

use anyhow::Context;
use clap::Parser;
use config::{Cli, Command};
use std::io::{self, BufRead, Write};
use std::path::Path;

fn run_sidecar(workspace: Option<&Path>) -> anyhow::Result<()> {
    let mut state = ipc::AppState::default();
    if let Some(path) = workspace {
        state.db = Some(db::open_db(path)?);
        state.workspace = Some(path.to_path_buf());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": error::GradeError::bad_json(e.to_string()).to_json()
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}

fn run_server(
    workspace: Option<&Path>,
    addr: std::net::SocketAddr,
    max_body_bytes: usize,
) -> anyhow::Result<()> {
    let workspace = workspace.context("serve needs --workspace or GRADEBOOK_WORKSPACE")?;
    let conn = db::open_db(workspace)?;
    tracing::info!(workspace = %workspace.display(), "workspace opened");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("tokio runtime failed")?;
    runtime.block_on(http::serve(conn, addr, max_body_bytes))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match cli.command {
        None => run_sidecar(cli.workspace.as_deref()),
        Some(Command::Serve {
            addr,
            max_body_bytes,
        }) => run_server(cli.workspace.as_deref(), addr, max_body_bytes),
    }
}
