//! HTTP surface over the same grade operations the sidecar exposes.
//!
//! rusqlite connections are blocking, so every request hops onto the
//! blocking pool and takes the workspace connection behind a mutex. That
//! also serializes mutations, which keeps sibling re-ranking consistent.

mod handlers;

use crate::error::{db_err, GradeError};
use crate::settings::{self, GradingSettings};
use crate::store::{in_transaction, SqliteStore};
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use rusqlite::Connection;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct HttpState {
    db: Arc<Mutex<Connection>>,
}

impl HttpState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, GradeError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, GradeError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|_| GradeError::storage("db_lock_failed", "database lock poisoned"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| GradeError::storage("internal", format!("blocking task failed: {e}")))?
    }

    async fn read<T, F>(&self, f: F) -> Result<T, GradeError>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteStore<'_>) -> Result<T, GradeError> + Send + 'static,
    {
        self.with_conn(move |conn| f(&SqliteStore::new(conn))).await
    }

    async fn mutate<T, F>(&self, f: F) -> Result<T, GradeError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteStore<'_>, &GradingSettings) -> Result<T, GradeError>
            + Send
            + 'static,
    {
        self.with_conn(move |conn| {
            let grading = settings::load_grading(conn).map_err(db_err("db_query_failed"))?;
            in_transaction(conn, |store| f(store, &grading))
        })
        .await
    }
}

pub fn build_router(state: HttpState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/grades", get(handlers::list_grades))
        .route("/grades/class-score", post(handlers::add_class_score))
        .route("/grades/exam-score", post(handlers::add_exam_score))
        .route("/grades/recompute", post(handlers::recompute))
        .route(
            "/grades/report-card/:studentId/:term/:academicYear",
            get(handlers::report_card),
        )
        .route(
            "/grades/rankings/:classId/:subject/:term/:academicYear",
            get(handlers::class_ranking),
        )
        .route("/grades/:id", get(handlers::get_grade))
        .route("/grades/:id/weights", put(handlers::update_weights))
        .route("/grades/:id/score/:scoreId", put(handlers::update_score))
        .route(
            "/grades/:id/score/:scoreId/:scoreType",
            delete(handlers::delete_score),
        )
        .route(
            "/settings/grading",
            get(handlers::get_grading).put(handlers::update_grading),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown requested");
}

/// Bind `addr`, announce the bound address on stdout, and serve until ctrl-c.
pub async fn serve(
    conn: Connection,
    addr: SocketAddr,
    max_body_bytes: usize,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind failed: {addr}"))?;
    let local = listener.local_addr().context("local_addr failed")?;
    println!("{}", json!({ "listening": local.to_string() }));
    tracing::info!(addr = %local, max_body_bytes, "gradebookd listening");

    axum::serve(listener, build_router(HttpState::new(conn), max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")
}
