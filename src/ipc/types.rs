use std::path::PathBuf;

use crate::error::{db_err, GradeError};
use crate::settings::{self, GradingSettings};
use crate::store::{in_transaction, SqliteStore};
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

fn no_workspace() -> GradeError {
    GradeError::storage("no_workspace", "select a workspace first")
}

impl AppState {
    pub fn conn(&self) -> Result<&Connection, GradeError> {
        self.db.as_ref().ok_or_else(no_workspace)
    }

    /// Run a read against the open workspace.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&SqliteStore<'_>) -> Result<T, GradeError>,
    ) -> Result<T, GradeError> {
        let store = SqliteStore::new(self.conn()?);
        f(&store)
    }

    /// Run a mutation in one transaction, with the workspace grading
    /// settings loaded first.
    pub fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut SqliteStore<'_>, &GradingSettings) -> Result<T, GradeError>,
    ) -> Result<T, GradeError> {
        let conn = self.db.as_mut().ok_or_else(no_workspace)?;
        let grading = settings::load_grading(conn).map_err(db_err("db_query_failed"))?;
        in_transaction(conn, |store| f(store, &grading))
    }
}
