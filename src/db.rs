use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_records(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            term TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            class_weight REAL NOT NULL,
            exam_weight REAL NOT NULL,
            class_percentage REAL NOT NULL DEFAULT 0,
            exam_percentage REAL NOT NULL DEFAULT 0,
            total_score REAL NOT NULL DEFAULT 0,
            max_total_score REAL NOT NULL DEFAULT 0,
            percentage REAL NOT NULL DEFAULT 0,
            letter_grade TEXT NOT NULL DEFAULT 'F',
            grade_point REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'fail',
            rank_position INTEGER,
            rank_total INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(student_id, class_id, subject, term, academic_year)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_records_scope
         ON grade_records(class_id, subject, term, academic_year)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_records_student_term
         ON grade_records(student_id, term, academic_year)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS score_entries(
            id TEXT PRIMARY KEY,
            grade_record_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            category TEXT NOT NULL,
            title TEXT NOT NULL,
            score REAL NOT NULL,
            max_score REAL NOT NULL,
            date TEXT NOT NULL,
            comment TEXT,
            FOREIGN KEY(grade_record_id) REFERENCES grade_records(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_score_entries_record
         ON score_entries(grade_record_id, kind, sort_order)",
        [],
    )?;

    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}
