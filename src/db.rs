use rusqlite::Connection;
use std::path::Path;

pub const DEFAULT_DB_FILE: &str = "gradebook.sqlite3";

pub fn open_db(workspace: &Path, file_name: &str) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(file_name);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_types(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            name TEXT NOT NULL,
            weight INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assessment_types_subject ON assessment_types(subject_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scores(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            assessment_type_id TEXT NOT NULL,
            value REAL NOT NULL,
            school_year INTEGER NOT NULL,
            semester INTEGER NOT NULL,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            FOREIGN KEY(assessment_type_id) REFERENCES assessment_types(id) ON DELETE CASCADE
        )",
        [],
    )?;
    // Added after the first release; older workspaces lack them.
    ensure_scores_recorded_on(conn)?;
    ensure_scores_note(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_subject ON scores(subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_period ON scores(school_year, semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS final_overrides(
            subject_id TEXT NOT NULL,
            school_year INTEGER NOT NULL,
            semester INTEGER NOT NULL,
            value REAL NOT NULL,
            PRIMARY KEY(subject_id, school_year, semester),
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_final_overrides_period ON final_overrides(school_year, semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS school_year_settings(
            school_year INTEGER PRIMARY KEY,
            grading_scale TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn ensure_scores_recorded_on(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "scores", "recorded_on")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE scores ADD COLUMN recorded_on TEXT", [])?;
    Ok(())
}

fn ensure_scores_note(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "scores", "note")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE scores ADD COLUMN note TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
