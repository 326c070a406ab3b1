//! Table definitions and forward-only migrations.
//!
//! Migrations are additive only: a later version may add a column with a
//! default value, never drop or rename one, so a store file written by an
//! older binary keeps opening cleanly. Column additions are applied by
//! probing `PRAGMA table_info` rather than assumed from `CREATE TABLE IF NOT
//! EXISTS`, since that statement is a no-op against a table that already
//! exists from an earlier schema version.

use rusqlite::Connection;

/// Creates all tables and indexes if absent, then applies any additive
/// column migrations required by this binary's schema version.
///
/// # Errors
///
/// Propagates any `rusqlite` error encountered while executing DDL.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            sender          TEXT NOT NULL,
            content         TEXT NOT NULL,
            timestamp       INTEGER NOT NULL,
            read            INTEGER NOT NULL DEFAULT 0,
            reply_to        TEXT,
            priority        TEXT NOT NULL DEFAULT 'normal',
            metadata        TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_messages_read ON messages(read);
        CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp);
        CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender);

        CREATE TABLE IF NOT EXISTS tasks (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            description     TEXT,
            status          TEXT NOT NULL DEFAULT 'pending',
            assigned_to     TEXT NOT NULL,
            created_by      TEXT NOT NULL,
            priority        TEXT NOT NULL DEFAULT 'normal',
            progress        INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL,
            started_at      INTEGER,
            completed_at    INTEGER,
            error_message   TEXT,
            result          TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_assigned_to ON tasks(assigned_to);
        CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);

        CREATE TABLE IF NOT EXISTS waiting_agents (
            agent_id        TEXT PRIMARY KEY,
            agent_type      TEXT NOT NULL,
            capabilities    TEXT,
            status          TEXT NOT NULL DEFAULT 'idle',
            current_task_id TEXT,
            waiting_since   INTEGER NOT NULL,
            heartbeat       INTEGER NOT NULL,
            is_online       INTEGER NOT NULL DEFAULT 1,
            last_disconnect INTEGER
        );
        ",
    )?;

    // `session_id` postdates the initial schema: a store file created
    // before this column existed still has a `messages` table, so
    // `CREATE TABLE IF NOT EXISTS` above leaves it untouched and this
    // probe-and-add step is what actually brings it current.
    ensure_column(conn, "messages", "session_id", "TEXT")?;
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id);")?;

    Ok(())
}

/// Adds `column` to `table` with type `ddl_type` unless it is already
/// present, probed via `PRAGMA table_info`.
///
/// # Errors
///
/// Propagates any `rusqlite` error encountered while probing or altering.
fn ensure_column(conn: &Connection, table: &str, column: &str, ddl_type: &str) -> rusqlite::Result<()> {
    let has_column = {
        let mut probe = conn.prepare(&format!("PRAGMA table_info({table})"))?;
        probe
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<String>>>()?
            .iter()
            .any(|existing| existing == column)
    };

    if !has_column {
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {ddl_type};"))?;
    }
    Ok(())
}
