use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                salt        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE collections (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- father_id has no foreign key: subtree deletion removes a parent
            -- before its children.
            CREATE TABLE pictos (
                id              TEXT PRIMARY KEY,
                speech          TEXT NOT NULL,
                meaning         TEXT NOT NULL,
                folder          INTEGER NOT NULL DEFAULT 0,
                father_id       TEXT,
                path            TEXT NOT NULL,
                user_id         TEXT NOT NULL REFERENCES users(id),
                collection_id   TEXT REFERENCES collections(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_pictos_father ON pictos(user_id, father_id);
            CREATE INDEX idx_pictos_collection ON pictos(user_id, collection_id);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    Ok(())
}
