use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS queue (
            id          TEXT PRIMARY KEY,
            token       TEXT NOT NULL,
            identity    TEXT NOT NULL,
            preference  TEXT NOT NULL,
            active      INTEGER NOT NULL DEFAULT 1,
            joined_at   TEXT NOT NULL,
            last_seen   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_queue_active_joined
            ON queue(active, joined_at);

        CREATE INDEX IF NOT EXISTS idx_queue_token
            ON queue(token);

        CREATE TABLE IF NOT EXISTS rooms (
            id              TEXT PRIMARY KEY,
            entry_a         TEXT NOT NULL REFERENCES queue(id),
            entry_b         TEXT NOT NULL REFERENCES queue(id),
            started_at      TEXT NOT NULL,
            ended_at        TEXT,
            ended_by_token  TEXT,
            ended_by_side   TEXT,
            last_message_at TEXT,
            message_count   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_rooms_entry_a
            ON rooms(entry_a);

        CREATE INDEX IF NOT EXISTS idx_rooms_entry_b
            ON rooms(entry_b);

        CREATE TABLE IF NOT EXISTS night_limits (
            token           TEXT NOT NULL,
            night_date      TEXT NOT NULL,
            self_end_count  INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (token, night_date)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
