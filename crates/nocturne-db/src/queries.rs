use crate::Database;
use crate::models::{QueueEntryRow, RoomMembership, RoomRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use nocturne_types::SELF_END_CAP;

impl Database {
    // -- Queue --

    pub fn insert_queue_entry(
        &self,
        id: &str,
        token: &str,
        identity: &str,
        preference: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO queue (id, token, identity, preference, active, joined_at, last_seen)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                params![id, token, identity, preference, now],
            )?;
            Ok(())
        })
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<QueueEntryRow>> {
        self.with_conn(|conn| query_entry(conn, id))
    }

    /// Flip an entry inactive. A no-op for unknown or already-inactive ids.
    pub fn deactivate_entry(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE queue SET active = 0 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn touch_last_seen(&self, id: &str, now: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE queue SET last_seen = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
    }

    /// Every active entry, oldest join first. Rowid breaks joined_at ties so
    /// the scan order is deterministic.
    pub fn active_candidates_fifo(&self) -> Result<Vec<QueueEntryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, token, identity, preference, active, joined_at, last_seen
                 FROM queue
                 WHERE active = 1
                 ORDER BY joined_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([], map_queue_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Rooms --

    /// The room holding this entry on either side, if one was ever created.
    /// The claim transaction guarantees at most one exists.
    pub fn find_room_for_entry(&self, entry_id: &str) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, entry_a, entry_b, started_at, ended_at, ended_by_token,
                            ended_by_side, last_message_at, message_count
                     FROM rooms
                     WHERE entry_a = ?1 OR entry_b = ?1",
                )?
                .query_row([entry_id], map_room_row)
                .optional()?;

            Ok(row)
        })
    }

    /// Claim both entries and create the room in one transaction. The
    /// conditional UPDATE must hit exactly two active rows; anything less
    /// means another matcher got there first, so everything is rolled back
    /// and `false` reports the lost race.
    pub fn claim_pair_and_create_room(
        &self,
        room_id: &str,
        entry_a: &str,
        entry_b: &str,
        now: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let claimed = tx.execute(
                "UPDATE queue SET active = 0 WHERE id IN (?1, ?2) AND active = 1",
                params![entry_a, entry_b],
            )?;
            if claimed != 2 {
                tx.rollback()?;
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO rooms (id, entry_a, entry_b, started_at) VALUES (?1, ?2, ?3, ?4)",
                params![room_id, entry_a, entry_b, now],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_room(&self, id: &str) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, entry_a, entry_b, started_at, ended_at, ended_by_token,
                            ended_by_side, last_message_at, message_count
                     FROM rooms
                     WHERE id = ?1",
                )?
                .query_row([id], map_room_row)
                .optional()?;

            Ok(row)
        })
    }

    /// Room plus the tokens of both entries, resolved in a single query.
    pub fn get_room_membership(&self, id: &str) -> Result<Option<RoomMembership>> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT r.id, r.entry_a, r.entry_b, r.started_at, r.ended_at,
                            r.ended_by_token, r.ended_by_side, r.last_message_at,
                            r.message_count, qa.token, qb.token
                     FROM rooms r
                     JOIN queue qa ON qa.id = r.entry_a
                     JOIN queue qb ON qb.id = r.entry_b
                     WHERE r.id = ?1",
                )?
                .query_row([id], |row| {
                    Ok(RoomMembership {
                        room: map_room_row(row)?,
                        token_a: row.get(9)?,
                        token_b: row.get(10)?,
                    })
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Write-once end. `by_token`/`by_side` are NULL for a system end.
    /// Returns false when the room was already ended; the existing ended_*
    /// fields are never overwritten.
    pub fn end_room(
        &self,
        id: &str,
        now: &str,
        by_token: Option<&str>,
        by_side: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE rooms
                 SET ended_at = ?2, ended_by_token = ?3, ended_by_side = ?4
                 WHERE id = ?1 AND ended_at IS NULL",
                params![id, now, by_token, by_side],
            )?;
            Ok(n == 1)
        })
    }

    /// Record message traffic on a room. Best-effort bookkeeping; callers
    /// ignore the result beyond logging.
    pub fn touch_room_message(&self, id: &str, now: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE rooms
                 SET last_message_at = ?2, message_count = message_count + 1
                 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
    }

    // -- Night limits --

    /// Self-end count for (token, date), materializing the zero row on
    /// first sight.
    pub fn night_count(&self, token: &str, date: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            ensure_limit_row(conn, token, date)?;
            let count = conn.query_row(
                "SELECT self_end_count FROM night_limits WHERE token = ?1 AND night_date = ?2",
                params![token, date],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Increment with the cap folded into the UPDATE itself, so concurrent
    /// callers cannot push the count past the cap. Returns the new count,
    /// or None when the cap already held.
    pub fn increment_night_count(&self, token: &str, date: &str) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            ensure_limit_row(conn, token, date)?;
            let n = conn.execute(
                "UPDATE night_limits
                 SET self_end_count = self_end_count + 1
                 WHERE token = ?1 AND night_date = ?2 AND self_end_count < ?3",
                params![token, date, SELF_END_CAP],
            )?;
            if n == 0 {
                return Ok(None);
            }
            let count = conn.query_row(
                "SELECT self_end_count FROM night_limits WHERE token = ?1 AND night_date = ?2",
                params![token, date],
                |row| row.get(0),
            )?;
            Ok(Some(count))
        })
    }
}

fn ensure_limit_row(conn: &Connection, token: &str, date: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO night_limits (token, night_date, self_end_count) VALUES (?1, ?2, 0)",
        params![token, date],
    )?;
    Ok(())
}

fn query_entry(conn: &Connection, id: &str) -> Result<Option<QueueEntryRow>> {
    let row = conn
        .prepare(
            "SELECT id, token, identity, preference, active, joined_at, last_seen
             FROM queue
             WHERE id = ?1",
        )?
        .query_row([id], map_queue_row)
        .optional()?;

    Ok(row)
}

fn map_queue_row(row: &Row<'_>) -> rusqlite::Result<QueueEntryRow> {
    Ok(QueueEntryRow {
        id: row.get(0)?,
        token: row.get(1)?,
        identity: row.get(2)?,
        preference: row.get(3)?,
        active: row.get(4)?,
        joined_at: row.get(5)?,
        last_seen: row.get(6)?,
    })
}

fn map_room_row(row: &Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: row.get(0)?,
        entry_a: row.get(1)?,
        entry_b: row.get(2)?,
        started_at: row.get(3)?,
        ended_at: row.get(4)?,
        ended_by_token: row.get(5)?,
        ended_by_side: row.get(6)?,
        last_message_at: row.get(7)?,
        message_count: row.get(8)?,
    })
}
