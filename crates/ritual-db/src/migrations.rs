use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS habits (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL,
            name            TEXT NOT NULL,
            frequency       TEXT NOT NULL,
            reminder_time   TEXT,
            done_count      INTEGER NOT NULL DEFAULT 0,
            skip_count      INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (date('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_habits_owner
            ON habits(user_id);

        -- utc_offset stays NULL until the user confirms their timezone;
        -- readers substitute the default offset for NULL.
        CREATE TABLE IF NOT EXISTS users (
            user_id         INTEGER PRIMARY KEY,
            sheet_ref       TEXT,
            utc_offset      INTEGER,
            tz_confirmed    INTEGER NOT NULL DEFAULT 0
        );
        ",
    )?;

    info!("Habit schema ready");
    Ok(())
}
