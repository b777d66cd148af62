use crate::Database;
use crate::models::ReminderRow;
use anyhow::Result;
use chrono::NaiveDate;
use ritual_types::{DEFAULT_UTC_OFFSET, Habit, Outcome, ReminderTime, UserPreference};
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

impl Database {
    // -- Habits --

    pub fn create_habit(
        &self,
        owner_id: i64,
        name: &str,
        frequency: &str,
        reminder_time: Option<ReminderTime>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO habits (user_id, name, frequency, reminder_time) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![owner_id, name, frequency, reminder_time.map(|t| t.to_string())],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn habits_for_owner(&self, owner_id: i64) -> Result<Vec<Habit>> {
        self.with_conn(|conn| query_habits_for_owner(conn, owner_id))
    }

    /// Fetch one habit, scoped to its owner. Asking for another user's
    /// habit looks the same as asking for one that never existed.
    pub fn get_habit(&self, habit_id: i64, owner_id: i64) -> Result<Option<Habit>> {
        self.with_conn(|conn| query_habit(conn, habit_id, owner_id))
    }

    pub fn update_reminder_time(
        &self,
        habit_id: i64,
        owner_id: i64,
        reminder_time: Option<ReminderTime>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE habits SET reminder_time = ?3 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![habit_id, owner_id, reminder_time.map(|t| t.to_string())],
            )?;
            Ok(rows > 0)
        })
    }

    pub fn delete_habit(&self, habit_id: i64, owner_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![habit_id, owner_id],
            )?;
            Ok(rows > 0)
        })
    }

    pub fn increment_outcome(&self, habit_id: i64, owner_id: i64, outcome: Outcome) -> Result<bool> {
        self.with_conn(|conn| {
            let sql = match outcome {
                Outcome::Done => {
                    "UPDATE habits SET done_count = done_count + 1 WHERE id = ?1 AND user_id = ?2"
                }
                Outcome::Skip => {
                    "UPDATE habits SET skip_count = skip_count + 1 WHERE id = ?1 AND user_id = ?2"
                }
            };
            let rows = conn.execute(sql, rusqlite::params![habit_id, owner_id])?;
            Ok(rows > 0)
        })
    }

    /// Every habit with a reminder set, across all owners. Habits whose
    /// reminder is NULL never reach the dispatcher.
    pub fn reminder_scan(&self) -> Result<Vec<ReminderRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, reminder_time
                 FROM habits
                 WHERE reminder_time IS NOT NULL",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(ReminderRow {
                        habit_id: row.get(0)?,
                        owner_id: row.get(1)?,
                        name: row.get(2)?,
                        time_text: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Preferences --

    pub fn ensure_user(&self, user_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("INSERT OR IGNORE INTO users (user_id) VALUES (?1)", [user_id])?;
            Ok(())
        })
    }

    pub fn set_sheet_reference(&self, user_id: i64, sheet_ref: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, sheet_ref) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET sheet_ref = excluded.sheet_ref",
                rusqlite::params![user_id, sheet_ref],
            )?;
            Ok(())
        })
    }

    pub fn get_sheet_reference(&self, user_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let sheet_ref: Option<Option<String>> = conn
                .query_row(
                    "SELECT sheet_ref FROM users WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(sheet_ref.flatten())
        })
    }

    pub fn set_timezone(&self, user_id: i64, offset_hours: i32) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, utc_offset, tz_confirmed) VALUES (?1, ?2, 1)
                 ON CONFLICT(user_id) DO UPDATE SET utc_offset = excluded.utc_offset, tz_confirmed = 1",
                rusqlite::params![user_id, offset_hours],
            )?;
            Ok(())
        })
    }

    /// Offset for reminder math. Users who never confirmed a timezone get
    /// the default.
    pub fn get_timezone_offset(&self, user_id: i64) -> Result<i32> {
        self.with_conn(|conn| {
            let offset: Option<Option<i32>> = conn
                .query_row(
                    "SELECT utc_offset FROM users WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(offset.flatten().unwrap_or(DEFAULT_UTC_OFFSET))
        })
    }

    pub fn is_timezone_confirmed(&self, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let confirmed: Option<bool> = conn
                .query_row(
                    "SELECT tz_confirmed FROM users WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(confirmed.unwrap_or(false))
        })
    }

    pub fn get_preference(&self, user_id: i64) -> Result<Option<UserPreference>> {
        self.with_conn(|conn| query_preference(conn, user_id))
    }
}

fn query_habits_for_owner(conn: &Connection, owner_id: i64) -> Result<Vec<Habit>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, frequency, reminder_time, done_count, skip_count, created_at
         FROM habits
         WHERE user_id = ?1
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map([owner_id], habit_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_habit(conn: &Connection, habit_id: i64, owner_id: i64) -> Result<Option<Habit>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, frequency, reminder_time, done_count, skip_count, created_at
         FROM habits
         WHERE id = ?1 AND user_id = ?2",
    )?;

    let row = stmt
        .query_row(rusqlite::params![habit_id, owner_id], habit_from_row)
        .optional()?;

    Ok(row)
}

fn query_preference(conn: &Connection, user_id: i64) -> Result<Option<UserPreference>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, sheet_ref, utc_offset, tz_confirmed FROM users WHERE user_id = ?1",
    )?;

    let row = stmt
        .query_row([user_id], |row| {
            let offset: Option<i32> = row.get(2)?;
            Ok(UserPreference {
                user_id: row.get(0)?,
                sheet_ref: row.get(1)?,
                utc_offset_hours: offset.unwrap_or(DEFAULT_UTC_OFFSET),
                timezone_confirmed: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn habit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Habit> {
    let id: i64 = row.get(0)?;
    let time_text: Option<String> = row.get(4)?;
    let created_text: String = row.get(7)?;

    Ok(Habit {
        id,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        frequency: row.get(3)?,
        reminder_time: match time_text {
            Some(t) => match t.parse() {
                Ok(at) => Some(at),
                Err(e) => {
                    warn!("Corrupt reminder_time '{}' on habit {}: {}", t, id, e);
                    None
                }
            },
            None => None,
        },
        done_count: row.get(5)?,
        skip_count: row.get(6)?,
        created_at: created_text.parse().unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on habit {}: {}", created_text, id, e);
            NaiveDate::default()
        }),
    })
}
