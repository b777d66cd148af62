use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use ritual_db::Database;
use ritual_sheets::SheetsClient;
use ritual_types::Outcome;
use tracing::warn;

/// Mirror seam for recorded outcomes. Production appends to the owner's
/// spreadsheet; tests capture rows or fail on purpose.
pub trait OutcomeSink {
    fn append_outcome(
        &self,
        sheet_ref: &str,
        columns: &[String],
    ) -> impl Future<Output = Result<()>> + Send;
}

impl OutcomeSink for SheetsClient {
    async fn append_outcome(&self, sheet_ref: &str, columns: &[String]) -> Result<()> {
        self.append_row(sheet_ref, columns).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// Habit gone, or owned by someone else.
    NotFound,
    Saved { habit_name: String, mirror: Mirror },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    /// Mirroring disabled or no sheet connected.
    Off,
    Written,
    Failed,
}

/// Count an outcome, then best-effort mirror it. The local count is the
/// source of truth; a mirror failure downgrades `mirror` but never the
/// save itself. The mirrored row is stamped in the owner's local time.
pub async fn record_outcome<S: OutcomeSink>(
    db: &Database,
    sink: Option<&S>,
    user_id: i64,
    habit_id: i64,
    outcome: Outcome,
    now_utc: DateTime<Utc>,
) -> Result<Recorded> {
    let Some(habit) = db.get_habit(habit_id, user_id)? else {
        return Ok(Recorded::NotFound);
    };

    if !db.increment_outcome(habit_id, user_id, outcome)? {
        // Deleted between the fetch and the update.
        return Ok(Recorded::NotFound);
    }

    let mirror = match (sink, db.get_sheet_reference(user_id)?) {
        (Some(sink), Some(sheet_ref)) => {
            let offset = db.get_timezone_offset(user_id)?;
            let local = now_utc + Duration::hours(i64::from(offset));
            let columns = vec![
                local.format("%Y-%m-%d").to_string(),
                local.format("%H:%M").to_string(),
                habit.name.clone(),
                outcome.label().to_string(),
            ];
            match sink.append_outcome(&sheet_ref, &columns).await {
                Ok(()) => Mirror::Written,
                Err(e) => {
                    warn!("Sheet mirror for user {} failed: {}", user_id, e);
                    Mirror::Failed
                }
            }
        }
        _ => Mirror::Off,
    };

    Ok(Recorded::Saved { habit_name: habit.name, mirror })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        rows: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl OutcomeSink for RecordingSink {
        async fn append_outcome(&self, sheet_ref: &str, columns: &[String]) -> Result<()> {
            self.rows.lock().unwrap().push((sheet_ref.to_string(), columns.to_vec()));
            Ok(())
        }
    }

    struct FailingSink;

    impl OutcomeSink for FailingSink {
        async fn append_outcome(&self, _sheet_ref: &str, _columns: &[String]) -> Result<()> {
            anyhow::bail!("503 backend unavailable")
        }
    }

    const SHEET: &str = "https://docs.google.com/spreadsheets/d/abc123/edit";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 21, 40, 0).unwrap()
    }

    #[tokio::test]
    async fn count_survives_a_sink_failure() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_habit(10, "Read", "Every day", None).unwrap();
        db.set_sheet_reference(10, SHEET).unwrap();

        let recorded = record_outcome(&db, Some(&FailingSink), 10, id, Outcome::Done, now())
            .await
            .unwrap();

        assert_eq!(
            recorded,
            Recorded::Saved { habit_name: "Read".to_string(), mirror: Mirror::Failed }
        );
        assert_eq!(db.get_habit(id, 10).unwrap().unwrap().done_count, 1);
    }

    #[tokio::test]
    async fn mirrors_the_row_in_owner_local_time() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_habit(10, "Read", "Every day", None).unwrap();
        db.set_timezone(10, 5).unwrap();
        db.set_sheet_reference(10, SHEET).unwrap();

        let sink = RecordingSink::default();
        let recorded = record_outcome(&db, Some(&sink), 10, id, Outcome::Done, now())
            .await
            .unwrap();

        assert_eq!(
            recorded,
            Recorded::Saved { habit_name: "Read".to_string(), mirror: Mirror::Written }
        );

        // 21:40 UTC on the 16th is 02:40 on the 17th at UTC+5.
        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, SHEET);
        assert_eq!(rows[0].1, ["2025-06-17", "02:40", "Read", "DONE"]);
    }

    #[tokio::test]
    async fn skip_uses_its_own_counter_and_label() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_habit(10, "Read", "Every day", None).unwrap();
        db.set_sheet_reference(10, SHEET).unwrap();

        let sink = RecordingSink::default();
        record_outcome(&db, Some(&sink), 10, id, Outcome::Skip, now()).await.unwrap();

        let habit = db.get_habit(id, 10).unwrap().unwrap();
        assert_eq!(habit.done_count, 0);
        assert_eq!(habit.skip_count, 1);
        assert_eq!(sink.rows.lock().unwrap()[0].1[3], "SKIPPED");
    }

    #[tokio::test]
    async fn foreign_habit_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_habit(10, "Read", "Every day", None).unwrap();

        let sink = RecordingSink::default();
        let recorded = record_outcome(&db, Some(&sink), 11, id, Outcome::Done, now())
            .await
            .unwrap();

        assert_eq!(recorded, Recorded::NotFound);
        assert_eq!(db.get_habit(id, 10).unwrap().unwrap().done_count, 0);
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_sheet_connected_means_mirror_off() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_habit(10, "Read", "Every day", None).unwrap();

        let sink = RecordingSink::default();
        let recorded = record_outcome(&db, Some(&sink), 10, id, Outcome::Done, now())
            .await
            .unwrap();

        assert_eq!(
            recorded,
            Recorded::Saved { habit_name: "Read".to_string(), mirror: Mirror::Off }
        );
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mirroring_disabled_means_mirror_off() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_habit(10, "Read", "Every day", None).unwrap();
        db.set_sheet_reference(10, SHEET).unwrap();

        let sink: Option<&RecordingSink> = None;
        let recorded = record_outcome(&db, sink, 10, id, Outcome::Done, now()).await.unwrap();

        assert_eq!(
            recorded,
            Recorded::Saved { habit_name: "Read".to_string(), mirror: Mirror::Off }
        );
        assert_eq!(db.get_habit(id, 10).unwrap().unwrap().done_count, 1);
    }
}
