use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use futures_util::future::join_all;
use ritual_db::Database;
use ritual_telegram::{BotApi, ReplyMarkup};
use ritual_types::{ReminderTime, local_wall_time};
use tracing::{debug, info, warn};

use crate::menus::{self, html_escape};
use crate::state::AppState;

/// Delivery seam for due reminders. Production talks to the Bot API;
/// tests record calls instead.
pub trait ReminderNotifier {
    fn remind(
        &self,
        owner_id: i64,
        habit_id: i64,
        habit_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

pub struct TelegramNotifier<'a> {
    pub api: &'a BotApi,
}

impl ReminderNotifier for TelegramNotifier<'_> {
    async fn remind(&self, owner_id: i64, habit_id: i64, habit_name: &str) -> Result<()> {
        let text = format!("🔔 <b>Time for: {}</b>", html_escape(habit_name));
        let markup = ReplyMarkup::Inline(menus::reminder_actions(habit_id));
        self.api.send_message(owner_id, &text, Some(&markup)).await?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub scanned: usize,
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// One pass over every armed habit: deliver to those whose owner's wall
/// clock reads exactly the reminder minute at `now_utc`. Deliveries run
/// concurrently and a failure for one user never blocks the others.
pub async fn dispatch_tick<N: ReminderNotifier>(
    db: &Database,
    notifier: &N,
    now_utc: DateTime<Utc>,
) -> Result<TickSummary> {
    let rows = db.reminder_scan()?;
    let mut summary = TickSummary {
        scanned: rows.len(),
        ..TickSummary::default()
    };

    let mut deliveries = Vec::new();
    for row in &rows {
        let at: ReminderTime = match row.time_text.parse() {
            Ok(at) => at,
            Err(_) => {
                debug!("Skipping habit {} with unreadable reminder '{}'", row.habit_id, row.time_text);
                continue;
            }
        };

        let offset = match db.get_timezone_offset(row.owner_id) {
            Ok(offset) => offset,
            Err(e) => {
                warn!("No offset for user {}: {}", row.owner_id, e);
                continue;
            }
        };

        if local_wall_time(now_utc, offset) == at {
            summary.due += 1;
            deliveries.push(async move {
                notifier
                    .remind(row.owner_id, row.habit_id, &row.name)
                    .await
                    .map_err(|e| (row.habit_id, row.owner_id, e))
            });
        }
    }

    for result in join_all(deliveries).await {
        match result {
            Ok(()) => summary.delivered += 1,
            Err((habit_id, owner_id, e)) => {
                summary.failed += 1;
                warn!("Reminder for habit {} (user {}) failed: {}", habit_id, owner_id, e);
            }
        }
    }

    Ok(summary)
}

/// Ticks once per minute, aligned to minute boundaries. Minutes spent
/// asleep or blocked are gone; there is no backfill.
pub async fn run_reminder_loop(state: AppState) {
    loop {
        tokio::time::sleep(until_next_minute(Utc::now())).await;

        let notifier = TelegramNotifier { api: &state.api };
        match dispatch_tick(&state.db, &notifier, Utc::now()).await {
            Ok(summary) => {
                if summary.due > 0 {
                    info!(
                        "Reminder tick: {} due of {} armed, {} delivered, {} failed",
                        summary.due, summary.scanned, summary.delivered, summary.failed
                    );
                }
            }
            Err(e) => {
                warn!("Reminder tick error: {}", e);
            }
        }
    }
}

/// Time until the next minute boundary. Never zero, so the loop cannot
/// spin on a boundary hit.
fn until_next_minute(now: DateTime<Utc>) -> std::time::Duration {
    let into = u64::from(now.second()) * 1000 + u64::from(now.timestamp_subsec_millis());
    std::time::Duration::from_millis(60_000u64.saturating_sub(into).max(1))
}
