use anyhow::Result;
use chrono::{DateTime, Utc};
use ritual_telegram::{CallbackQuery, Message, ReplyMarkup, Update};
use ritual_types::{
    Callback, DEFAULT_UTC_OFFSET, Outcome, ReminderTime, UserPreference, resolve_utc_offset,
};
use tracing::{debug, warn};

use crate::dialog::DialogState;
use crate::menus::{self, html_escape};
use crate::outcome::{self, Mirror, Recorded};
use crate::state::AppState;

const HABIT_NAME_MAX: usize = 64;

pub async fn handle_update(state: AppState, update: Update) {
    if let Some(message) = update.message {
        if let Err(e) = handle_message(&state, &message).await {
            warn!("Message handler error: {:#}", e);
        }
    } else if let Some(callback) = update.callback_query {
        if let Err(e) = handle_callback(&state, &callback).await {
            warn!("Callback handler error: {:#}", e);
        }
    }
}

async fn handle_message(state: &AppState, message: &Message) -> Result<()> {
    let chat_id = message.chat.id;
    let Some(user_id) = message.from.as_ref().map(|u| u.id) else {
        return Ok(());
    };
    let Some(text) = message.text.as_deref() else {
        // Stickers, photos, voice notes. Whatever flow was active stays
        // where it was.
        state.api.send_message(chat_id, "I only understand text here 🙂", None).await?;
        return Ok(());
    };
    let text = text.trim();

    match respond_to_message(state, user_id, text, Utc::now()).await? {
        Routed::Reply(reply) => {
            state.api.send_message(chat_id, &reply.text, reply.markup.as_ref()).await?;
            Ok(())
        }
        Routed::SheetLink => handle_sheet_link(state, chat_id, user_id, text).await,
    }
}

#[derive(Debug)]
pub(crate) struct Reply {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
}

pub(crate) enum Routed {
    Reply(Reply),
    /// The sheet-link step checks spreadsheet access and edits its own
    /// status message, so it sends for itself.
    SheetLink,
}

/// Decides what a text message gets back. Everything except the
/// sheet-link step is a single reply, computed here without touching
/// the network.
pub(crate) async fn respond_to_message(
    state: &AppState,
    user_id: i64,
    text: &str,
    now_utc: DateTime<Utc>,
) -> Result<Routed> {
    // /start always aborts whatever flow was active
    if text == "/start" {
        state.sessions.clear(user_id).await;
        return Ok(Routed::Reply(start_reply(state, user_id)?));
    }

    if let Some(dialog) = state.sessions.get(user_id).await {
        if dialog == DialogState::AwaitingSheetLink {
            return Ok(Routed::SheetLink);
        }
        let reply = advance_dialog(state, user_id, dialog, text, now_utc).await?;
        return Ok(Routed::Reply(reply));
    }

    let reply = match text {
        menus::BTN_NEW_HABIT => {
            state.sessions.set(user_id, DialogState::AwaitingName).await;
            Reply {
                text: "What habit do you want to build? Send me its name.".to_string(),
                markup: None,
            }
        }
        menus::BTN_MY_HABITS => habit_list_reply(state, user_id)?,
        menus::BTN_MY_STATS => stats_reply(state, user_id)?,
        menus::BTN_SETTINGS => settings_reply(state, user_id)?,
        _ => Reply {
            text: "Pick an option from the menu below 👇".to_string(),
            markup: Some(menus::main_menu()),
        },
    };
    Ok(Routed::Reply(reply))
}

async fn advance_dialog(
    state: &AppState,
    user_id: i64,
    dialog: DialogState,
    text: &str,
    now_utc: DateTime<Utc>,
) -> Result<Reply> {
    match dialog {
        DialogState::AwaitingName => {
            if text.is_empty() || text.chars().count() > HABIT_NAME_MAX {
                return Ok(Reply {
                    text: format!("Give it a short name, up to {} characters.", HABIT_NAME_MAX),
                    markup: None,
                });
            }
            state
                .sessions
                .set(user_id, DialogState::AwaitingFrequency { name: text.to_string() })
                .await;
            Ok(Reply {
                text: "How often?".to_string(),
                markup: Some(menus::frequency_menu()),
            })
        }

        DialogState::AwaitingFrequency { name } => {
            // The quick replies are suggestions; any description is kept
            // verbatim and never interpreted.
            if text.is_empty() {
                return Ok(Reply {
                    text: "How often? Pick an option or put it in your own words.".to_string(),
                    markup: Some(menus::frequency_menu()),
                });
            }
            state
                .sessions
                .set(
                    user_id,
                    DialogState::AwaitingReminderChoice { name, frequency: text.to_string() },
                )
                .await;
            Ok(Reply {
                text: "When should I remind you? Send a time like 08:30, or opt out.".to_string(),
                markup: Some(menus::reminder_time_menu()),
            })
        }

        DialogState::AwaitingReminderChoice { name, frequency } => {
            let Some(reminder) = parse_reminder_choice(text) else {
                return Ok(Reply {
                    text: "That doesn't look like a time. Send something like 08:30, or tap 🔕 No reminder."
                        .to_string(),
                    markup: Some(menus::reminder_time_menu()),
                });
            };
            state.db.ensure_user(user_id)?;
            state.db.create_habit(user_id, &name, &frequency, reminder)?;
            state.sessions.clear(user_id).await;

            let text = match reminder {
                Some(at) => format!(
                    "Saved ✨ I'll remind you about <b>{}</b> at {}.",
                    html_escape(&name),
                    at
                ),
                None => format!("Saved ✨ <b>{}</b> added, no reminders.", html_escape(&name)),
            };
            Ok(Reply { text, markup: Some(menus::main_menu()) })
        }

        DialogState::AwaitingNewTime { habit_id } => {
            let Some(reminder) = parse_reminder_choice(text) else {
                return Ok(Reply {
                    text: "Send a 24-hour time like 08:30, or tap 🔕 No reminder.".to_string(),
                    markup: None,
                });
            };
            state.sessions.clear(user_id).await;
            if state.db.update_reminder_time(habit_id, user_id, reminder)? {
                let text = match reminder {
                    Some(at) => format!("⏰ Reminder moved to {}.", at),
                    None => "🔕 Reminder turned off.".to_string(),
                };
                Ok(Reply { text, markup: Some(menus::main_menu()) })
            } else {
                Ok(Reply {
                    text: "⚠️ That habit is gone.".to_string(),
                    markup: Some(menus::main_menu()),
                })
            }
        }

        DialogState::AwaitingLocalTime => {
            let Ok(reported) = text.parse::<ReminderTime>() else {
                return Ok(Reply {
                    text: "Send your current local time as HH:MM, for example 14:05.".to_string(),
                    markup: None,
                });
            };
            let offset = resolve_utc_offset(reported, now_utc)?;
            state.db.set_timezone(user_id, offset)?;
            state.sessions.clear(user_id).await;
            Ok(Reply {
                text: format!("🕒 Got it. Your timezone is set to UTC{:+}.", offset),
                markup: Some(menus::main_menu()),
            })
        }

        // Routed before advance_dialog is called.
        DialogState::AwaitingSheetLink => Ok(Reply {
            text: "Now paste the link to your spreadsheet.".to_string(),
            markup: None,
        }),
    }
}

/// `None` is invalid input; `Some(None)` is an explicit opt-out.
fn parse_reminder_choice(text: &str) -> Option<Option<ReminderTime>> {
    if text == menus::BTN_NO_REMINDER {
        return Some(None);
    }
    text.parse().ok().map(Some)
}

fn start_reply(state: &AppState, user_id: i64) -> Result<Reply> {
    state.db.ensure_user(user_id)?;

    let mut text = String::from(
        "👋 Hi! I help you stick to small daily rituals.\n\n\
         Add a habit, pick a reminder time, and tap ✅ when it's done.",
    );
    if !state.db.is_timezone_confirmed(user_id)? {
        text.push_str(&format!(
            "\n\n🕒 Reminders assume UTC{:+} until you set your timezone in ⚙️ Settings.",
            DEFAULT_UTC_OFFSET
        ));
    }
    Ok(Reply { text, markup: Some(menus::main_menu()) })
}

fn habit_list_reply(state: &AppState, user_id: i64) -> Result<Reply> {
    let habits = state.db.habits_for_owner(user_id)?;
    if habits.is_empty() {
        return Ok(Reply {
            text: format!("No habits yet. Tap {} to add one.", menus::BTN_NEW_HABIT),
            markup: Some(menus::main_menu()),
        });
    }
    Ok(Reply {
        text: "📋 <b>Your habits</b>".to_string(),
        markup: Some(ReplyMarkup::Inline(menus::habit_list(&habits))),
    })
}

fn stats_reply(state: &AppState, user_id: i64) -> Result<Reply> {
    let habits = state.db.habits_for_owner(user_id)?;
    if habits.is_empty() {
        return Ok(Reply {
            text: "Nothing to show yet. Add a habit first.".to_string(),
            markup: Some(menus::main_menu()),
        });
    }
    Ok(Reply { text: menus::stats_report(&habits), markup: None })
}

fn settings_reply(state: &AppState, user_id: i64) -> Result<Reply> {
    state.db.ensure_user(user_id)?;
    let pref = state
        .db
        .get_preference(user_id)?
        .unwrap_or(UserPreference {
            user_id,
            sheet_ref: None,
            utc_offset_hours: DEFAULT_UTC_OFFSET,
            timezone_confirmed: false,
        });

    Ok(Reply {
        text: menus::settings_text(&pref),
        markup: Some(ReplyMarkup::Inline(menus::settings_menu(state.sheets.is_some()))),
    })
}

/// Sheet-link step: check access behind a visible status message, then
/// report. Invalid or unreachable links keep the user on this step.
async fn handle_sheet_link(state: &AppState, chat_id: i64, user_id: i64, text: &str) -> Result<()> {
    let Some(sheets) = state.sheets.as_ref() else {
        // A restart can strand a session here after mirroring was
        // turned off.
        state.sessions.clear(user_id).await;
        state
            .api
            .send_message(chat_id, "Sheets mirroring is not available right now.", Some(&menus::main_menu()))
            .await?;
        return Ok(());
    };

    if ritual_sheets::spreadsheet_id(text).is_none() {
        state
            .api
            .send_message(
                chat_id,
                "That doesn't look like a Google Sheets link. Paste the full URL of your spreadsheet.",
                None,
            )
            .await?;
        return Ok(());
    }

    let status = state.api.send_message(chat_id, "Checking access 🔄", None).await?;

    if sheets.check_access(text).await {
        state.db.set_sheet_reference(user_id, text)?;
        state.sessions.clear(user_id).await;
        state
            .api
            .edit_message_text(
                chat_id,
                status.message_id,
                "✅ Connected! New outcomes will be mirrored to your sheet.",
                None,
            )
            .await?;
    } else {
        state
            .api
            .edit_message_text(
                chat_id,
                status.message_id,
                &format!(
                    "🚫 I can't open that sheet. Make sure it's shared with <code>{}</code> and send the link again.",
                    html_escape(sheets.client_email())
                ),
                None,
            )
            .await?;
    }
    Ok(())
}

async fn handle_callback(state: &AppState, callback: &CallbackQuery) -> Result<()> {
    // Ack first so the client stops its spinner even if handling fails.
    if let Err(e) = state.api.answer_callback_query(&callback.id).await {
        debug!("answerCallbackQuery failed: {}", e);
    }

    let user_id = callback.from.id;
    let Some(message) = callback.message.as_ref() else {
        // Message too old for Telegram to attach; nothing to edit.
        return Ok(());
    };
    let chat_id = message.chat.id;
    let message_id = message.message_id;

    let Some(action) = callback.data.as_deref().and_then(Callback::decode) else {
        debug!("Ignoring unknown callback data: {:?}", callback.data);
        return Ok(());
    };

    match action {
        Callback::Open(habit_id) => match state.db.get_habit(habit_id, user_id)? {
            Some(habit) => {
                state
                    .api
                    .edit_message_text(
                        chat_id,
                        message_id,
                        &menus::habit_card(&habit),
                        Some(&menus::habit_options(habit_id)),
                    )
                    .await?;
                Ok(())
            }
            None => gone(state, chat_id, message_id).await,
        },

        Callback::BackToList => {
            // Swap the card for a fresh list message. Cards too old to
            // delete are left behind.
            if let Err(e) = state.api.delete_message(chat_id, message_id).await {
                debug!("deleteMessage failed: {}", e);
            }
            let reply = habit_list_reply(state, user_id)?;
            state.api.send_message(chat_id, &reply.text, reply.markup.as_ref()).await?;
            Ok(())
        }

        Callback::EditTime(habit_id) => {
            if state.db.get_habit(habit_id, user_id)?.is_none() {
                return gone(state, chat_id, message_id).await;
            }
            state.sessions.set(user_id, DialogState::AwaitingNewTime { habit_id }).await;
            state
                .api
                .send_message(
                    chat_id,
                    "Send the new time as HH:MM, or opt out.",
                    Some(&menus::reminder_time_menu()),
                )
                .await?;
            Ok(())
        }

        Callback::Delete(habit_id) => {
            if state.db.delete_habit(habit_id, user_id)? {
                state.api.edit_message_text(chat_id, message_id, "🗑 Deleted.", None).await?;
                Ok(())
            } else {
                gone(state, chat_id, message_id).await
            }
        }

        Callback::MarkDone(habit_id) => {
            finish_reminder(state, chat_id, message_id, user_id, habit_id, Outcome::Done).await
        }
        Callback::MarkSkip(habit_id) => {
            finish_reminder(state, chat_id, message_id, user_id, habit_id, Outcome::Skip).await
        }

        Callback::SetupSheets => {
            let Some(sheets) = state.sheets.as_ref() else {
                state
                    .api
                    .send_message(chat_id, "Sheets mirroring is not available right now.", None)
                    .await?;
                return Ok(());
            };
            state
                .api
                .send_message(
                    chat_id,
                    &menus::sheets_instructions(sheets.client_email()),
                    Some(&ReplyMarkup::Inline(menus::sheets_shared_button())),
                )
                .await?;
            Ok(())
        }

        Callback::SheetsShared => {
            state.sessions.set(user_id, DialogState::AwaitingSheetLink).await;
            state
                .api
                .send_message(chat_id, "Now paste the link to your spreadsheet.", None)
                .await?;
            Ok(())
        }

        Callback::SetupTimezone => {
            state.sessions.set(user_id, DialogState::AwaitingLocalTime).await;
            state
                .api
                .send_message(
                    chat_id,
                    "What time is it for you right now? Send it as HH:MM, for example 14:05.",
                    None,
                )
                .await?;
            Ok(())
        }
    }
}

async fn gone(state: &AppState, chat_id: i64, message_id: i64) -> Result<()> {
    state.api.edit_message_text(chat_id, message_id, "⚠️ That habit is gone.", None).await?;
    Ok(())
}

async fn finish_reminder(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    user_id: i64,
    habit_id: i64,
    outcome: Outcome,
) -> Result<()> {
    let recorded = outcome::record_outcome(
        &state.db,
        state.sheets.as_ref(),
        user_id,
        habit_id,
        outcome,
        Utc::now(),
    )
    .await?;

    let text = outcome_ack(outcome, &recorded);
    state.api.edit_message_text(chat_id, message_id, &text, None).await?;
    Ok(())
}

/// The in-place edit a done/skip tap gets back. A connected sheet adds
/// a receipt line, whether the mirror write landed or not.
fn outcome_ack(outcome: Outcome, recorded: &Recorded) -> String {
    match recorded {
        Recorded::NotFound => "⚠️ That habit is gone.".to_string(),
        Recorded::Saved { habit_name, mirror } => {
            let mut line = match outcome {
                Outcome::Done => {
                    format!("✅ Nice work! <b>{}</b> marked as done.", html_escape(habit_name))
                }
                Outcome::Skip => {
                    format!("😴 Next time. <b>{}</b> skipped.", html_escape(habit_name))
                }
            };
            match mirror {
                Mirror::Written => line.push_str("\n(Mirrored to your sheet.)"),
                Mirror::Failed => {
                    line.push_str("\n(Couldn't reach your sheet, the outcome is saved here.)")
                }
                Mirror::Off => {}
            }
            line
        }
    }
}
