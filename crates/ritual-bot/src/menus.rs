use ritual_telegram::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup, ReplyMarkup,
};
use ritual_types::{Callback, Habit, UserPreference};

pub const BTN_NEW_HABIT: &str = "➕ New habit";
pub const BTN_MY_HABITS: &str = "📋 My habits";
pub const BTN_MY_STATS: &str = "📊 My stats";
pub const BTN_SETTINGS: &str = "⚙️ Settings";
pub const BTN_NO_REMINDER: &str = "🔕 No reminder";

pub const FREQ_CHOICES: [&str; 3] = ["Every day", "Weekdays", "Once a week"];

/// Quick-pick times under the reminder prompt. Free-form input is
/// accepted too.
const TIME_SUGGESTIONS: [&str; 6] = ["07:00", "08:00", "09:00", "12:00", "18:00", "21:00"];

pub fn main_menu() -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![
            vec![KeyboardButton::new(BTN_NEW_HABIT), KeyboardButton::new(BTN_MY_HABITS)],
            vec![KeyboardButton::new(BTN_MY_STATS), KeyboardButton::new(BTN_SETTINGS)],
        ],
        resize_keyboard: true,
        one_time_keyboard: None,
    })
}

pub fn frequency_menu() -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: FREQ_CHOICES.iter().map(|c| vec![KeyboardButton::new(c)]).collect(),
        resize_keyboard: true,
        one_time_keyboard: Some(true),
    })
}

pub fn reminder_time_menu() -> ReplyMarkup {
    let mut keyboard: Vec<Vec<KeyboardButton>> = TIME_SUGGESTIONS
        .chunks(3)
        .map(|row| row.iter().map(|t| KeyboardButton::new(t)).collect())
        .collect();
    keyboard.push(vec![KeyboardButton::new(BTN_NO_REMINDER)]);

    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard,
        resize_keyboard: true,
        one_time_keyboard: Some(true),
    })
}

/// One button per habit; tapping opens the habit's card.
pub fn habit_list(habits: &[Habit]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: habits
            .iter()
            .map(|h| {
                let label = match h.reminder_time {
                    Some(at) => format!("{} · {}", h.name, at),
                    None => h.name.clone(),
                };
                vec![InlineKeyboardButton::new(&label, &Callback::Open(h.id).encode())]
            })
            .collect(),
    }
}

pub fn habit_options(habit_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton::new("⏰ Change time", &Callback::EditTime(habit_id).encode()),
                InlineKeyboardButton::new("🗑 Delete", &Callback::Delete(habit_id).encode()),
            ],
            vec![InlineKeyboardButton::new("⬅️ Back", &Callback::BackToList.encode())],
        ],
    }
}

/// Buttons under a fired reminder.
pub fn reminder_actions(habit_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::new("✅ Done", &Callback::MarkDone(habit_id).encode()),
            InlineKeyboardButton::new("😴 Skip", &Callback::MarkSkip(habit_id).encode()),
        ]],
    }
}

pub fn sheets_shared_button() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::new(
            "✅ I shared it",
            &Callback::SheetsShared.encode(),
        )]],
    }
}

pub fn settings_menu(sheets_enabled: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![vec![InlineKeyboardButton::new(
        "🕒 Set timezone",
        &Callback::SetupTimezone.encode(),
    )]];
    if sheets_enabled {
        rows.push(vec![InlineKeyboardButton::new(
            "📊 Connect Google Sheets",
            &Callback::SetupSheets.encode(),
        )]);
    }
    InlineKeyboardMarkup { inline_keyboard: rows }
}

pub fn habit_card(habit: &Habit) -> String {
    let when = match habit.reminder_time {
        Some(at) => at.to_string(),
        None => "no reminder".to_string(),
    };
    format!(
        "<b>{}</b>\n{} · {}\n✅ {} · 😴 {}",
        html_escape(&habit.name),
        html_escape(&habit.frequency),
        when,
        habit.done_count,
        habit.skip_count,
    )
}

pub fn stats_report(habits: &[Habit]) -> String {
    let mut out = String::from("📊 <b>Your progress</b>\n");
    for habit in habits {
        let percent = habit.success_percent();
        out.push_str(&format!(
            "\n<b>{}</b>\n📅 Started {}\n{} {}%  (✅ {} · 😴 {})\n",
            html_escape(&habit.name),
            habit.created_at,
            progress_bar(percent),
            percent,
            habit.done_count,
            habit.skip_count,
        ));
    }
    out
}

pub fn settings_text(pref: &UserPreference) -> String {
    let tz = if pref.timezone_confirmed {
        format!("UTC{:+}", pref.utc_offset_hours)
    } else {
        format!("UTC{:+} (assumed)", pref.utc_offset_hours)
    };
    let sheet = match pref.sheet_ref {
        Some(_) => "connected",
        None => "not connected",
    };
    format!("⚙️ <b>Settings</b>\n\nTimezone: {}\nGoogle Sheets: {}", tz, sheet)
}

pub fn sheets_instructions(client_email: &str) -> String {
    format!(
        "📊 <b>Google Sheets mirroring</b>\n\n\
         1. Create an empty spreadsheet.\n\
         2. Share it with <code>{}</code> as an editor.\n\
         3. Tap the button below.",
        html_escape(client_email)
    )
}

/// Whole-percent progress bar in colored squares. Both ends round down,
/// so a partial decade shows as a shorter bar.
pub fn progress_bar(percent: u32) -> String {
    let green = (percent / 10) as usize;
    let white = ((100 - percent.min(100)) / 10) as usize;
    "🟩".repeat(green) + &"⬜".repeat(white)
}

pub fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
