/// A habit due for reminder consideration. `time_text` is the stored
/// `HH:MM` string, left unparsed so the dispatcher can decide what to do
/// with a corrupt value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRow {
    pub habit_id: i64,
    pub owner_id: i64,
    pub name: String,
    pub time_text: String,
}
