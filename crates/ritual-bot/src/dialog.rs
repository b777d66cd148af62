/// Where a user stands in a multi-step flow. No entry in the session map
/// means idle. Each step owns the data gathered so far, so a half-built
/// habit never touches the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    /// New-habit flow: waiting for the habit's name.
    AwaitingName,
    /// New-habit flow: name captured, waiting for a frequency choice.
    AwaitingFrequency { name: String },
    /// New-habit flow: waiting for a reminder time or an opt-out.
    AwaitingReminderChoice { name: String, frequency: String },
    /// Re-arming an existing habit's reminder from its card.
    AwaitingNewTime { habit_id: i64 },
    /// Sheets wizard: waiting for the shared spreadsheet link.
    AwaitingSheetLink,
    /// Timezone dialog: waiting for the user's current local time.
    AwaitingLocalTime,
}
