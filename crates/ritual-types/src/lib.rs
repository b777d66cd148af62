pub mod callback;
pub mod models;
pub mod time;

pub use callback::Callback;
pub use models::{Habit, Outcome, UserPreference};
pub use time::{DEFAULT_UTC_OFFSET, InvalidTime, ReminderTime, local_wall_time, resolve_utc_offset};
