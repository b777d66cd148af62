pub mod api;
pub mod types;

pub use api::{BotApi, TelegramError};
pub use types::{
    CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, Message,
    ReplyKeyboardMarkup, ReplyMarkup, Update, User,
};
