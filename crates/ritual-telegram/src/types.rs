use serde::{Deserialize, Serialize};

/// Envelope every Bot API method returns. `result` is present when `ok`
/// is true; `description` and `error_code` when it is not.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    // No serde(default) here: on a generic field it would bound
    // T: Default, and an absent Option already reads as None.
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

// -- Outgoing keyboards --

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: &str, callback_data: &str) -> Self {
        Self {
            text: text.to_string(),
            callback_data: callback_data.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time_keyboard: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

impl KeyboardButton {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_message_update() {
        let raw = r#"{
            "update_id": 901,
            "message": {
                "message_id": 55,
                "from": {"id": 10, "is_bot": false, "first_name": "Ada", "username": "ada"},
                "chat": {"id": 10, "type": "private"},
                "date": 1750000000,
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 901);
        let msg = update.message.unwrap();
        assert_eq!(msg.chat.id, 10);
        assert_eq!(msg.text.as_deref(), Some("/start"));
        assert_eq!(msg.from.unwrap().username.as_deref(), Some("ada"));
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn deserializes_callback_update() {
        let raw = r#"{
            "update_id": 902,
            "callback_query": {
                "id": "4382abc",
                "from": {"id": 10, "is_bot": false, "first_name": "Ada"},
                "message": {
                    "message_id": 56,
                    "chat": {"id": 10, "type": "private"},
                    "date": 1750000001,
                    "text": "Your habits:"
                },
                "chat_instance": "-123",
                "data": "open_42"
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        let cb = update.callback_query.unwrap();
        assert_eq!(cb.id, "4382abc");
        assert_eq!(cb.from.id, 10);
        assert_eq!(cb.data.as_deref(), Some("open_42"));
        assert_eq!(cb.message.unwrap().message_id, 56);
    }

    #[test]
    fn deserializes_error_envelope() {
        let raw = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let resp: ApiResponse<Message> = serde_json::from_str(raw).unwrap();

        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.error_code, Some(403));
        assert_eq!(resp.description.as_deref(), Some("Forbidden: bot was blocked by the user"));
    }

    // Message has no Default impl; the envelope must deserialize for any
    // payload serde can read.
    #[test]
    fn deserializes_success_envelope() {
        let raw = r#"{
            "ok": true,
            "result": {
                "message_id": 77,
                "chat": {"id": 10, "type": "private"},
                "date": 1750000002,
                "text": "Checking access 🔄"
            }
        }"#;
        let resp: ApiResponse<Message> = serde_json::from_str(raw).unwrap();

        assert!(resp.ok);
        assert_eq!(resp.result.unwrap().message_id, 77);
        assert!(resp.description.is_none());
        assert!(resp.error_code.is_none());
    }

    #[test]
    fn serializes_inline_keyboard_shape() {
        let markup = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::new("✅ Done", "done_42")]],
        };

        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inline_keyboard": [[{"text": "✅ Done", "callback_data": "done_42"}]]
            })
        );
    }

    #[test]
    fn reply_keyboard_omits_unset_fields() {
        let markup = ReplyKeyboardMarkup {
            keyboard: vec![vec![KeyboardButton::new("📋 My habits")]],
            resize_keyboard: true,
            one_time_keyboard: None,
        };

        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keyboard": [[{"text": "📋 My habits"}]],
                "resize_keyboard": true
            })
        );
    }

    #[test]
    fn reply_markup_flattens_variants() {
        let inline = ReplyMarkup::Inline(InlineKeyboardMarkup {
            inline_keyboard: vec![],
        });
        let json = serde_json::to_value(&inline).unwrap();
        assert!(json.get("inline_keyboard").is_some());

        let keyboard = ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
            keyboard: vec![],
            resize_keyboard: true,
            one_time_keyboard: Some(true),
        });
        let json = serde_json::to_value(&keyboard).unwrap();
        assert!(json.get("keyboard").is_some());
        assert_eq!(json.get("one_time_keyboard"), Some(&serde_json::json!(true)));
    }
}
