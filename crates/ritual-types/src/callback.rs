/// Actions carried in inline-keyboard callback data.
///
/// The wire form is a short ASCII token, either bare (`back_to_list`) or a
/// tag with a habit id (`open_42`). Unknown or malformed tokens decode to
/// `None` and are dropped by the caller; stale buttons from old messages
/// must never crash a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Open(i64),
    EditTime(i64),
    Delete(i64),
    MarkDone(i64),
    MarkSkip(i64),
    BackToList,
    SetupSheets,
    SheetsShared,
    SetupTimezone,
}

impl Callback {
    pub fn encode(&self) -> String {
        match self {
            Callback::Open(id) => format!("open_{id}"),
            Callback::EditTime(id) => format!("edittime_{id}"),
            Callback::Delete(id) => format!("del_{id}"),
            Callback::MarkDone(id) => format!("done_{id}"),
            Callback::MarkSkip(id) => format!("skip_{id}"),
            Callback::BackToList => "back_to_list".to_string(),
            Callback::SetupSheets => "setup_sheets".to_string(),
            Callback::SheetsShared => "sheets_shared".to_string(),
            Callback::SetupTimezone => "setup_timezone".to_string(),
        }
    }

    pub fn decode(data: &str) -> Option<Self> {
        match data {
            "back_to_list" => return Some(Callback::BackToList),
            "setup_sheets" => return Some(Callback::SetupSheets),
            "sheets_shared" => return Some(Callback::SheetsShared),
            "setup_timezone" => return Some(Callback::SetupTimezone),
            _ => {}
        }
        let (tag, id) = data.split_once('_')?;
        let id: i64 = id.parse().ok()?;
        match tag {
            "open" => Some(Callback::Open(id)),
            "edittime" => Some(Callback::EditTime(id)),
            "del" => Some(Callback::Delete(id)),
            "done" => Some(Callback::MarkDone(id)),
            "skip" => Some(Callback::MarkSkip(id)),
            _ => None,
        }
    }
}
