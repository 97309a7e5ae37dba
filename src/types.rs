use crate::format::Format;

/// A store operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
///
/// Keys may be dotted (`database.port`) to reach into nested mappings.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    /// Every leaf as a flattened `key = value` pair.
    List,
    Get { key: String },
    /// `value` is raw text, typed on the way in (`8080` is an integer,
    /// `true` a boolean, `[1,2]` a list).
    Set { key: String, value: String },
    Unset { key: String },
    Increment { key: String, by: i64 },
    Decrement { key: String, by: i64 },
    Clear,
    /// Render the whole tree in `format` without touching the file.
    Export { format: Format, pretty: bool },
}
