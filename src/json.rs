use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::codec::{Codec, document_root};
use crate::error::StoreError;
use crate::format::Format;
use crate::value::{Map, Value};

/// JSON documents: a single top-level object.
///
/// Pretty output is indented by four spaces. Forward slashes are emitted
/// bare unless `escape_slashes` is set; `/` can only occur inside string
/// literals in JSON output, so escaping is a plain substitution.
#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    pub pretty: bool,
    pub escape_slashes: bool,
}

impl Codec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn serialize(&self, tree: &Map) -> Result<String, StoreError> {
        let mut buf = Vec::new();
        if self.pretty {
            let mut ser =
                serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
            tree.serialize(&mut ser)
        } else {
            serde_json::to_writer(&mut buf, tree)
        }
        .map_err(|e| StoreError::serialize(Format::Json, e))?;

        let text = String::from_utf8(buf).map_err(|e| StoreError::serialize(Format::Json, e))?;
        Ok(if self.escape_slashes {
            text.replace('/', "\\/")
        } else {
            text
        })
    }

    fn deserialize(&self, text: &str) -> Result<Map, StoreError> {
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value =
            serde_json::from_str(text).map_err(|e| StoreError::parse(Format::Json, e))?;
        document_root(Format::Json, value)
    }
}
