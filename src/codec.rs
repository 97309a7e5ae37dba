//! The codec strategy: one serializer/deserializer pair per [`Format`].
//!
//! A store resolves its format once and asks [`codec_for`] for the matching
//! codec whenever it loads or saves. Export helpers build codecs with their
//! own settings, so exporting never depends on how the store was opened.
//!
//! Every codec shares the same empty-input rule: text that is empty or only
//! whitespace deserializes to an empty mapping without invoking the parser.

use crate::error::StoreError;
use crate::format::Format;
use crate::json::JsonCodec;
use crate::php::PhpCodec;
use crate::value::{Map, Value};
use crate::xml::XmlCodec;
use crate::yaml::YamlCodec;

/// Deepest container nesting the hand-written readers accept, the same
/// limit serde_json applies.
pub(crate) const MAX_DEPTH: usize = 128;

pub trait Codec {
    fn format(&self) -> Format;

    /// Encode a tree as document text.
    fn serialize(&self, tree: &Map) -> Result<String, StoreError>;

    /// Decode document text into a tree.
    fn deserialize(&self, text: &str) -> Result<Map, StoreError>;
}

/// Settings consumed by the codecs. Each codec ignores the ones that don't
/// apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSettings {
    pub pretty: bool,
    /// XML only: name of the wrapping element.
    pub root: String,
    /// JSON only: emit `\/` instead of `/`.
    pub escape_slashes: bool,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            pretty: false,
            root: "root".into(),
            escape_slashes: false,
        }
    }
}

pub fn codec_for(format: Format, settings: &CodecSettings) -> Box<dyn Codec> {
    match format {
        Format::Json => Box::new(JsonCodec {
            pretty: settings.pretty,
            escape_slashes: settings.escape_slashes,
        }),
        Format::Xml => Box::new(XmlCodec {
            pretty: settings.pretty,
            root: settings.root.clone(),
        }),
        Format::Yaml => Box::new(YamlCodec),
        Format::Php => Box::new(PhpCodec),
    }
}

/// Accept a decoded document as the top level of a store.
///
/// Null and an empty sequence both mean "nothing stored"; any other
/// non-mapping is rejected.
pub(crate) fn document_root(format: Format, value: Value) -> Result<Map, StoreError> {
    match value {
        Value::Map(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Seq(items) if items.is_empty() => Ok(Map::new()),
        _ => Err(StoreError::NotAMappingDocument { format }),
    }
}
