use crate::codec::{Codec, document_root};
use crate::error::StoreError;
use crate::format::Format;
use crate::value::{Map, Value};

/// YAML documents, encoded directly with no wrapping. Style choices (block
/// vs flow, literal blocks for multi-line strings) are serde_yaml's.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn serialize(&self, tree: &Map) -> Result<String, StoreError> {
        serde_yaml::to_string(tree).map_err(|e| StoreError::serialize(Format::Yaml, e))
    }

    fn deserialize(&self, text: &str) -> Result<Map, StoreError> {
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| StoreError::parse(Format::Yaml, e))?;
        document_root(Format::Yaml, value)
    }
}
