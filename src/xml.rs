//! XML documents built from quick-xml events.
//!
//! The tree is wrapped in a root element (`<root>` unless configured
//! otherwise). Each mapping entry becomes a child element named after its
//! key; each sequence entry becomes an `<item>` element. XML text has no
//! types of its own, so non-string leaves and containers carry a `type`
//! attribute:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <root>
//!     <name>demo</name>
//!     <port type="int">8080</port>
//!     <ratio type="float">0.5</ratio>
//!     <debug type="bool">false</debug>
//!     <proxy type="null"/>
//!     <tags type="list">
//!         <item>a</item>
//!         <item>b</item>
//!     </tags>
//!     <item key="not a name">value</item>
//! </root>
//! ```
//!
//! Keys that are not valid element names are written as `<item key="...">`.
//! On read, an element without a `type` is a mapping if it has child
//! elements and a string otherwise; repeated child names collapse into a
//! sequence, which keeps hand-written files natural to author.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::codec::{Codec, MAX_DEPTH};
use crate::error::StoreError;
use crate::format::Format;
use crate::value::{Map, Value};

const TYPE_ATTR: &str = "type";
const KEY_ATTR: &str = "key";
const ITEM: &str = "item";

#[derive(Debug, Clone)]
pub struct XmlCodec {
    pub pretty: bool,
    pub root: String,
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self {
            pretty: false,
            root: "root".into(),
        }
    }
}

/// Whether `name` can be used as an element name.
///
/// Narrower than the XML grammar: no namespaces, and nothing
/// starting with the reserved `xml` prefix.
pub fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.to_ascii_lowercase().starts_with("xml")
}

impl Codec for XmlCodec {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn serialize(&self, tree: &Map) -> Result<String, StoreError> {
        if !is_element_name(&self.root) {
            return Err(StoreError::InvalidRootElement(self.root.clone()));
        }
        let mut writer = if self.pretty {
            Writer::new_with_indent(Vec::new(), b' ', 4)
        } else {
            Writer::new(Vec::new())
        };
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;

        if tree.is_empty() {
            emit(&mut writer, Event::Empty(BytesStart::new(self.root.as_str())))?;
        } else {
            emit(&mut writer, Event::Start(BytesStart::new(self.root.as_str())))?;
            write_entries(&mut writer, tree)?;
            emit(&mut writer, Event::End(BytesEnd::new(self.root.as_str())))?;
        }

        let mut text = String::from_utf8(writer.into_inner())
            .map_err(|e| StoreError::serialize(Format::Xml, e))?;
        text.push('\n');
        Ok(text)
    }

    fn deserialize(&self, text: &str) -> Result<Map, StoreError> {
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match parse_document(text)? {
            Some(root) if root.name == self.root => root.into_map(),
            _ => Ok(Map::new()),
        }
    }
}

// --- Writing ---

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), StoreError> {
    writer
        .write_event(event)
        .map_err(|e| StoreError::serialize(Format::Xml, e))
}

fn write_entries<W: Write>(writer: &mut Writer<W>, map: &Map) -> Result<(), StoreError> {
    for (key, value) in map {
        if is_element_name(key) {
            write_element(writer, key, None, value)?;
        } else {
            write_element(writer, ITEM, Some(key), value)?;
        }
    }
    Ok(())
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    key: Option<&str>,
    value: &Value,
) -> Result<(), StoreError> {
    let mut start = BytesStart::new(name);
    if let Some(key) = key {
        start.push_attribute((KEY_ATTR, key));
    }

    let text = match value {
        Value::String(s) if s.is_empty() => return emit(writer, Event::Empty(start)),
        Value::String(s) => s.clone(),
        Value::Null => {
            start.push_attribute((TYPE_ATTR, "null"));
            return emit(writer, Event::Empty(start));
        }
        Value::Bool(b) => {
            start.push_attribute((TYPE_ATTR, "bool"));
            b.to_string()
        }
        Value::Int(i) => {
            start.push_attribute((TYPE_ATTR, "int"));
            i.to_string()
        }
        Value::Float(f) => {
            start.push_attribute((TYPE_ATTR, "float"));
            // Debug keeps the fraction on whole numbers: `2.0`, not `2`.
            format!("{f:?}")
        }
        Value::Map(map) => {
            start.push_attribute((TYPE_ATTR, "map"));
            if map.is_empty() {
                return emit(writer, Event::Empty(start));
            }
            emit(writer, Event::Start(start))?;
            write_entries(writer, map)?;
            return emit(writer, Event::End(BytesEnd::new(name)));
        }
        Value::Seq(items) => {
            start.push_attribute((TYPE_ATTR, "list"));
            if items.is_empty() {
                return emit(writer, Event::Empty(start));
            }
            emit(writer, Event::Start(start))?;
            for item in items {
                write_element(writer, ITEM, None, item)?;
            }
            return emit(writer, Event::End(BytesEnd::new(name)));
        }
    };

    emit(writer, Event::Start(start))?;
    emit(writer, Event::Text(BytesText::new(&text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

// --- Reading ---

fn parse_error(reason: impl ToString) -> StoreError {
    StoreError::parse(Format::Xml, reason)
}

/// A minimal element tree. Text is only meaningful on leaf elements; on
/// elements with children it is indentation and gets ignored.
#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Node, StoreError> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(parse_error)?
            .to_string();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(parse_error)?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(parse_error)?
                .to_string();
            let value = attr.unescape_value().map_err(parse_error)?.into_owned();
            attrs.push((key, value));
        }
        Ok(Node {
            name,
            attrs,
            ..Node::default()
        })
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn into_value(self) -> Result<Value, StoreError> {
        let ty = self.attr(TYPE_ATTR).map(str::to_owned);
        match ty.as_deref() {
            Some("null") => Ok(Value::Null),
            Some("bool") => match self.text.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" | "" => Ok(Value::Bool(false)),
                other => Err(parse_error(format!(
                    "<{}> holds `{other}`, not a bool",
                    self.name
                ))),
            },
            Some("int") => self.text.trim().parse().map(Value::Int).map_err(|_| {
                parse_error(format!("<{}> holds `{}`, not an int", self.name, self.text))
            }),
            Some("float") => self.text.trim().parse().map(Value::Float).map_err(|_| {
                parse_error(format!("<{}> holds `{}`, not a float", self.name, self.text))
            }),
            Some("string") => Ok(Value::String(self.text)),
            Some("map") => self.into_map().map(Value::Map),
            Some("list") => self
                .children
                .into_iter()
                .map(Node::into_value)
                .collect::<Result<_, _>>()
                .map(Value::Seq),
            Some(other) => Err(parse_error(format!(
                "<{}> has unknown type `{other}`",
                self.name
            ))),
            None if !self.children.is_empty() => self.into_map().map(Value::Map),
            None => Ok(Value::String(self.text)),
        }
    }

    fn into_map(self) -> Result<Map, StoreError> {
        let mut map = Map::new();
        for child in self.children {
            let key = child
                .attr(KEY_ATTR)
                .map_or_else(|| child.name.clone(), str::to_owned);
            let value = child.into_value()?;
            match map.get_mut(&key) {
                Some(Value::Seq(items)) => items.push(value),
                Some(existing) => {
                    let first = std::mem::take(existing);
                    *existing = Value::Seq(vec![first, value]);
                }
                None => {
                    map.insert(key, value);
                }
            }
        }
        Ok(map)
    }
}

/// Parse a document into its root element, if it has one.
fn parse_document(text: &str) -> Result<Option<Node>, StoreError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Node> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event().map_err(parse_error)? {
            Event::Start(e) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(parse_error("nesting too deep"));
                }
                stack.push(Node::open(&e)?);
            }
            Event::Empty(e) => {
                let node = Node::open(&e)?;
                attach(&mut stack, &mut root, node);
            }
            // The reader rejects unmatched end tags itself.
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&e.unescape().map_err(parse_error)?);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(std::str::from_utf8(&e).map_err(parse_error)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(format!("element <{}> is never closed", open.name)));
    }
    Ok(root)
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}
