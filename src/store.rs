use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::builder::StoreBuilder;
use crate::codec::{Codec, CodecSettings, codec_for};
use crate::convert;
use crate::error::StoreError;
use crate::format::Format;
use crate::json::JsonCodec;
use crate::ops::{self, StoreResult};
use crate::persist;
use crate::php::PhpCodec;
use crate::types::StoreAction;
use crate::value::{Map, Value};
use crate::xml::XmlCodec;
use crate::yaml::YamlCodec;

/// An ordered key-value tree, optionally backed by a file.
///
/// All reads and writes happen in memory. Writes are validated before
/// anything is committed: a value with a non-scalar leaf anywhere inside it
/// leaves the store untouched. Nothing reaches disk until [`save()`](Self::save).
///
/// The store owns its tree outright. [`get_mut()`](Self::get_mut) hands out
/// a mutable reference into it, bounded by the borrow of the store, so
/// in-place edits of nested containers are visible immediately. Values
/// written that way are not validated until the next save, which refuses
/// to write a tree with a non-scalar leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    tree: Map,
    file: Option<PathBuf>,
    format: Format,
    root: String,
    escape_slashes: bool,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// An empty, in-memory JSON store.
    pub fn new() -> Self {
        Self::with_settings(None, Format::Json, "root".into(), false)
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Open a file-backed store, inferring the format from the extension.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        StoreBuilder::new().file(path).open()
    }

    pub(crate) fn with_settings(
        file: Option<PathBuf>,
        format: Format,
        root: String,
        escape_slashes: bool,
    ) -> Self {
        Self {
            tree: Map::new(),
            file,
            format,
            root,
            escape_slashes,
        }
    }

    /// Replace the tree with the backing file's contents, if the file exists.
    pub(crate) fn load(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let Some(text) = persist::read_existing(path)? else {
            debug!(path = %path.display(), "store file absent, starting empty");
            return Ok(());
        };

        let tree = self.codec(true).deserialize(&text)?;
        convert::validate_map(&tree).map_err(|e| StoreError::parse(self.format, e))?;
        debug!(
            path = %path.display(),
            format = %self.format,
            keys = tree.len(),
            "loaded store"
        );
        self.tree = tree;
        Ok(())
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    fn settings(&self, pretty: bool) -> CodecSettings {
        CodecSettings {
            pretty,
            root: self.root.clone(),
            escape_slashes: self.escape_slashes,
        }
    }

    fn codec(&self, pretty: bool) -> Box<dyn Codec> {
        codec_for(self.format, &self.settings(pretty))
    }

    // --- Reads ---

    /// Whether `key` is present. A key holding null is present.
    pub fn has(&self, key: &str) -> bool {
        self.tree.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.tree.get(key)
    }

    /// Live mutable access to the value at `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.tree.get_mut(key)
    }

    /// Look up a nested value. Mapping segments are keys, sequence segments
    /// are indices: `["servers", "0", "host"]`.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.tree.get(*first)?, |current, segment| match current {
                Value::Map(map) => map.get(*segment),
                Value::Seq(items) => items.get(segment.parse::<usize>().ok()?),
                _ => None,
            })
    }

    pub fn count(&self) -> usize {
        self.tree.len()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tree.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.tree.iter()
    }

    // --- Writes ---

    /// Insert or overwrite one key.
    ///
    /// Fails with [`StoreError::NonScalarValue`] if any leaf of `value` has no
    /// scalar representation; the store is then unchanged.
    pub fn set<K: Into<String>, V: Serialize>(&mut self, key: K, value: V) -> Result<(), StoreError> {
        let key = key.into();
        let value = convert::to_value(&value).map_err(|e| e.into_store_error(Some(&key)))?;
        self.tree.insert(key, value);
        Ok(())
    }

    /// Insert or overwrite every top-level key of `mapping`, leaving other
    /// keys alone.
    ///
    /// The whole input is validated before the first key is written.
    pub fn set_many<M: Serialize>(&mut self, mapping: M) -> Result<(), StoreError> {
        let value = convert::to_value(&mapping).map_err(|e| e.into_store_error(None))?;
        let Value::Map(entries) = value else {
            return Err(StoreError::NotAMapping {
                found: value.type_name(),
            });
        };
        self.tree.extend(entries);
        Ok(())
    }

    /// Write a nested value, creating intermediate mappings as needed.
    ///
    /// Refuses to descend through an existing non-mapping value. An empty
    /// path merges `value` into the top level like [`set_many`](Self::set_many).
    pub fn set_at<V: Serialize>(&mut self, path: &[&str], value: V) -> Result<(), StoreError> {
        let Some((leaf, parents)) = path.split_last() else {
            return self.set_many(value);
        };
        let value =
            convert::to_value(&value).map_err(|e| e.into_store_error(Some(&path.join("."))))?;

        // Only pre-existing values can fail the walk, and they are all met
        // before the first intermediate mapping is created.
        let mut current = &mut self.tree;
        for (depth, segment) in parents.iter().enumerate() {
            let slot = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Map(Map::new()));
            current = match slot {
                Value::Map(map) => map,
                other => {
                    return Err(StoreError::NotAContainer {
                        key: parents[..=depth].join("."),
                        found: other.type_name(),
                    });
                }
            };
        }
        current.insert((*leaf).to_string(), value);
        Ok(())
    }

    /// Remove `key`. Returns whether it was present; absent keys are not an
    /// error.
    pub fn unset(&mut self, key: &str) -> bool {
        self.tree.shift_remove(key).is_some()
    }

    /// Remove a nested key. Returns whether it was present.
    pub fn unset_at(&mut self, path: &[&str]) -> bool {
        let Some((leaf, parents)) = path.split_last() else {
            return false;
        };
        let mut current = &mut self.tree;
        for segment in parents {
            match current.get_mut(*segment) {
                Some(Value::Map(map)) => current = map,
                _ => return false,
            }
        }
        current.shift_remove(*leaf).is_some()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    // --- Counters ---

    pub fn increment(&mut self, key: &str) -> Result<i64, StoreError> {
        self.increment_by(key, 1)
    }

    pub fn decrement(&mut self, key: &str) -> Result<i64, StoreError> {
        self.decrement_by(key, 1)
    }

    /// Add `amount` to the integer at `key`, starting from 0 if the key is
    /// absent or null, and return the new value.
    ///
    /// The current value must already be an integer, a float with no
    /// fractional part, or a string spelling an integer exactly. Anything
    /// else is [`StoreError::NotAnInteger`] and the value is left as it was.
    pub fn increment_by(&mut self, key: &str, amount: i64) -> Result<i64, StoreError> {
        self.adjust(key, |current| current.checked_add(amount))
    }

    /// Subtract `amount`; see [`increment_by`](Self::increment_by).
    pub fn decrement_by(&mut self, key: &str, amount: i64) -> Result<i64, StoreError> {
        self.adjust(key, |current| current.checked_sub(amount))
    }

    fn adjust(
        &mut self,
        key: &str,
        step: impl FnOnce(i64) -> Option<i64>,
    ) -> Result<i64, StoreError> {
        let current = match self.tree.get(key) {
            None | Some(Value::Null) => 0,
            Some(value) => {
                counter_value(value).ok_or_else(|| StoreError::NotAnInteger { key: key.into() })?
            }
        };
        let next = step(current).ok_or_else(|| StoreError::CounterOverflow { key: key.into() })?;
        self.tree.insert(key.to_string(), Value::Int(next));
        Ok(next)
    }

    // --- Exports ---

    pub fn to_map(&self) -> &Map {
        &self.tree
    }

    pub fn into_map(self) -> Map {
        self.tree
    }

    pub fn to_json(&self, pretty: bool, escape_slashes: bool) -> Result<String, StoreError> {
        JsonCodec {
            pretty,
            escape_slashes,
        }
        .serialize(&self.tree)
    }

    pub fn to_xml(&self, pretty: bool, root: &str) -> Result<String, StoreError> {
        XmlCodec {
            pretty,
            root: root.into(),
        }
        .serialize(&self.tree)
    }

    pub fn to_yaml(&self) -> Result<String, StoreError> {
        YamlCodec.serialize(&self.tree)
    }

    pub fn to_php(&self) -> Result<String, StoreError> {
        PhpCodec.serialize(&self.tree)
    }

    /// Export in any format using this store's root and escaping settings.
    pub fn export(&self, format: Format, pretty: bool) -> Result<String, StoreError> {
        codec_for(format, &self.settings(pretty)).serialize(&self.tree)
    }

    // --- Persistence ---

    /// Write the tree to the backing file, reporting why it failed.
    ///
    /// The tree is validated first; the file is left untouched if an edit
    /// through [`get_mut()`](Self::get_mut) put a non-finite float in it.
    pub fn try_save(&self) -> Result<(), StoreError> {
        let path = self.file.as_deref().ok_or(StoreError::NoFile)?;
        convert::validate_map(&self.tree).map_err(|e| e.into_store_error(None))?;
        let text = self.codec(true).serialize(&self.tree)?;
        persist::write_locked(path, &text)?;
        debug!(path = %path.display(), format = %self.format, keys = self.tree.len(), "saved store");
        Ok(())
    }

    /// Write the tree to the backing file.
    ///
    /// Returns `false` without raising when there is no file or the write
    /// fails; the cause of a failed write is logged at `warn`. Use
    /// [`try_save()`](Self::try_save) to get the error itself.
    pub fn save(&self) -> bool {
        match self.try_save() {
            Ok(()) => true,
            Err(StoreError::NoFile) => {
                debug!("save skipped: store has no file");
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to save store");
                false
            }
        }
    }

    /// Run a [`StoreAction`]. Mutating actions save afterwards and report
    /// whether that succeeded.
    pub fn handle(&mut self, action: &StoreAction) -> Result<StoreResult, StoreError> {
        match action {
            StoreAction::List => Ok(StoreResult::Listing {
                entries: ops::flatten(&self.tree),
            }),
            StoreAction::Get { key } => {
                let found = match self.get(key) {
                    Some(value) => Some(value),
                    None => self.get_path(&ops::segments(key)),
                };
                Ok(match found {
                    Some(value) => StoreResult::KeyValue {
                        key: key.clone(),
                        value: value.clone(),
                    },
                    None => StoreResult::Missing { key: key.clone() },
                })
            }
            StoreAction::Set { key, value } => {
                let value = Value::parse_raw(value);
                self.set_at(&ops::segments(key), &value)?;
                Ok(StoreResult::ValueSet {
                    key: key.clone(),
                    value,
                    saved: self.save(),
                })
            }
            StoreAction::Unset { key } => {
                let existed = self.unset(key) || self.unset_at(&ops::segments(key));
                Ok(StoreResult::ValueUnset {
                    key: key.clone(),
                    existed,
                    saved: self.save(),
                })
            }
            StoreAction::Increment { key, by } => {
                let value = self.increment_by(key, *by)?;
                Ok(StoreResult::Counter {
                    key: key.clone(),
                    value,
                    saved: self.save(),
                })
            }
            StoreAction::Decrement { key, by } => {
                let value = self.decrement_by(key, *by)?;
                Ok(StoreResult::Counter {
                    key: key.clone(),
                    value,
                    saved: self.save(),
                })
            }
            StoreAction::Clear => {
                self.clear();
                Ok(StoreResult::Cleared { saved: self.save() })
            }
            StoreAction::Export { format, pretty } => {
                Ok(StoreResult::Exported(self.export(*format, *pretty)?))
            }
        }
    }
}

/// The integer a counter currently holds, if it can be read losslessly.
fn counter_value(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
            Some(*f as i64)
        }
        Value::String(s) => s.parse::<i64>().ok().filter(|i| i.to_string() == *s),
        _ => None,
    }
}

/// Same text as `to_json(false, false)`.
impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = self.to_json(false, false).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Serialize for Store {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tree.serialize(serializer)
    }
}

impl Index<&str> for Store {
    type Output = Value;

    /// Absent keys index to `Value::Null`.
    fn index(&self, key: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.tree.get(key).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::fixtures::test::{Opaque, assert_same_tree, sample_tree};
    use serde::Serialize;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn file_store(dir: &TempDir, name: &str) -> Store {
        Store::open(dir.path().join(name)).unwrap()
    }

    // --- has / get / set ---

    #[test]
    fn set_then_get() {
        let mut store = Store::new();
        store.set("name", "demo").unwrap();
        store.set("port", 8080).unwrap();
        assert_eq!(store.get("name"), Some(&Value::from("demo")));
        assert_eq!(store.get("port"), Some(&Value::Int(8080)));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn has_counts_null_as_present() {
        let mut store = Store::new();
        store.set("nothing", Value::Null).unwrap();
        assert!(store.has("nothing"));
        assert!(!store.has("other"));
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut store = Store::new();
        store.set("a", 1).unwrap();
        store.set("b", 2).unwrap();
        store.set("a", 3).unwrap();
        assert_eq!(store.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(store["a"], Value::Int(3));
    }

    #[test]
    fn set_rejects_non_scalar_leaf_and_commits_nothing() {
        let mut store = Store::new();
        store.set("keep", true).unwrap();

        let mut inner = BTreeMap::new();
        inner.insert("c", Opaque);
        let err = store.set("b", &inner).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string().split(':').next(), Some("Non-scalar value for key `b.c`"));
        assert!(!store.has("b"));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn set_many_is_validated_as_a_whole() {
        #[derive(Serialize)]
        struct Nested {
            c: Opaque,
        }
        #[derive(Serialize)]
        struct Input {
            a: i64,
            b: Nested,
        }

        let mut store = Store::new();
        let err = store
            .set_many(Input {
                a: 1,
                b: Nested { c: Opaque },
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!store.has("a"));
        assert!(store.is_empty());
    }

    #[test]
    fn set_many_leaves_other_keys_alone() {
        let mut store = Store::new();
        store.set("untouched", "x").unwrap();
        store.set("a", 0).unwrap();

        let mut input = BTreeMap::new();
        input.insert("a", 1);
        input.insert("b", 2);
        store.set_many(&input).unwrap();

        assert_eq!(store["untouched"], Value::from("x"));
        assert_eq!(store["a"], Value::Int(1));
        assert_eq!(store["b"], Value::Int(2));
    }

    #[test]
    fn set_many_requires_a_mapping() {
        let mut store = Store::new();
        let err = store.set_many(vec![1, 2]).unwrap_err();
        assert!(matches!(err, StoreError::NotAMapping { found: "list" }));
    }

    #[test]
    fn set_rejects_nan() {
        let mut store = Store::new();
        assert!(store.set("ratio", f64::NAN).is_err());
        assert!(!store.has("ratio"));
    }

    #[test]
    fn get_mut_edits_are_live() {
        let mut store = Store::new();
        store.set("list", vec![1, 2]).unwrap();
        store
            .get_mut("list")
            .and_then(Value::as_seq_mut)
            .unwrap()
            .push(Value::Int(3));
        assert_eq!(store["list"], Value::from(vec![1, 2, 3]));
    }

    // --- nested paths ---

    #[test]
    fn set_at_creates_intermediate_maps() {
        let mut store = Store::new();
        store.set_at(&["database", "pool", "size"], 10).unwrap();
        assert_eq!(
            store.get_path(&["database", "pool", "size"]),
            Some(&Value::Int(10))
        );
    }

    #[test]
    fn set_at_refuses_to_descend_through_a_scalar() {
        let mut store = Store::new();
        store.set("database", "sqlite").unwrap();
        let err = store.set_at(&["database", "url"], "x").unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotAContainer { ref key, found: "string" } if key == "database"
        ));
        assert_eq!(store["database"], Value::from("sqlite"));
    }

    #[test]
    fn set_at_validates_before_creating_parents() {
        let mut store = Store::new();
        let err = store.set_at(&["a", "b"], Opaque).unwrap_err();
        assert!(matches!(err, StoreError::NonScalarValue { ref key, .. } if key == "a.b"));
        assert!(!store.has("a"));
    }

    #[test]
    fn get_path_indexes_sequences() {
        let mut store = Store::new();
        store
            .set("servers", Value::parse_raw(r#"[{"host": "a"}, {"host": "b"}]"#))
            .unwrap();
        assert_eq!(
            store.get_path(&["servers", "1", "host"]),
            Some(&Value::from("b"))
        );
        assert_eq!(store.get_path(&["servers", "9"]), None);
        assert_eq!(store.get_path(&[]), None);
    }

    #[test]
    fn unset_at_removes_nested_key() {
        let mut store = Store::new();
        store.set_at(&["a", "b"], 1).unwrap();
        store.set_at(&["a", "c"], 2).unwrap();
        assert!(store.unset_at(&["a", "b"]));
        assert!(!store.unset_at(&["a", "b"]));
        assert!(!store.unset_at(&["nope", "b"]));
        assert_eq!(store.get_path(&["a", "c"]), Some(&Value::Int(2)));
    }

    // --- unset / clear / count ---

    #[test]
    fn unset_twice_is_not_an_error() {
        let mut store = Store::new();
        store.set("k", 1).unwrap();
        assert!(store.unset("k"));
        assert!(!store.unset("k"));
    }

    #[test]
    fn unset_preserves_order_of_the_rest() {
        let mut store = Store::new();
        for key in ["a", "b", "c"] {
            store.set(key, 0).unwrap();
        }
        store.unset("a");
        assert_eq!(store.keys().collect::<Vec<_>>(), ["b", "c"]);
    }

    #[test]
    fn clear_and_count() {
        let mut store = Store::new();
        store.set("a", 1).unwrap();
        store.set("b", 2).unwrap();
        assert_eq!(store.count(), 2);
        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_does_not_touch_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.json");
        fs::write(&path, r#"{"a":1}"#).unwrap();

        let mut store = Store::open(&path).unwrap();
        store.clear();
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"a":1}"#);
    }

    // --- counters ---

    #[test]
    fn increment_from_fresh() {
        let mut store = Store::new();
        assert_eq!(store.increment("count").unwrap(), 1);
        assert_eq!(store.increment_by("count", 2).unwrap(), 3);
        assert_eq!(store["count"], Value::Int(3));
    }

    #[test]
    fn decrement_from_fresh() {
        let mut store = Store::new();
        assert_eq!(store.decrement("count").unwrap(), -1);
        assert_eq!(store.decrement_by("count", 2).unwrap(), -3);
    }

    #[test]
    fn increment_rejects_text() {
        let mut store = Store::new();
        store.set("foo", "bar").unwrap();
        let err = store.increment("foo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err, StoreError::NotAnInteger { .. }));
        assert_eq!(store["foo"], Value::from("bar"));
    }

    #[test]
    fn increment_rejects_fractional_float_and_containers() {
        let mut store = Store::new();
        store.set("f", 1.5).unwrap();
        store.set("list", vec![1]).unwrap();
        store.set("flag", true).unwrap();
        assert!(store.increment("f").is_err());
        assert!(store.increment("list").is_err());
        assert!(store.increment("flag").is_err());
        assert_eq!(store["f"], Value::Float(1.5));
    }

    #[test]
    fn increment_accepts_lossless_integers() {
        let mut store = Store::new();
        store.set("whole", 4.0).unwrap();
        store.set("text", "41").unwrap();
        store.set("padded", "007").unwrap();
        store.set("nothing", Value::Null).unwrap();

        assert_eq!(store.increment("whole").unwrap(), 5);
        assert_eq!(store["whole"], Value::Int(5));
        assert_eq!(store.increment("text").unwrap(), 42);
        assert!(store.increment("padded").is_err());
        assert_eq!(store.increment("nothing").unwrap(), 1);
    }

    #[test]
    fn counter_overflow_is_rejected() {
        let mut store = Store::new();
        store.set("n", i64::MAX).unwrap();
        let err = store.increment("n").unwrap_err();
        assert!(matches!(err, StoreError::CounterOverflow { .. }));
        assert_eq!(store["n"], Value::Int(i64::MAX));
    }

    #[test]
    fn counter_keeps_its_position() {
        let mut store = Store::new();
        store.set("a", 1).unwrap();
        store.set("b", 1).unwrap();
        store.increment("a").unwrap();
        assert_eq!(store.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    // --- exports ---

    #[test]
    fn display_and_serialize_match_compact_json() {
        let mut store = Store::new();
        store.set("url", "http://example.com/x").unwrap();
        store.set("n", 1).unwrap();

        let expected = store.to_json(false, false).unwrap();
        assert_eq!(store.to_string(), expected);
        assert_eq!(serde_json::to_string(&store).unwrap(), expected);
        assert_eq!(expected, r#"{"url":"http://example.com/x","n":1}"#);
    }

    #[test]
    fn exports_do_not_need_a_file() {
        let mut store = Store::new();
        store.set("a", 1).unwrap();
        assert!(store.to_json(true, true).unwrap().contains("\"a\": 1"));
        assert!(store.to_xml(true, "settings").unwrap().contains("<settings>"));
        assert_eq!(store.to_yaml().unwrap(), "a: 1\n");
        assert!(store.to_php().unwrap().contains("'a' => 1,"));
        assert_eq!(store.to_map()["a"], Value::Int(1));
    }

    #[test]
    fn index_of_absent_key_is_null() {
        let store = Store::new();
        assert_eq!(store["missing"], Value::Null);
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut store = Store::new();
        store.set("z", 1).unwrap();
        store.set("a", 2).unwrap();
        let keys: Vec<&String> = (&store).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["z", "a"]);
        assert_eq!(store.iter().count(), 2);
    }

    // --- save / load ---

    #[test]
    fn save_without_file_returns_false() {
        let mut store = Store::new();
        store.set("a", 1).unwrap();
        assert!(!store.save());
        assert!(matches!(store.try_save(), Err(StoreError::NoFile)));
    }

    #[test]
    fn save_failure_returns_false() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened for writing.
        let mut store = Store::with_settings(
            Some(dir.path().to_path_buf()),
            Format::Json,
            "root".into(),
            false,
        );
        store.set("a", 1).unwrap();
        assert!(!store.save());
        assert!(matches!(store.try_save(), Err(StoreError::Io { .. })));
    }

    #[test]
    fn save_refuses_non_finite_float_written_in_place() {
        let dir = TempDir::new().unwrap();
        for name in ["s.json", "s.xml", "s.yml", "s.php"] {
            let path = dir.path().join(name);
            let mut store = file_store(&dir, name);
            store.set("x", 1.5).unwrap();
            assert!(store.save(), "{name}");
            let before = fs::read_to_string(&path).unwrap();

            *store.get_mut("x").unwrap() = Value::Float(f64::NAN);
            assert!(!store.save(), "{name}");
            let err = store.try_save().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert!(matches!(err, StoreError::NonScalarValue { ref key, .. } if key == "x"));

            assert_eq!(fs::read_to_string(&path).unwrap(), before, "{name}");
            assert_eq!(file_store(&dir, name)["x"], Value::Float(1.5));
        }
    }

    #[test]
    fn save_refuses_nested_infinity() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir, "s.json");
        store.set("limits", vec![1.0, 2.0]).unwrap();
        store.get_mut("limits").and_then(Value::as_seq_mut).unwrap()[1] =
            Value::Float(f64::INFINITY);

        let err = store.try_save().unwrap_err();
        assert!(matches!(err, StoreError::NonScalarValue { ref key, .. } if key == "limits.1"));
        assert!(!dir.path().join("s.json").exists());
    }

    #[test]
    fn saved_json_is_pretty_with_four_spaces() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir, "s.json");
        store.set("url", "http://x/y").unwrap();
        assert!(store.save());

        let text = fs::read_to_string(dir.path().join("s.json")).unwrap();
        assert_eq!(text, "{\n    \"url\": \"http://x/y\"\n}");
    }

    #[test]
    fn escape_option_applies_to_saved_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.json");
        let mut store = Store::builder().file(&path).escape_slashes(true).open().unwrap();
        store.set("url", "http://x/y").unwrap();
        assert!(store.save());
        assert!(fs::read_to_string(&path).unwrap().contains(r#"http:\/\/x\/y"#));
    }

    #[test]
    fn every_format_survives_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        for name in ["s.json", "s.xml", "s.yml", "s.php"] {
            let mut store = file_store(&dir, name);
            store.set_many(sample_tree()).unwrap();
            assert!(store.save(), "{name}");

            let reopened = file_store(&dir, name);
            assert_same_tree(reopened.to_map(), &sample_tree());
        }
    }

    #[test]
    fn counter_survives_reopen_as_integer() {
        let dir = TempDir::new().unwrap();
        for name in ["c.json", "c.xml", "c.yml", "c.php"] {
            let mut store = file_store(&dir, name);
            store.increment_by("runs", 41).unwrap();
            assert!(store.save());

            let mut reopened = file_store(&dir, name);
            assert_eq!(reopened.increment("runs").unwrap(), 42, "{name}");
        }
    }

    #[test]
    fn xml_save_uses_configured_root() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.xml");
        let mut store = Store::builder().file(&path).root("settings").open().unwrap();
        store.set("a", 1).unwrap();
        assert!(store.save());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<settings>"));
        assert!(text.contains("\n    <a type=\"int\">1</a>\n"));
    }

    #[test]
    fn php_save_starts_with_open_tag() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir, "s.php");
        store.set("a", 1).unwrap();
        assert!(store.save());
        let text = fs::read_to_string(dir.path().join("s.php")).unwrap();
        assert!(text.starts_with("<?php"));
    }

    #[test]
    fn explicit_type_overrides_extension_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.txt");
        let mut store = Store::builder().file(&path).format(Format::Yaml).open().unwrap();
        store.set("a", 1).unwrap();
        assert!(store.save());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");
    }

    // --- handle ---

    #[test]
    fn handle_set_get_and_list() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir, "s.json");

        let result = store
            .handle(&StoreAction::Set {
                key: "database.port".into(),
                value: "5432".into(),
            })
            .unwrap();
        assert_eq!(
            result,
            StoreResult::ValueSet {
                key: "database.port".into(),
                value: Value::Int(5432),
                saved: true,
            }
        );

        let result = store
            .handle(&StoreAction::Get {
                key: "database.port".into(),
            })
            .unwrap();
        assert_eq!(result.to_string(), "database.port = 5432");

        let result = store.handle(&StoreAction::List).unwrap();
        assert_eq!(result.to_string(), "database.port = 5432");

        let reopened = file_store(&dir, "s.json");
        assert_eq!(
            reopened.get_path(&["database", "port"]),
            Some(&Value::Int(5432))
        );
    }

    #[test]
    fn handle_get_missing() {
        let mut store = Store::new();
        let result = store
            .handle(&StoreAction::Get { key: "nope".into() })
            .unwrap();
        assert_eq!(result, StoreResult::Missing { key: "nope".into() });
    }

    #[test]
    fn handle_counter_and_unset() {
        let dir = TempDir::new().unwrap();
        let mut store = file_store(&dir, "s.yml");

        let result = store
            .handle(&StoreAction::Increment {
                key: "runs".into(),
                by: 5,
            })
            .unwrap();
        assert_eq!(result.to_string(), "runs = 5");

        let result = store
            .handle(&StoreAction::Decrement {
                key: "runs".into(),
                by: 2,
            })
            .unwrap();
        assert_eq!(result.to_string(), "runs = 3");

        let result = store
            .handle(&StoreAction::Unset { key: "runs".into() })
            .unwrap();
        assert_eq!(result.to_string(), "Unset runs");
        assert!(file_store(&dir, "s.yml").is_empty());
    }

    #[test]
    fn handle_without_file_reports_unsaved() {
        let mut store = Store::new();
        let result = store.handle(&StoreAction::Clear).unwrap();
        assert_eq!(result, StoreResult::Cleared { saved: false });
        assert_eq!(result.to_string(), "Cleared all keys (not saved)");
    }

    #[test]
    fn handle_export() {
        let mut store = Store::new();
        store.set("a", 1).unwrap();
        let result = store
            .handle(&StoreAction::Export {
                format: Format::Yaml,
                pretty: false,
            })
            .unwrap();
        assert_eq!(result, StoreResult::Exported("a: 1\n".into()));
    }

    #[test]
    fn handle_increment_error_propagates() {
        let mut store = Store::new();
        store.set("foo", "bar").unwrap();
        let err = store
            .handle(&StoreAction::Increment {
                key: "foo".into(),
                by: 1,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
