#[cfg(test)]
pub mod test {
    use serde::{Serialize, Serializer};

    use crate::value::{Map, Value};

    /// A value with no scalar representation: it serializes as raw bytes,
    /// the way a handle or binary blob would.
    pub struct Opaque;

    impl Serialize for Opaque {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_bytes(&[0xde, 0xad, 0xbe, 0xef])
        }
    }

    /// A tree touching every variant and the awkward corners of each format:
    /// URLs (slash escaping), markup characters, multi-line and padded text,
    /// number-looking strings, keys that are not XML names, empty containers
    /// of both kinds and nested lists.
    pub fn sample_tree() -> Map {
        let mut database = Map::new();
        database.insert(
            "url".into(),
            Value::from("postgres://db.example.com/app?sslmode=require"),
        );
        database.insert("pool_size".into(), Value::Int(5));
        database.insert("timeout".into(), Value::Float(2.5));
        database.insert("replica".into(), Value::Null);

        let mut first = Map::new();
        first.insert("name".into(), Value::from("alpha"));
        first.insert("weight".into(), Value::Float(1.0));

        let mut tree = Map::new();
        tree.insert("name".into(), Value::from("kvfile"));
        tree.insert("count".into(), Value::Int(3));
        tree.insert("negative".into(), Value::Int(-42));
        tree.insert("ratio".into(), Value::Float(0.1));
        tree.insert("big".into(), Value::Float(1e300));
        tree.insert("enabled".into(), Value::Bool(true));
        tree.insert("disabled".into(), Value::Bool(false));
        tree.insert("nothing".into(), Value::Null);
        tree.insert("empty".into(), Value::from(""));
        tree.insert("numeric_text".into(), Value::from("123"));
        tree.insert("bool_text".into(), Value::from("true"));
        tree.insert("markup".into(), Value::from("<b>\"it's\" & more</b>"));
        tree.insert("quote's \\ key".into(), Value::from("back\\slash"));
        tree.insert("multi".into(), Value::from("line one\nline two\n"));
        tree.insert("padded".into(), Value::from("  spaced  "));
        tree.insert("unicode".into(), Value::from("héllo ✓"));
        tree.insert("database".into(), Value::Map(database));
        tree.insert(
            "tags".into(),
            Value::from(vec![Value::from("a"), Value::Int(2), Value::Bool(false)]),
        );
        tree.insert(
            "matrix".into(),
            Value::from(vec![
                Value::from(vec![1, 2]),
                Value::from(vec![3]),
                Value::Seq(vec![]),
            ]),
        );
        tree.insert("records".into(), Value::from(vec![Value::Map(first)]));
        tree.insert("empty_map".into(), Value::Map(Map::new()));
        tree.insert("empty_list".into(), Value::Seq(vec![]));
        tree
    }

    /// Assert equality including key order at every level.
    pub fn assert_same_tree(actual: &Map, expected: &Map) {
        assert_eq!(actual, expected);
        assert_same_order(&Value::Map(actual.clone()), &Value::Map(expected.clone()));
    }

    fn assert_same_order(actual: &Value, expected: &Value) {
        match (actual, expected) {
            (Value::Map(a), Value::Map(e)) => {
                let a_keys: Vec<&String> = a.keys().collect();
                let e_keys: Vec<&String> = e.keys().collect();
                assert_eq!(a_keys, e_keys);
                for (key, value) in e {
                    assert_same_order(&a[key], value);
                }
            }
            (Value::Seq(a), Value::Seq(e)) => {
                for (a, e) in a.iter().zip(e) {
                    assert_same_order(a, e);
                }
            }
            _ => {}
        }
    }
}
