//! Query-string normalization.
//!
//! Keys nest with bracket syntax (`where[title][equals]=x`, `tags[]=a`,
//! `items[0]=b`) and every scalar value is coerced: numeric-looking strings
//! become numbers and `true`/`false` become booleans.

use serde_json::{Map, Number, Value};
use url::form_urlencoded;

/// Indexed keys above this become object keys instead of array positions
pub const ARRAY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Push,
    Index(usize),
}

pub fn normalize_query(raw: &str) -> Map<String, Value> {
    let mut root = Value::Object(Map::new());

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        let segments = split_key(&key);
        assign(&mut root, &segments, coerce(&value));
    }

    match root {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Coerce a single decoded value
pub fn coerce(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    parse_number(raw).unwrap_or_else(|| Value::String(raw.to_string()))
}

fn parse_number(raw: &str) -> Option<Value> {
    if raw.is_empty() || !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
    {
        return None;
    }

    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<i64>() {
            return Some(Value::Number(n.into()));
        }
    }

    let f = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}

/// `a[b][]` → [Key(a), Key(b), Push]. Malformed brackets keep the whole key literal.
fn split_key(key: &str) -> Vec<Segment> {
    let Some(open) = key.find('[') else {
        return vec![Segment::Key(key.to_string())];
    };
    if open == 0 {
        return vec![Segment::Key(key.to_string())];
    }

    let mut segments = vec![Segment::Key(key[..open].to_string())];
    let mut rest = &key[open..];

    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return vec![Segment::Key(key.to_string())];
        };
        let name = &inner[..close];
        segments.push(bracket_segment(name));
        rest = &inner[close + 1..];
    }

    // Trailing text after the last bracket is kept as one more key
    if !rest.is_empty() {
        segments.push(Segment::Key(rest.to_string()));
    }
    segments
}

fn bracket_segment(name: &str) -> Segment {
    if name.is_empty() {
        return Segment::Push;
    }
    match name.parse::<usize>() {
        Ok(i) if i <= ARRAY_LIMIT && name.bytes().all(|b| b.is_ascii_digit()) => Segment::Index(i),
        _ => Segment::Key(name.to_string()),
    }
}

fn assign(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        set_leaf(target, head, value);
        return;
    }

    let wants_array = matches!(rest[0], Segment::Push | Segment::Index(_));
    let child = child_slot(target, head, wants_array);
    assign(child, rest, value);
}

fn set_leaf(target: &mut Value, segment: &Segment, value: Value) {
    match (target, segment) {
        (Value::Array(items), Segment::Push) => items.push(value),
        (Value::Array(items), Segment::Index(i)) => {
            if *i < items.len() {
                merge_duplicate(&mut items[*i], value);
            } else {
                items.push(value);
            }
        }
        (target, segment) => {
            let map = as_object(target);
            let key = object_key(map, segment);
            match map.get_mut(&key) {
                Some(existing) => merge_duplicate(existing, value),
                None => {
                    map.insert(key, value);
                }
            }
        }
    }
}

/// Repeated keys collect into an array
fn merge_duplicate(existing: &mut Value, value: Value) {
    match existing {
        Value::Array(items) => items.push(value),
        other => {
            let first = std::mem::take(other);
            *other = Value::Array(vec![first, value]);
        }
    }
}

fn child_slot<'a>(target: &'a mut Value, segment: &Segment, wants_array: bool) -> &'a mut Value {
    let empty = || {
        if wants_array {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        }
    };

    if target.is_array() && !matches!(segment, Segment::Key(_)) {
        if let Value::Array(items) = target {
            let idx = match segment {
                Segment::Index(i) if *i < items.len() => *i,
                _ => {
                    items.push(empty());
                    items.len() - 1
                }
            };
            let slot = &mut items[idx];
            if !slot.is_object() && !slot.is_array() {
                *slot = empty();
            }
            return slot;
        }
    }

    let map = as_object(target);
    let key = object_key(map, segment);
    let slot = map.entry(key).or_insert_with(empty);
    if !slot.is_object() && !slot.is_array() {
        *slot = empty();
    }
    if !wants_array && slot.is_array() {
        as_object(slot);
    }
    slot
}

/// View `value` as an object, turning arrays into index-keyed objects and scalars into `{}`
fn as_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        let converted = match std::mem::take(value) {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Map::new(),
        };
        *value = Value::Object(converted);
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just converted to an object"),
    }
}

fn object_key(map: &Map<String, Value>, segment: &Segment) -> String {
    match segment {
        Segment::Key(k) => k.clone(),
        Segment::Index(i) => i.to_string(),
        Segment::Push => map.len().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn q(raw: &str) -> Value {
        Value::Object(normalize_query(raw))
    }

    #[test]
    fn scalars_are_coerced() {
        assert_eq!(
            q("limit=10&ratio=0.5&neg=-3&draft=true&hidden=false&title=hello"),
            json!({ "limit": 10, "ratio": 0.5, "neg": -3, "draft": true, "hidden": false, "title": "hello" })
        );
    }

    #[test]
    fn non_numeric_lookalikes_stay_strings() {
        assert_eq!(
            q("a=NaN&b=inf&c=1.2.3&d=&e=-&f=0x1A&g=True&h=12abc"),
            json!({ "a": "NaN", "b": "inf", "c": "1.2.3", "d": "", "e": "-", "f": "0x1A", "g": "True", "h": "12abc" })
        );
    }

    #[test]
    fn exponent_and_large_numbers() {
        assert_eq!(q("a=1e3"), json!({ "a": 1000.0 }));
        assert_eq!(q("a=99999999999999999999"), json!({ "a": 1e20 }));
    }

    #[test]
    fn nested_keys_coerce_at_any_depth() {
        assert_eq!(
            q("where[price][greater_than]=5&where[published][equals]=true&where[title][like]=rust"),
            json!({
                "where": {
                    "price": { "greater_than": 5 },
                    "published": { "equals": true },
                    "title": { "like": "rust" }
                }
            })
        );
    }

    #[test]
    fn push_and_index_build_arrays() {
        assert_eq!(q("tags[]=a&tags[]=2"), json!({ "tags": ["a", 2] }));
        assert_eq!(q("ids[0]=x&ids[1]=y"), json!({ "ids": ["x", "y"] }));
        assert_eq!(q("ids[1]=x&ids[3]=y"), json!({ "ids": ["x", "y"] }));
    }

    #[test]
    fn indexed_objects_nest_inside_arrays() {
        assert_eq!(
            q("where[or][0][title][equals]=a&where[or][1][title][equals]=b"),
            json!({ "where": { "or": [ { "title": { "equals": "a" } }, { "title": { "equals": "b" } } ] } })
        );
    }

    #[test]
    fn repeated_plain_keys_collect() {
        assert_eq!(q("a=1&a=2&a=x"), json!({ "a": [1, 2, "x"] }));
    }

    #[test]
    fn large_indexes_become_object_keys() {
        assert_eq!(q("a[25]=x"), json!({ "a": { "25": "x" } }));
    }

    #[test]
    fn percent_decoding_and_plus() {
        assert_eq!(
            q("title=hello+world&where%5Bslug%5D%5Bequals%5D=a%2Fb"),
            json!({ "title": "hello world", "where": { "slug": { "equals": "a/b" } } })
        );
    }

    #[test]
    fn malformed_brackets_stay_literal() {
        assert_eq!(q("a[b=1"), json!({ "a[b": 1 }));
        assert_eq!(q("[x]=1"), json!({ "[x]": 1 }));
    }

    #[test]
    fn empty_query() {
        assert!(normalize_query("").is_empty());
        assert!(normalize_query("&&=x").is_empty());
    }
}
