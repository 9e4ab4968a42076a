//! Dotted field paths and strict value comparison

use serde_json::Value;

/// Resolve a path like `user.email` or `articles[0].slug` inside `body`.
///
/// Returns `None` when a segment is missing or an intermediate value is a
/// scalar, null or otherwise falsy.
pub fn resolve<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    let normalized = rewrite_indexes(path);

    normalized.split('.').try_fold(body, |current, segment| {
        if is_falsy(current) {
            return None;
        }
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => array_index(segment).and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Canonical array index: ASCII digits without sign or leading zero
fn array_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if canonical {
        segment.parse().ok()
    } else {
        None
    }
}

/// `a[0][1].b` becomes `a.0.1.b`
fn rewrite_indexes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '[' {
            out.push(c);
            continue;
        }
        let mut index = String::new();
        let mut closed = false;
        for inner in chars.by_ref() {
            if inner == ']' {
                closed = true;
                break;
            }
            index.push(inner);
        }
        if closed && !index.is_empty() && index.chars().all(|d| d.is_ascii_digit()) {
            out.push('.');
            out.push_str(&index);
        } else {
            out.push('[');
            out.push_str(&index);
            if closed {
                out.push(']');
            }
        }
    }

    out
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0 || f.is_nan()).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Strict equality in the JavaScript `===` sense.
///
/// Primitives compare by type and value with numbers compared numerically.
/// Objects and arrays compare by identity, so a freshly supplied expected
/// value never equals one taken from a response.
pub fn strict_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn sample() -> Value {
        json!({
            "user": {"email": "a@b.c", "token": "t", "bio": null, "verified": false},
            "articles": [{"slug": "first", "tags": ["x", "y"]}, {"slug": "second"}],
            "count": 0
        })
    }

    #[test_case("user.email", Some(json!("a@b.c")) ; "nested key")]
    #[test_case("articles[1].slug", Some(json!("second")) ; "array index")]
    #[test_case("articles.0.tags[1]", Some(json!("y")) ; "dotted index")]
    #[test_case("user.bio", Some(json!(null)) ; "null leaf")]
    #[test_case("user.missing", None ; "missing key")]
    #[test_case("user.email.length", None ; "through a string")]
    #[test_case("user.bio.x", None ; "through null")]
    #[test_case("user.verified.x", None ; "through false")]
    #[test_case("count.x", None ; "through zero")]
    #[test_case("articles[9].slug", None ; "index out of range")]
    #[test_case("articles[x]", None ; "malformed index")]
    #[test_case("articles.+1.slug", None ; "signed index")]
    #[test_case("articles.01.slug", None ; "leading zero index")]
    #[test_case("articles[01].slug", None ; "leading zero in brackets")]
    #[test_case("articles.0.slug", Some(json!("first")) ; "zero index")]
    fn test_resolve(path: &str, expected: Option<Value>) {
        let body = sample();
        assert_eq!(resolve(&body, path).cloned(), expected);
    }

    #[test]
    fn test_rewrite_indexes() {
        assert_eq!(rewrite_indexes("a[0][12].b"), "a.0.12.b");
        assert_eq!(rewrite_indexes("a[b]"), "a[b]");
        assert_eq!(rewrite_indexes("a[0"), "a[0");
    }

    #[test]
    fn test_strict_equality() {
        assert!(strict_equals(&json!(1), &json!(1.0)));
        assert!(strict_equals(&json!("x"), &json!("x")));
        assert!(strict_equals(&json!(null), &json!(null)));
        assert!(!strict_equals(&json!("1"), &json!(1)));
        assert!(!strict_equals(&json!(true), &json!(1)));
        assert!(!strict_equals(&json!({"a": 1}), &json!({"a": 1})));
        assert!(!strict_equals(&json!([1]), &json!([1])));
    }
}
