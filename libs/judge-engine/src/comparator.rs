/// Output Comparator - Structural, Type-Strict Equality
///
/// This is the scoring oracle: any leniency here silently changes verdicts.
///
/// **Rules:**
/// - Primitives compare by value and type (`5 != "5"`, `0 != false`)
/// - Numbers compare numerically (`10 == 10.0`), JSON has a single number type
/// - Sequences: same length, element-wise, order-sensitive
/// - Mappings: same key set, per-key equality, insertion order ignored
/// - A missing output ("undefined") never equals anything, not even `null`

use serde_json::{Number, Value};

/// Structural equality between two JSON values
pub fn equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| equal(x, y)))
        }
        _ => false,
    }
}

/// Compare what the candidate produced against the expected value.
/// `None` is the candidate returning nothing at all.
pub fn outputs_match(actual: Option<&Value>, expected: &Value) -> bool {
    actual.map_or(false, |value| equal(value, expected))
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sequences_are_order_sensitive() {
        assert!(equal(&json!([1, 2, 3]), &json!([1, 2, 3])));
        assert!(!equal(&json!([1, 2, 3]), &json!([3, 2, 1])));
        assert!(!equal(&json!([1, 2]), &json!([1, 2, 3])));
        assert!(equal(&json!([]), &json!([])));
    }

    #[test]
    fn test_mappings_ignore_key_order() {
        assert!(equal(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
        assert!(!equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!equal(&json!({"a": 1, "c": 2}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_primitives_are_type_strict() {
        assert!(!equal(&json!(5), &json!("5")));
        assert!(!equal(&json!(0), &json!(false)));
        assert!(!equal(&json!(1), &json!(true)));
        assert!(!equal(&json!(""), &json!(null)));
        assert!(!equal(&json!(null), &json!(false)));
        assert!(!equal(&json!([]), &json!({})));
        assert!(equal(&json!("abc"), &json!("abc")));
        assert!(!equal(&json!("abc"), &json!("ABC")));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(equal(&json!(10), &json!(10.0)));
        assert!(equal(&json!(-3), &json!(-3)));
        assert!(!equal(&json!(-3), &json!(3)));
        assert!(!equal(&json!(0.1), &json!(0.10000001)));
        assert!(equal(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!equal(&json!(u64::MAX), &json!(-1)));
    }

    #[test]
    fn test_nested_structures_recurse() {
        let a = json!({"users": [{"name": "ada", "tags": ["x", "y"]}], "count": 1});
        let b = json!({"count": 1, "users": [{"tags": ["x", "y"], "name": "ada"}]});
        let c = json!({"count": 1, "users": [{"tags": ["y", "x"], "name": "ada"}]});
        assert!(equal(&a, &b));
        assert!(!equal(&a, &c));
    }

    #[test]
    fn test_undefined_never_matches() {
        assert!(!outputs_match(None, &json!(null)));
        assert!(outputs_match(Some(&json!(null)), &json!(null)));
        assert!(outputs_match(Some(&json!(10)), &json!(10)));
    }
}
