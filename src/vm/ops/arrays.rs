use crate::value::{ArrayKey, PhpArray, Value};

pub fn key_from_value(v: &Value) -> ArrayKey {
    match v.deref_clone() {
        Value::Int(n) => ArrayKey::Integer(n),
        Value::Str(s) => ArrayKey::normalize_str(&s),
        Value::Bool(b) => ArrayKey::Integer(b as i64),
        Value::Float(f) => ArrayKey::Integer(f as i64),
        Value::Null => ArrayKey::String(String::new()),
        other => ArrayKey::String(other.to_php_string()),
    }
}

pub fn get(array: &Value, key: &Value) -> Value {
    match array.deref_clone() {
        Value::Array(a) => a.get(&key_from_value(key)).cloned().unwrap_or(Value::Null),
        Value::Str(s) => {
            let idx = key.to_int();
            if idx >= 0 {
                s.as_bytes()
                    .get(idx as usize)
                    .map(|b| Value::Str((*b as char).to_string()))
                    .unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

/// Write `array[key] = value`, autovivifying `array` into an empty array
/// if it was `null`.
pub fn set(array: &mut Value, key: &Value, value: Value) {
    if matches!(array, Value::Null) {
        *array = Value::Array(PhpArray::new());
    }
    if let Value::Array(a) = array {
        a.insert(key_from_value(key), value);
    }
}

pub fn append(array: &mut Value, value: Value) {
    if matches!(array, Value::Null) {
        *array = Value::Array(PhpArray::new());
    }
    if let Value::Array(a) = array {
        a.append(value);
    }
}

pub fn unset(array: &mut Value, key: &Value) {
    if let Value::Array(a) = array {
        a.remove(&key_from_value(key));
    }
}

pub fn isset(array: &Value, key: &Value) -> bool {
    match array.deref_clone() {
        Value::Array(a) => a.get(&key_from_value(key)).map(|v| !v.is_null()).unwrap_or(false),
        _ => false,
    }
}
