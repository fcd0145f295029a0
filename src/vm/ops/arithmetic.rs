use crate::ast::{BinaryOp, CastKind, UnaryOp};
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{ArrayKey, PhpArray, Value};

pub fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
    use BinaryOp::*;
    let l = left.deref_clone();
    let r = right.deref_clone();
    Ok(match op {
        Add => match (&l, &r) {
            (Value::Array(a), Value::Array(b)) => Value::Array(array_union(a, b)),
            _ => numeric_result(l.to_float() + r.to_float(), &l, &r),
        },
        Sub => numeric_result(l.to_float() - r.to_float(), &l, &r),
        Mul => numeric_result(l.to_float() * r.to_float(), &l, &r),
        Div => {
            let rf = r.to_float();
            if rf == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            let result = l.to_float() / rf;
            if result.fract() == 0.0 && matches!(l, Value::Int(_)) && matches!(r, Value::Int(_)) {
                Value::Int(result as i64)
            } else {
                Value::Float(result)
            }
        }
        Mod => {
            let ri = r.to_int();
            if ri == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Value::Int(l.to_int() % ri)
        }
        Pow => Value::Float(l.to_float().powf(r.to_float())),
        Concat => Value::Str(format!("{}{}", l.to_php_string(), r.to_php_string())),
        BitAnd => Value::Int(l.to_int() & r.to_int()),
        BitOr => Value::Int(l.to_int() | r.to_int()),
        BitXor => Value::Int(l.to_int() ^ r.to_int()),
        ShiftLeft => Value::Int(l.to_int() << r.to_int()),
        ShiftRight => Value::Int(l.to_int() >> r.to_int()),
        Equal => Value::Bool(l.loose_eq(&r)),
        NotEqual => Value::Bool(!l.loose_eq(&r)),
        Identical => Value::Bool(l.identical(&r)),
        NotIdentical => Value::Bool(!l.identical(&r)),
        LessThan => Value::Bool(l.compare(&r).map(|o| o.is_lt()).unwrap_or(false)),
        GreaterThan => Value::Bool(l.compare(&r).map(|o| o.is_gt()).unwrap_or(false)),
        LessEqual => Value::Bool(l.compare(&r).map(|o| o.is_le()).unwrap_or(false)),
        GreaterEqual => Value::Bool(l.compare(&r).map(|o| o.is_ge()).unwrap_or(false)),
        Spaceship => Value::Int(match l.compare(&r) {
            Some(std::cmp::Ordering::Less) => -1,
            Some(std::cmp::Ordering::Equal) => 0,
            Some(std::cmp::Ordering::Greater) => 1,
            None => 0,
        }),
        And => Value::Bool(l.to_bool() && r.to_bool()),
        Or => Value::Bool(l.to_bool() || r.to_bool()),
        Xor => Value::Bool(l.to_bool() ^ r.to_bool()),
        NullCoalesce => if l.is_null() { r } else { l },
    })
}

fn numeric_result(result: f64, l: &Value, r: &Value) -> Value {
    let both_int = matches!(l, Value::Int(_) | Value::Bool(_) | Value::Null)
        && matches!(r, Value::Int(_) | Value::Bool(_) | Value::Null)
        && result.fract() == 0.0
        && result.abs() < i64::MAX as f64;
    if both_int {
        Value::Int(result as i64)
    } else {
        Value::Float(result)
    }
}

fn array_union(a: &PhpArray, b: &PhpArray) -> PhpArray {
    let mut out = a.clone();
    for (key, value) in b.iter() {
        if !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

pub fn unary_op(op: UnaryOp, value: &mut Value) -> RuntimeResult<Value> {
    use UnaryOp::*;
    match op {
        Neg => Ok(negate(&value.deref_clone())),
        Plus => Ok(promote_numeric(&value.deref_clone())),
        Not => Ok(Value::Bool(!value.deref_clone().to_bool())),
        BitNot => Ok(Value::Int(!value.deref_clone().to_int())),
        PreInc => {
            let next = increment(&value.deref_clone());
            Value::write_in_place(value, next.clone());
            Ok(next)
        }
        PreDec => {
            let next = decrement(&value.deref_clone());
            Value::write_in_place(value, next.clone());
            Ok(next)
        }
        PostInc => {
            let current = value.deref_clone();
            Value::write_in_place(value, increment(&current));
            Ok(current)
        }
        PostDec => {
            let current = value.deref_clone();
            Value::write_in_place(value, decrement(&current));
            Ok(current)
        }
    }
}

fn negate(v: &Value) -> Value {
    match v {
        Value::Int(n) => Value::Int(-n),
        other => Value::Float(-other.to_float()),
    }
}

fn promote_numeric(v: &Value) -> Value {
    match v {
        Value::Int(n) => Value::Int(*n),
        Value::Float(f) => Value::Float(*f),
        other => Value::Int(other.to_int()),
    }
}

/// `++` on a non-numeric string does PHP's alphanumeric increment
/// (`"a" -> "b"`, `"z" -> "aa"`); everything else goes through the numeric
/// path.
fn increment(v: &Value) -> Value {
    match v {
        Value::Null => Value::Int(1),
        Value::Int(n) => Value::Int(n.wrapping_add(1)),
        Value::Float(f) => Value::Float(f + 1.0),
        Value::Str(s) if s.is_empty() => Value::Str("1".to_string()),
        Value::Str(s) if crate::value::is_numeric_string(s) => {
            if let Ok(n) = s.parse::<i64>() {
                Value::Int(n + 1)
            } else {
                Value::Float(s.parse::<f64>().unwrap_or(0.0) + 1.0)
            }
        }
        Value::Str(s) => Value::Str(alphanumeric_increment(s)),
        other => other.clone(),
    }
}

fn decrement(v: &Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::Int(n) => Value::Int(n.wrapping_sub(1)),
        Value::Float(f) => Value::Float(f - 1.0),
        Value::Str(s) if crate::value::is_numeric_string(s) => {
            if let Ok(n) = s.parse::<i64>() {
                Value::Int(n - 1)
            } else {
                Value::Float(s.parse::<f64>().unwrap_or(0.0) - 1.0)
            }
        }
        other => other.clone(),
    }
}

fn alphanumeric_increment(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    let mut i = chars.len();
    while i > 0 {
        i -= 1;
        let c = chars[i];
        match c {
            '0'..='8' | 'a'..='y' | 'A'..='Y' => {
                chars[i] = ((c as u8) + 1) as char;
                return chars.into_iter().collect();
            }
            '9' => {
                chars[i] = '0';
            }
            'z' => {
                chars[i] = 'a';
            }
            'Z' => {
                chars[i] = 'A';
            }
            _ => return chars.into_iter().collect(),
        }
    }
    let lead = match chars.first() {
        Some(c) if c.is_ascii_digit() => '1',
        Some(c) if c.is_ascii_uppercase() => 'A',
        _ => 'a',
    };
    chars.insert(0, lead);
    chars.into_iter().collect()
}

pub fn cast(kind: CastKind, value: &Value) -> Value {
    let v = value.deref_clone();
    match kind {
        CastKind::Int => Value::Int(v.to_int()),
        CastKind::Float => Value::Float(v.to_float()),
        CastKind::String => Value::Str(v.to_php_string()),
        CastKind::Bool => Value::Bool(v.to_bool()),
        CastKind::Array => match v {
            Value::Array(a) => Value::Array(a),
            Value::Null => Value::Array(PhpArray::new()),
            other => {
                let mut arr = PhpArray::new();
                arr.insert(ArrayKey::Integer(0), other);
                Value::Array(arr)
            }
        },
        CastKind::Object => v,
    }
}
