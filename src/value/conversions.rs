use super::Value;
use std::cmp::Ordering;

/// Is `s` a PHP "numeric string" (optional sign, digits, optional decimal
/// part/exponent, optional surrounding whitespace)?
pub fn is_numeric_string(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return false;
    }
    let mut chars = trimmed.chars().peekable();
    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }
    let mut saw_digit = false;
    let mut saw_dot = false;
    let mut saw_exp = false;
    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' => {
                saw_digit = true;
                chars.next();
            }
            '.' if !saw_dot && !saw_exp => {
                saw_dot = true;
                chars.next();
            }
            'e' | 'E' if saw_digit && !saw_exp => {
                saw_exp = true;
                chars.next();
                if matches!(chars.peek(), Some('+') | Some('-')) {
                    chars.next();
                }
            }
            _ => break,
        }
    }
    saw_digit && chars.next().is_none()
}

impl Value {
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Reference(cell) => cell.borrow().to_bool(),
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty() && s != "0",
            Value::Array(a) => !a.is_empty(),
            Value::Object(_)
            | Value::Closure(_)
            | Value::EnumCase(_)
            | Value::Goroutine(_)
            | Value::WaitGroup(_)
            | Value::Generator(_)
            | Value::Resource(_) => true,
        }
    }

    pub fn to_int(&self) -> i64 {
        match self {
            Value::Reference(cell) => cell.borrow().to_int(),
            Value::Null => 0,
            Value::Bool(b) => *b as i64,
            Value::Int(n) => *n,
            Value::Float(f) => *f as i64,
            Value::Str(s) => Self::leading_numeric(s).map(|n| n as i64).unwrap_or(0),
            Value::Array(a) => {
                if a.is_empty() {
                    0
                } else {
                    1
                }
            }
            _ => 1,
        }
    }

    pub fn to_float(&self) -> f64 {
        match self {
            Value::Reference(cell) => cell.borrow().to_float(),
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
            Value::Str(s) => Self::leading_numeric(s).unwrap_or(0.0),
            Value::Array(a) => {
                if a.is_empty() {
                    0.0
                } else {
                    1.0
                }
            }
            _ => 1.0,
        }
    }

    /// Parse the longest numeric prefix of `s`, PHP's `"3abc"` -> `3` style
    /// leading-numeric coercion. Returns `None` for a fully non-numeric string.
    fn leading_numeric(s: &str) -> Option<f64> {
        let trimmed = s.trim_start();
        let mut end = 0;
        let bytes = trimmed.as_bytes();
        let mut saw_digit = false;
        let mut saw_dot = false;
        let mut saw_exp = false;
        let mut i = 0;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        while i < bytes.len() {
            match bytes[i] {
                b'0'..=b'9' => {
                    saw_digit = true;
                    i += 1;
                    end = i;
                }
                b'.' if !saw_dot && !saw_exp => {
                    saw_dot = true;
                    i += 1;
                    if saw_digit {
                        end = i;
                    }
                }
                b'e' | b'E' if saw_digit && !saw_exp => {
                    let mark = i;
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                        i += 1;
                    }
                    let exp_start = i;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    if i > exp_start {
                        end = i;
                    } else {
                        saw_exp = true;
                        i = mark;
                        break;
                    }
                }
                _ => break,
            }
        }
        if !saw_digit {
            return None;
        }
        trimmed[..end].parse::<f64>().ok()
    }

    /// PHP's `(string)` cast / string-context conversion. Object conversion
    /// (`__toString`) requires VM access and is handled by the caller before
    /// falling back to this for the other variants.
    pub fn to_php_string(&self) -> String {
        match self {
            Value::Reference(cell) => cell.borrow().to_php_string(),
            Value::Null => String::new(),
            Value::Bool(b) => {
                if *b {
                    "1".to_string()
                } else {
                    String::new()
                }
            }
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
            Value::Array(_) => "Array".to_string(),
            Value::EnumCase(e) => format!("{}::{}", e.enum_name, e.case_name),
            _ => String::new(),
        }
    }

    fn numeric_rank(&self) -> Option<f64> {
        match self {
            Value::Reference(cell) => cell.borrow().numeric_rank(),
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(_) | Value::Null => None,
            Value::Str(s) if is_numeric_string(s) => Some(Self::leading_numeric(s).unwrap_or(0.0)),
            _ => None,
        }
    }

    /// `==` loose equality.
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;
        let (a, b) = (self.deref_clone(), other.deref_clone());
        match (&a, &b) {
            (Null, Null) => true,
            (Null, Bool(x)) | (Bool(x), Null) => !x,
            (Null, _) | (_, Null) => !b.to_bool() && !a.to_bool(),
            (Bool(_), _) | (_, Bool(_)) => a.to_bool() == b.to_bool(),
            (Int(x), Int(y)) => x == y,
            (Float(x), Float(y)) => x == y,
            (Int(x), Float(y)) | (Float(y), Int(x)) => *x as f64 == *y,
            (Str(x), Str(y)) => {
                if is_numeric_string(x) && is_numeric_string(y) {
                    Self::leading_numeric(x) == Self::leading_numeric(y)
                } else {
                    x == y
                }
            }
            (Int(_), Str(_)) | (Str(_), Int(_)) | (Float(_), Str(_)) | (Str(_), Float(_)) => {
                match (a.numeric_rank(), b.numeric_rank()) {
                    (Some(x), Some(y)) => x == y,
                    _ => a.to_php_string() == b.to_php_string(),
                }
            }
            (Array(x), Array(y)) => x == y,
            (Object(x), Object(y)) => std::rc::Rc::ptr_eq(x, y) || objects_loosely_equal(x, y),
            (EnumCase(x), EnumCase(y)) => x.enum_name == y.enum_name && x.case_name == y.case_name,
            _ => false,
        }
    }

    /// `===` strict identity.
    pub fn identical(&self, other: &Value) -> bool {
        use Value::*;
        let (a, b) = (self.deref_clone(), other.deref_clone());
        match (&a, &b) {
            (Null, Null) => true,
            (Bool(x), Bool(y)) => x == y,
            (Int(x), Int(y)) => x == y,
            (Float(x), Float(y)) => x == y,
            (Str(x), Str(y)) => x == y,
            (Array(x), Array(y)) => x.identical(y),
            (Object(x), Object(y)) => std::rc::Rc::ptr_eq(x, y),
            (Closure(x), Closure(y)) => std::rc::Rc::ptr_eq(x, y),
            (EnumCase(x), EnumCase(y)) => x.enum_name == y.enum_name && x.case_name == y.case_name,
            (Goroutine(x), Goroutine(y)) => std::rc::Rc::ptr_eq(x, y),
            (WaitGroup(x), WaitGroup(y)) => std::rc::Rc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// `<=>` three-way comparison; `None` for the rare incomparable pairing
    /// (e.g. two arrays of different shapes under `<`/`>`).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        let (a, b) = (self.deref_clone(), other.deref_clone());
        match (&a, &b) {
            (Array(x), Array(y)) => {
                if x.len() != y.len() {
                    x.len().partial_cmp(&y.len())
                } else {
                    Some(Ordering::Equal)
                }
            }
            (Str(x), Str(y)) if !(is_numeric_string(x) && is_numeric_string(y)) => Some(x.cmp(y)),
            _ => a.to_float().partial_cmp(&b.to_float()),
        }
    }
}

fn objects_loosely_equal(
    a: &std::rc::Rc<std::cell::RefCell<super::ObjectData>>,
    b: &std::rc::Rc<std::cell::RefCell<super::ObjectData>>,
) -> bool {
    let (a, b) = (a.borrow(), b.borrow());
    a.class_name == b.class_name
        && a.properties.len() == b.properties.len()
        && a.properties
            .iter()
            .all(|(k, v)| b.properties.get(k).is_some_and(|ov| v.loose_eq(ov)))
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF".to_string() } else { "-INF".to_string() };
    }
    if f == f.trunc() && f.abs() < 1e15 {
        format!("{f}")
    } else {
        let s = format!("{f:.14e}");
        s
    }
}
