use std::fmt;
use std::hash::{Hash, Hasher};

/// PHP array keys are either integers or (non-integer-looking) strings.
/// A string key whose contents look like a canonical decimal integer is
/// always normalized to the `Integer` variant before it reaches this type.
#[derive(Debug, Clone)]
pub enum ArrayKey {
    Integer(i64),
    String(String),
}

impl ArrayKey {
    /// Normalize a raw key the way PHP does on array write: `"0"`, `"-5"` and
    /// similar canonical integer strings become integer keys; everything
    /// else, including `"01"` and `"1.0"`, stays a string key.
    pub fn normalize_str(s: &str) -> ArrayKey {
        if Self::looks_canonical_int(s) {
            if let Ok(n) = s.parse::<i64>() {
                return ArrayKey::Integer(n);
            }
        }
        ArrayKey::String(s.to_string())
    }

    fn looks_canonical_int(s: &str) -> bool {
        let bytes = s.as_bytes();
        if bytes.is_empty() {
            return false;
        }
        let (neg, digits) = if bytes[0] == b'-' { (true, &bytes[1..]) } else { (false, bytes) };
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return false;
        }
        if digits.len() > 1 && digits[0] == b'0' {
            return false;
        }
        if neg && digits == b"0" {
            return false;
        }
        true
    }
}

impl PartialEq for ArrayKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArrayKey::Integer(a), ArrayKey::Integer(b)) => a == b,
            (ArrayKey::String(a), ArrayKey::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ArrayKey {}

impl Hash for ArrayKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ArrayKey::Integer(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            ArrayKey::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Integer(n) => write!(f, "{n}"),
            ArrayKey::String(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_canonical_integers() {
        assert_eq!(ArrayKey::normalize_str("0"), ArrayKey::Integer(0));
        assert_eq!(ArrayKey::normalize_str("-5"), ArrayKey::Integer(-5));
        assert_eq!(ArrayKey::normalize_str("42"), ArrayKey::Integer(42));
    }

    #[test]
    fn keeps_non_canonical_strings() {
        assert_eq!(
            ArrayKey::normalize_str("01"),
            ArrayKey::String("01".to_string())
        );
        assert_eq!(
            ArrayKey::normalize_str("-0"),
            ArrayKey::String("-0".to_string())
        );
        assert_eq!(
            ArrayKey::normalize_str("1.0"),
            ArrayKey::String("1.0".to_string())
        );
    }
}
