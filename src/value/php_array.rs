use super::array_key::ArrayKey;
use super::Value;
use std::collections::HashMap;

/// PHP's ordered int/string map.
///
/// Entries keep insertion order; `unset()` leaves a tombstone rather than
/// shifting later entries, so iterator positions taken before an unset stay
/// valid. `next_index` only ever advances — it tracks one past the largest
/// integer key ever inserted, not the current maximum, so `$a[] = x` after
/// unsetting the tail does not reuse a freed index.
#[derive(Debug, Clone, Default)]
pub struct PhpArray {
    entries: Vec<Option<(ArrayKey, Value)>>,
    index: HashMap<ArrayKey, usize>,
    next_index: i64,
}

impl PhpArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn next_index(&self) -> i64 {
        self.next_index
    }

    fn bump_next_index(&mut self, key: &ArrayKey) {
        if let ArrayKey::Integer(n) = key {
            if *n >= self.next_index {
                self.next_index = n.saturating_add(1);
            }
        }
    }

    /// Insert or overwrite `key`, preserving its original position on overwrite.
    pub fn insert(&mut self, key: ArrayKey, value: Value) {
        self.bump_next_index(&key);
        if let Some(&pos) = self.index.get(&key) {
            self.entries[pos] = Some((key, value));
        } else {
            let pos = self.entries.len();
            self.index.insert(key.clone(), pos);
            self.entries.push(Some((key, value)));
        }
    }

    /// `$a[] = value` — append at the next integer index and advance it.
    pub fn append(&mut self, value: Value) -> ArrayKey {
        let key = ArrayKey::Integer(self.next_index);
        self.insert(key.clone(), value);
        key
    }

    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.index
            .get(key)
            .and_then(|&pos| self.entries[pos].as_ref().map(|(_, v)| v))
    }

    pub fn get_mut(&mut self, key: &ArrayKey) -> Option<&mut Value> {
        if let Some(&pos) = self.index.get(key) {
            self.entries[pos].as_mut().map(|(_, v)| v)
        } else {
            None
        }
    }

    /// Get-or-insert a slot for autovivification (`$a["x"]["y"] = 1`).
    pub fn get_or_insert_with(&mut self, key: ArrayKey, default: impl FnOnce() -> Value) -> &mut Value {
        if !self.index.contains_key(&key) {
            self.insert(key.clone(), default());
        }
        self.get_mut(&key).expect("just inserted")
    }

    pub fn remove(&mut self, key: &ArrayKey) -> Option<Value> {
        if let Some(pos) = self.index.remove(key) {
            self.entries[pos].take().map(|(_, v)| v)
        } else {
            None
        }
    }

    pub fn contains_key(&self, key: &ArrayKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArrayKey, &Value)> {
        self.entries.iter().filter_map(|e| e.as_ref().map(|(k, v)| (k, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ArrayKey, &mut Value)> {
        self.entries.iter_mut().filter_map(|e| e.as_mut().map(|(k, v)| (&*k, v)))
    }

    pub fn keys(&self) -> Vec<ArrayKey> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Key-value pair at the `n`th live position, for foreach iteration.
    pub fn nth(&self, n: usize) -> Option<(&ArrayKey, &Value)> {
        self.iter().nth(n)
    }

    pub fn live_len(&self) -> usize {
        self.len()
    }

    /// Build an array from literal `(key, value)` pairs, as at a `new-array`
    /// opcode; `None` keys append.
    pub fn from_pairs(pairs: Vec<(Option<ArrayKey>, Value)>) -> Self {
        let mut arr = Self::new();
        for (key, value) in pairs {
            match key {
                Some(k) => arr.insert(k, value),
                None => {
                    arr.append(value);
                }
            }
        }
        arr
    }

    /// Spread another array's entries into this one (string keys preserved,
    /// integer keys renumbered), as in `[...$a, ...$b]`.
    pub fn extend_spread(&mut self, other: &PhpArray) {
        for (key, value) in other.iter() {
            match key {
                ArrayKey::String(_) => self.insert(key.clone(), value.clone()),
                ArrayKey::Integer(_) => {
                    self.append(value.clone());
                }
            }
        }
    }
}

impl PartialEq for PhpArray {
    /// Loose (`==`) structural equality: same keys and loosely-equal values,
    /// order-independent.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(k, v)| match other.get(k) {
            Some(ov) => v.loose_eq(ov),
            None => false,
        })
    }
}

impl PhpArray {
    /// `===` identity: same keys in the same order with identical values.
    pub fn identical(&self, other: &Self) -> bool {
        let a: Vec<_> = self.iter().collect();
        let b: Vec<_> = other.iter().collect();
        a.len() == b.len() && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb))
    }
}
