use super::Value;
use std::collections::HashMap;

/// The live state behind a `Value::Object` handle.
///
/// Objects are reference types: copying a `Value::Object` copies the `Rc`,
/// not the instance, so `$a = $b` aliases the same `ObjectData`.
#[derive(Debug)]
pub struct ObjectData {
    pub class_name: String,
    pub properties: HashMap<String, Value>,
    pub readonly_properties: Vec<String>,
    pub initialized_readonly: Vec<String>,
    /// Identity used for `spl_object_id`-style bookkeeping and `clone` diagnostics.
    pub id: u64,
}

impl ObjectData {
    pub fn new(class_name: impl Into<String>, id: u64) -> Self {
        Self {
            class_name: class_name.into(),
            properties: HashMap::new(),
            readonly_properties: Vec::new(),
            initialized_readonly: Vec::new(),
            id,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn is_readonly(&self, name: &str) -> bool {
        self.readonly_properties.iter().any(|p| p == name)
    }

    pub fn is_readonly_initialized(&self, name: &str) -> bool {
        self.initialized_readonly.iter().any(|p| p == name)
    }

    pub fn mark_readonly_initialized(&mut self, name: &str) {
        if !self.is_readonly_initialized(name) {
            self.initialized_readonly.push(name.to_string());
        }
    }

    /// Shallow copy for the `clone` operator: same property values (objects
    /// among them still shared, per PHP's shallow-clone semantics), fresh
    /// identity, `__clone` is invoked separately by the VM afterward.
    pub fn shallow_clone(&self, new_id: u64) -> Self {
        Self {
            class_name: self.class_name.clone(),
            properties: self.properties.clone(),
            readonly_properties: self.readonly_properties.clone(),
            initialized_readonly: self.initialized_readonly.clone(),
            id: new_id,
        }
    }
}
