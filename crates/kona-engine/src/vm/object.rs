//! Dynamic objects and arrays
//!
//! Both are shared by reference: cloning a handle aliases the same storage,
//! which is what makes a module's exports object observable from every
//! `require` of that module.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Most `undefined` slots a single indexed write may pad an array with
pub const MAX_ARRAY_GAP: usize = 1 << 16;

/// Global counter for generating unique object IDs
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Generate a new unique object ID
fn generate_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Default)]
struct Members {
    names: Vec<Arc<str>>,
    values: Vec<Value>,
    index: FxHashMap<Arc<str>, usize>,
}

struct ObjectData {
    object_id: u64,
    members: RwLock<Members>,
}

/// Open-ended, insertion-ordered name to value mapping
#[derive(Clone)]
pub struct DynamicObject(Arc<ObjectData>);

impl DynamicObject {
    /// Create an empty object
    pub fn new() -> Self {
        Self(Arc::new(ObjectData {
            object_id: generate_object_id(),
            members: RwLock::new(Members::default()),
        }))
    }

    /// Unique identity of this object
    pub fn object_id(&self) -> u64 {
        self.0.object_id
    }

    /// Read a member
    pub fn get(&self, name: &str) -> Option<Value> {
        let members = self.0.members.read();
        members
            .index
            .get(name)
            .map(|&slot| members.values[slot].clone())
    }

    /// Write a member, appending it if new
    pub fn set(&self, name: &str, value: Value) {
        let mut members = self.0.members.write();
        if let Some(&slot) = members.index.get(name) {
            members.values[slot] = value;
            return;
        }
        let name: Arc<str> = Arc::from(name);
        let slot = members.names.len();
        members.names.push(name.clone());
        members.values.push(value);
        members.index.insert(name, slot);
    }

    /// Whether a member exists
    pub fn has(&self, name: &str) -> bool {
        self.0.members.read().index.contains_key(name)
    }

    /// Remove a member, keeping the order of the rest
    pub fn remove(&self, name: &str) -> Option<Value> {
        let mut members = self.0.members.write();
        let slot = members.index.remove(name)?;
        members.names.remove(slot);
        let value = members.values.remove(slot);
        for index in members.index.values_mut() {
            if *index > slot {
                *index -= 1;
            }
        }
        Some(value)
    }

    /// Member names in insertion order
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.0.members.read().names.clone()
    }

    /// Members in insertion order
    pub fn entries(&self) -> Vec<(Arc<str>, Value)> {
        let members = self.0.members.read();
        members
            .names
            .iter()
            .cloned()
            .zip(members.values.iter().cloned())
            .collect()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.0.members.read().names.len()
    }

    /// Whether the object has no members
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles refer to the same object
    pub fn ptr_eq(&self, other: &DynamicObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for DynamicObject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Members may refer back to this object, so only names are printed.
        f.debug_struct("DynamicObject")
            .field("object_id", &self.object_id())
            .field("keys", &self.keys())
            .finish()
    }
}

/// Shared, growable array of values
#[derive(Clone, Default)]
pub struct Array(Arc<RwLock<Vec<Value>>>);

impl Array {
    /// Create an empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing elements
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Store at `index`, padding with `undefined` past the end.
    ///
    /// Fails without touching the array when the write would pad more than
    /// [`MAX_ARRAY_GAP`] slots.
    pub fn set(&self, index: usize, value: Value) -> VmResult<()> {
        let mut items = self.0.write();
        if index >= items.len() {
            let gap = index - items.len();
            if gap > MAX_ARRAY_GAP {
                return Err(VmError::TypeError(format!(
                    "array index {} is too far past the end (length {})",
                    index,
                    items.len()
                )));
            }
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
        Ok(())
    }

    /// Append and return the new length
    pub fn push(&self, value: Value) -> usize {
        let mut items = self.0.write();
        items.push(value);
        items.len()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the array is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Whether both handles refer to the same array
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_keeps_insertion_order() {
        let obj = DynamicObject::new();
        obj.set("value1", Value::Int(1));
        obj.set("value15", Value::Int(15));
        obj.set("value2", Value::Int(2));
        obj.set("value1", Value::Int(10));

        let keys: Vec<_> = obj.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["value1", "value15", "value2"]);
        assert_eq!(obj.get("value1"), Some(Value::Int(10)));
        assert_eq!(obj.len(), 3);
    }

    #[test]
    fn test_object_remove_reindexes() {
        let obj = DynamicObject::new();
        obj.set("a", Value::Int(1));
        obj.set("b", Value::Int(2));
        obj.set("c", Value::Int(3));

        assert_eq!(obj.remove("a"), Some(Value::Int(1)));
        assert_eq!(obj.remove("a"), None);
        assert_eq!(obj.get("c"), Some(Value::Int(3)));
        obj.set("c", Value::Int(30));
        assert_eq!(obj.get("c"), Some(Value::Int(30)));
        assert!(!obj.has("a"));
    }

    #[test]
    fn test_object_handles_alias() {
        let obj = DynamicObject::new();
        let alias = obj.clone();
        alias.set("x", Value::Bool(true));
        assert!(obj.has("x"));
        assert!(obj.ptr_eq(&alias));
        assert!(!obj.ptr_eq(&DynamicObject::new()));
        assert_ne!(obj.object_id(), DynamicObject::new().object_id());
    }

    #[test]
    fn test_array_set_pads() {
        let arr = Array::from_vec(vec![Value::Int(1)]);
        arr.set(3, Value::Int(4)).unwrap();
        assert_eq!(arr.len(), 4);
        assert_eq!(arr.get(1), Some(Value::Undefined));
        assert_eq!(arr.push(Value::Int(5)), 5);
        assert_eq!(arr.get(10), None);
    }

    #[test]
    fn test_array_set_rejects_huge_gap() {
        let arr = Array::from_vec(vec![Value::Int(1)]);
        assert!(matches!(arr.set(2_000_000_000, Value::Int(1)), Err(VmError::TypeError(_))));
        assert_eq!(arr.len(), 1);

        arr.set(1 + MAX_ARRAY_GAP, Value::Int(2)).unwrap();
        assert_eq!(arr.len(), MAX_ARRAY_GAP + 2);
    }
}
