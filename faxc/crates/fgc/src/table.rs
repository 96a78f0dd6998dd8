//! Open-addressed hash table with tombstone deletion (spec §4.2).
//!
//! Used both for the VM's global-variable table and for string interning.
//! Keys are interned `ObjString` pointers compared by identity; the FNV-1a
//! hash is precomputed once per string and stored alongside it, so probing
//! never rehashes.

use std::ptr::NonNull;

use crate::object::{self, GcHeader, ObjString};
use crate::value::Value;

const MAX_LOAD: f64 = 0.75;

#[derive(Clone, Copy)]
struct Entry {
    key: Option<NonNull<ObjString>>,
    value: Value,
}

impl Entry {
    fn empty() -> Self {
        Self {
            key: None,
            value: Value::Nil,
        }
    }
}

/// A tombstone is a deleted entry: `key: None, value: Bool(true)`, kept so
/// probe sequences that ran through it still find entries placed after it.
fn is_tombstone(entry: &Entry) -> bool {
    entry.key.is_none() && matches!(entry.value, Value::Bool(true))
}

#[derive(Default)]
pub struct Table {
    count: usize,
    entries: Vec<Entry>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn find_slot(entries: &[Entry], key: NonNull<ObjString>, hash: u32) -> usize {
        let cap = entries.len();
        let mut index = hash as usize % cap;
        let mut first_tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            match entry.key {
                None => {
                    if matches!(entry.value, Value::Bool(true)) {
                        if first_tombstone.is_none() {
                            first_tombstone = Some(index);
                        }
                    } else {
                        return first_tombstone.unwrap_or(index);
                    }
                }
                Some(k) if k == key => return index,
                Some(_) => {}
            }
            index = (index + 1) % cap;
        }
    }

    fn grow(&mut self) {
        let new_cap = if self.entries.is_empty() {
            8
        } else {
            self.entries.len() * 2
        };
        let mut new_entries = vec![Entry::empty(); new_cap];
        let mut new_count = 0;
        for entry in &self.entries {
            if let Some(key) = entry.key {
                let hash = unsafe { key.as_ref().hash };
                let slot = Self::find_slot(&new_entries, key, hash);
                new_entries[slot] = *entry;
                new_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    pub fn set(&mut self, key: NonNull<ObjString>, value: Value) -> bool {
        if self.entries.is_empty() || (self.count + 1) as f64 > self.entries.len() as f64 * MAX_LOAD
        {
            self.grow();
        }
        let hash = unsafe { key.as_ref().hash };
        let slot = Self::find_slot(&self.entries, key, hash);
        let entry = &mut self.entries[slot];
        let is_new = entry.key.is_none();
        if is_new && !is_tombstone(entry) {
            self.count += 1;
        }
        entry.key = Some(key);
        entry.value = value;
        is_new
    }

    pub fn get(&self, key: NonNull<ObjString>) -> Option<Value> {
        if self.entries.is_empty() {
            return None;
        }
        let hash = unsafe { key.as_ref().hash };
        let slot = Self::find_slot(&self.entries, key, hash);
        self.entries[slot].key.map(|_| self.entries[slot].value)
    }

    pub fn delete(&mut self, key: NonNull<ObjString>) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let hash = unsafe { key.as_ref().hash };
        let slot = Self::find_slot(&self.entries, key, hash);
        if self.entries[slot].key.is_none() {
            return false;
        }
        self.entries[slot] = Entry {
            key: None,
            value: Value::Bool(true),
        };
        true
    }

    /// Looks up an interned string by raw content, used by the interner to
    /// decide whether a new `ObjString` allocation is needed at all.
    pub fn find_string(&self, chars: &str, hash: u32) -> Option<NonNull<ObjString>> {
        if self.entries.is_empty() {
            return None;
        }
        let cap = self.entries.len();
        let mut index = hash as usize % cap;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None if !is_tombstone(entry) => return None,
                Some(key) => {
                    let s = unsafe { key.as_ref() };
                    if s.hash == hash && &*s.chars == chars {
                        return Some(key);
                    }
                }
                None => {}
            }
            index = (index + 1) % cap;
        }
    }

    /// Drops every entry whose key is an unmarked (white) string, called
    /// between the mark and sweep phases so dead interned strings don't
    /// survive a collection as zombie table entries (spec §4.2 "weak"
    /// table semantics for the intern table).
    pub fn remove_white(&mut self) {
        for entry in &mut self.entries {
            if let Some(key) = entry.key {
                let header: &GcHeader = unsafe { key.as_ref() }.header();
                if !header.marked.get() {
                    *entry = Entry {
                        key: None,
                        value: Value::Bool(true),
                    };
                }
            }
        }
    }

    /// Every live (key, value) pair, for the GC to mark. Returned as an
    /// owned `Vec` rather than taking marking closures so callers don't
    /// need two simultaneous mutable borrows of the heap while iterating.
    pub fn live_entries(&self) -> Vec<(NonNull<ObjString>, Value)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.key.map(|key| (key, entry.value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_string(chars: &str) -> NonNull<ObjString> {
        let hash = object::fnv1a(chars.as_bytes());
        let boxed = Box::new(ObjString {
            header: GcHeader::new(object::ObjKind::String),
            hash,
            chars: chars.into(),
        });
        NonNull::from(Box::leak(boxed))
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut table = Table::new();
        let key = make_string("greeting");
        assert!(table.set(key, Value::Number(1.0)));
        assert_eq!(table.get(key), Some(Value::Number(1.0)));
    }

    #[test]
    fn delete_then_get_returns_none_but_probe_chain_survives() {
        let mut table = Table::new();
        let a = make_string("a");
        let b = make_string("b");
        table.set(a, Value::Number(1.0));
        table.set(b, Value::Number(2.0));
        assert!(table.delete(a));
        assert_eq!(table.get(a), None);
        assert_eq!(table.get(b), Some(Value::Number(2.0)));
    }

    #[test]
    fn find_string_locates_interned_content() {
        let mut table = Table::new();
        let key = make_string("hello");
        table.set(key, Value::Nil);
        let hash = object::fnv1a(b"hello");
        assert_eq!(table.find_string("hello", hash), Some(key));
        assert_eq!(table.find_string("goodbye", object::fnv1a(b"goodbye")), None);
    }
}
