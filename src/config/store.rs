//! Merged property store.
//!
//! Holds the flat name -> raw string map plus a parallel name -> typed value
//! map. Merges are last-write-wins: a later file always overrides an earlier
//! file's value for the same key.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use super::coerce::{Coerced, TypeTag, TypedValue};

/// A property ready to merge: name plus its coerced value.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeEntry {
    pub name: String,
    pub coerced: Coerced,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    strings: BTreeMap<String, String>,
    typed: HashMap<String, TypedValue>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `incoming` onto the store.
    ///
    /// Keys not in `incoming` are untouched. An incoming key without a typed
    /// value clears any typed entry left by an earlier layer.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = MergeEntry>) -> usize {
        let mut merged = 0;
        for entry in incoming {
            match entry.coerced.typed {
                Some(typed) => {
                    self.typed.insert(entry.name.clone(), typed);
                }
                None => {
                    self.typed.remove(&entry.name);
                }
            }
            self.strings.insert(entry.name, entry.coerced.raw);
            merged += 1;
        }
        merged
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    pub fn get_typed(&self, name: &str) -> Option<&TypedValue> {
        self.typed.get(name)
    }

    pub fn typed_type(&self, name: &str) -> Option<TypeTag> {
        self.typed.get(name).map(TypedValue::tag)
    }

    /// Set a raw string value; its typed entry becomes a `String`.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.typed
            .insert(name.clone(), TypedValue::String(value.clone()));
        self.strings.insert(name, value);
    }

    /// Set a typed value directly, bypassing tag parsing.
    ///
    /// The raw entry is the value's text form. A value without one (see
    /// [`TypedValue::has_text_form`]) is refused and the store is unchanged.
    pub fn put_typed(&mut self, name: impl Into<String>, value: TypedValue) -> bool {
        if !value.has_text_form() {
            return false;
        }
        let name = name.into();
        self.strings.insert(name.clone(), value.to_string());
        self.typed.insert(name, value);
        true
    }

    /// Property names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.strings.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.strings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Write a listing of every property to `sink`.
    pub fn list(&self, sink: &mut dyn Write) -> io::Result<()> {
        writeln!(sink, "-- listing properties --")?;
        for (name, value) in self.iter() {
            writeln!(sink, "{name}={value}")?;
        }
        Ok(())
    }
}
