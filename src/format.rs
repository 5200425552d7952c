//! Output formatting for property listings and load definitions.

use serde_json::{Map, Value, json};

use crate::config::{LoadDefinition, PropertyStore, TypedValue};

/// Output format for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "properties" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// JSON for one property: raw text plus its typed value, if any.
pub fn property_to_json(raw: &str, typed: Option<&TypedValue>) -> Value {
    match typed {
        Some(typed) => json!({
            "value": raw,
            "type": typed.tag(),
            "typed": typed,
        }),
        None => json!({ "value": raw }),
    }
}

/// Render the whole store as a JSON object keyed by property name.
pub fn store_to_json(store: &PropertyStore) -> Value {
    let mut map = Map::new();
    for (name, raw) in store.iter() {
        map.insert(name.to_string(), property_to_json(raw, store.get_typed(name)));
    }
    Value::Object(map)
}

/// Render the store as sorted `key=value` lines.
pub fn format_store_text(store: &PropertyStore) -> String {
    let mut out = String::new();
    for (name, value) in store.iter() {
        out.push_str(&format!("{}={}\n", name, value));
    }
    out
}

pub fn format_store(store: &PropertyStore, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_store_text(store),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&store_to_json(store)).unwrap_or_default() + "\n"
        }
    }
}

pub fn format_definitions(definitions: &[LoadDefinition], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for (i, definition) in definitions.iter().enumerate() {
                out.push_str(&format!("{:>3}. {}\n", i + 1, definition));
            }
            out
        }
        OutputFormat::Json => {
            let entries: Vec<Value> = definitions
                .iter()
                .map(|d| {
                    json!({
                        "kind": d.kind.to_string(),
                        "name": d.name,
                        "path": d.path,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&entries).unwrap_or_default() + "\n"
        }
    }
}
