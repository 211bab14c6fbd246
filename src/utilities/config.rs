//! Read-only configuration tables for agents and tasks.
//!
//! A table maps an entry name (e.g. `hr_evaluation_agent`) to a mapping of
//! fields. Tables are usually parsed from YAML, but the crew only ever sees
//! the parsed [`ConfigTable`].

use std::fmt;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::utilities::errors::ConfigError;

/// Which kind of entries a table holds. Used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Agents,
    Tasks,
}

impl TableKind {
    pub fn label(self) -> &'static str {
        match self {
            TableKind::Agents => "agent",
            TableKind::Tasks => "task",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered, read-only table of named configuration entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTable {
    kind: TableKind,
    entries: Vec<(String, Mapping)>,
}

impl ConfigTable {
    /// Create an empty table.
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Add an entry built from string fields. Replaces an entry of the same name.
    pub fn with_entry<I, K, V>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mapping: Mapping = fields
            .into_iter()
            .map(|(k, v)| (Value::String(k.into()), Value::String(v.into())))
            .collect();
        self.insert(name.into(), mapping);
        self
    }

    fn insert(&mut self, name: String, mapping: Mapping) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = mapping,
            None => self.entries.push((name, mapping)),
        }
    }

    /// Parse a YAML document whose top level maps entry names to field mappings.
    ///
    /// Entry order follows the document.
    pub fn from_yaml_str(kind: TableKind, yaml: &str) -> Result<Self, ConfigError> {
        let mut table = Self::new(kind);
        if yaml.trim().is_empty() {
            return Ok(table);
        }

        let root: Value = serde_yaml::from_str(yaml)?;
        let root = match root {
            Value::Mapping(m) => m,
            Value::Null => return Ok(table),
            other => {
                return Err(ConfigError::InvalidField {
                    table: kind.label(),
                    key: "<root>".to_string(),
                    field: "<root>".to_string(),
                    reason: format!("expected a mapping of entries, found {}", describe(&other)),
                })
            }
        };

        for (key, value) in root {
            let name = match key {
                Value::String(s) => s,
                other => {
                    return Err(ConfigError::InvalidField {
                        table: kind.label(),
                        key: format!("{:?}", other),
                        field: "<name>".to_string(),
                        reason: "entry names must be strings".to_string(),
                    })
                }
            };
            let fields = match value {
                Value::Mapping(m) => m,
                other => {
                    return Err(ConfigError::InvalidField {
                        table: kind.label(),
                        key: name,
                        field: "<entry>".to_string(),
                        reason: format!("expected a mapping of fields, found {}", describe(&other)),
                    })
                }
            };
            table.insert(name, fields);
        }

        Ok(table)
    }

    /// Read and parse a YAML file.
    pub fn from_path(kind: TableKind, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded {} configuration from {}", kind, path.display());
        Self::from_yaml_str(kind, &content)
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Entry names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry, or `None` when absent.
    pub fn get(&self, key: &str) -> Option<ConfigEntry<'_>> {
        self.entries
            .iter()
            .find(|(n, _)| n == key)
            .map(|(n, fields)| ConfigEntry {
                table: self.kind.label(),
                key: n,
                fields,
            })
    }

    /// Look up an entry, failing with [`ConfigError::MissingEntry`] when absent.
    pub fn entry(&self, key: &str) -> Result<ConfigEntry<'_>, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingEntry {
            table: self.kind.label(),
            key: key.to_string(),
        })
    }
}

/// A borrowed view of one configuration entry.
#[derive(Debug, Clone, Copy)]
pub struct ConfigEntry<'a> {
    table: &'static str,
    key: &'a str,
    fields: &'a Mapping,
}

impl<'a> ConfigEntry<'a> {
    pub fn key(&self) -> &'a str {
        self.key
    }

    fn field(&self, field: &str) -> Option<&'a Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    fn invalid(&self, field: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidField {
            table: self.table,
            key: self.key.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// A required, non-blank text field. Trailing whitespace from folded
    /// YAML scalars is trimmed.
    pub fn require_str(&self, field: &'static str) -> Result<String, ConfigError> {
        match self.optional_str(field)? {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(ConfigError::MissingField {
                table: self.table,
                key: self.key.to_string(),
                field,
            }),
        }
    }

    pub fn optional_str(&self, field: &str) -> Result<Option<String>, ConfigError> {
        match self.field(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim_end().to_string())),
            Some(other) => Err(self.invalid(field, format!("expected text, found {}", describe(other)))),
        }
    }

    /// An optional boolean. Accepts YAML booleans and the strings `"true"`/`"false"`.
    pub fn optional_bool(&self, field: &str) -> Result<Option<bool>, ConfigError> {
        match self.field(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.trim() == "true" => Ok(Some(true)),
            Some(Value::String(s)) if s.trim() == "false" => Ok(Some(false)),
            Some(other) => Err(self.invalid(field, format!("expected a boolean, found {}", describe(other)))),
        }
    }

    /// An optional list of names. A single string is treated as a one-element list.
    pub fn optional_str_list(&self, field: &str) -> Result<Option<Vec<String>>, ConfigError> {
        match self.field(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s.trim().to_string()])),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    other => Err(self.invalid(field, format!("expected a list of names, found {}", describe(other)))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(self.invalid(field, format!("expected a list of names, found {}", describe(other)))),
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
