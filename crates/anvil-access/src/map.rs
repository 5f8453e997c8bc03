use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AccessError, Result};
use crate::visibility::Visibility;

/// Overrides for one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformationEntry {
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub fields: HashMap<String, Visibility>,
    /// Keyed by name only; every overload gets the same visibility.
    #[serde(default)]
    pub methods: HashMap<String, Visibility>,
}

impl TransformationEntry {
    pub fn field(&self, name: &str) -> Option<Visibility> {
        self.fields.get(name).copied()
    }

    pub fn method(&self, name: &str) -> Option<Visibility> {
        self.methods.get(name).copied()
    }
}

/// Qualified type name to visibility overrides, read from a JSON document:
///
/// ```json
/// {
///   "net.minecraft.server.MinecraftServer": {
///     "visibility": "public",
///     "fields": { "worldServers": "public" },
///     "methods": { "tick": "protected" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessMap {
    entries: HashMap<String, TransformationEntry>,
}

impl AccessMap {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: HashMap<String, TransformationEntry> = serde_json::from_str(text)?;
        let entries = raw
            .into_iter()
            .map(|(key, entry)| (normalize_type_name(&key), entry))
            .collect();
        Ok(Self { entries })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AccessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_json(&text)?;
        tracing::debug!(
            target: "anvil.access",
            path = %path.display(),
            types = map.len(),
            "loaded access transformation map"
        );
        Ok(map)
    }

    /// Accepts `a.b.C`, `a/b/C`, `a/b/C.java` and `a.b.C$D`.
    pub fn get(&self, type_name: &str) -> Option<&TransformationEntry> {
        self.entries.get(&normalize_type_name(type_name))
    }

    /// Whether the source file `path` declares a type with an entry, either
    /// the file's top-level type or one nested inside it.
    pub fn covers_file(&self, path: &str) -> bool {
        let top_level = normalize_type_name(path);
        self.entries.keys().any(|key| {
            key.strip_prefix(top_level.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_type_name(name: &str) -> String {
    name.strip_suffix(".java")
        .unwrap_or(name)
        .replace(['/', '$'], ".")
}
