use std::collections::HashMap;
use std::path::Path;

use crate::error::{MappingError, Result};

/// Owner-qualified renames parsed from the compact (CSRG) format.
///
/// Line shapes, split on whitespace:
///
/// | tokens | meaning                                   |
/// |--------|-------------------------------------------|
/// | 2      | `oldType newType`                         |
/// | 3      | `owner oldField newField`                 |
/// | 4      | `owner oldMethod oldDescriptor newMethod` |
///
/// Any other shape is skipped so newer files with extra line kinds still load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactMapping {
    types: HashMap<String, String>,
    fields: HashMap<(String, String), String>,
    /// Keyed by `(owner, "name descriptor")`.
    methods: HashMap<(String, String), String>,
}

impl CompactMapping {
    pub fn parse(text: &str) -> Self {
        let mut mapping = Self::default();
        let mut skipped = 0usize;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [old, new] => {
                    mapping.types.insert((*old).to_string(), (*new).to_string());
                }
                [owner, old, new] => {
                    mapping
                        .fields
                        .insert(((*owner).to_string(), (*old).to_string()), (*new).to_string());
                }
                [owner, old, desc, new] => {
                    mapping.methods.insert(
                        ((*owner).to_string(), method_key(old, desc)),
                        (*new).to_string(),
                    );
                }
                _ => skipped += 1,
            }
        }

        tracing::debug!(
            target: "anvil.mappings",
            types = mapping.types.len(),
            fields = mapping.fields.len(),
            methods = mapping.methods.len(),
            skipped,
            "parsed compact mapping"
        );
        mapping
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn type_name(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }

    pub fn field_name(&self, owner: &str, name: &str) -> Option<&str> {
        self.fields
            .get(&(owner.to_string(), name.to_string()))
            .map(String::as_str)
    }

    pub fn method_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        self.methods
            .get(&(owner.to_string(), method_key(name, descriptor)))
            .map(String::as_str)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }
}

fn method_key(name: &str, descriptor: &str) -> String {
    format!("{name} {descriptor}")
}
