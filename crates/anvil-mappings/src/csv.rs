use std::collections::HashMap;
use std::path::Path;

use crate::error::{MappingError, Result};
use crate::side::Side;

/// Name-only renames from an MCP style CSV file.
///
/// Lookups ignore owner and descriptor, so overloads sharing a name also share
/// the rename. This matches the format and is kept so cached output names stay
/// stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvMapping {
    names: HashMap<String, String>,
}

impl CsvMapping {
    /// Parses `[oldName, newName, sideCode, ...]` rows after a header line.
    ///
    /// Rows are kept when their side code is `2` or matches `side`. A later row
    /// for the same `oldName` replaces an earlier one.
    pub fn parse(text: &str, side: Side) -> Result<Self> {
        let mut names = HashMap::new();
        let mut rows = 0usize;

        for (idx, line) in text.lines().enumerate().skip(1) {
            let line_no = idx + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let columns = split_row(line).map_err(|message| MappingError::Csv {
                line: line_no,
                message,
            })?;
            if columns.len() < 3 {
                return Err(MappingError::Csv {
                    line: line_no,
                    message: format!("expected at least 3 columns, found {}", columns.len()),
                });
            }

            let code = columns[2]
                .trim()
                .parse::<u8>()
                .map_err(|err| MappingError::Csv {
                    line: line_no,
                    message: format!("invalid side code {:?}: {err}", columns[2]),
                })?;
            rows += 1;
            if side.accepts(code) {
                names.insert(columns[0].clone(), columns[1].clone());
            }
        }

        tracing::debug!(
            target: "anvil.mappings",
            %side,
            rows,
            entries = names.len(),
            "parsed csv mapping"
        );
        Ok(Self { names })
    }

    pub fn from_path(path: &Path, side: Side) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, side)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Splits one CSV row. Double-quoted fields may contain commas and `""` escapes.
fn split_row(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut columns = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if current.is_empty() => quoted = true,
            ',' if !quoted => columns.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    columns.push(current);
    Ok(columns)
}
