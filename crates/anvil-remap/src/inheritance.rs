use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use anvil_classfile::ClassHeader;
use zip::ZipArchive;

use crate::error::{RemapError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Parents {
    super_name: Option<String>,
    interfaces: Vec<String>,
}

/// `type -> superclass/interfaces` facts for the classes of one archive.
///
/// Built once from the archive about to be transformed and frozen before the
/// transform starts. Types outside the archive (JDK classes) have no entry and
/// end the walk.
#[derive(Debug, Clone, Default)]
pub struct InheritanceIndex {
    parents: HashMap<String, Parents>,
}

impl InheritanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_archive(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file).map_err(|source| RemapError::OpenArchive {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_zip(archive)
    }

    pub fn from_zip<R: Read + Seek>(mut archive: ZipArchive<R>) -> Result<Self> {
        let mut index = Self::new();
        let mut buf = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() || !entry.name().ends_with(".class") {
                continue;
            }
            let name = entry.name().to_string();
            buf.clear();
            entry.read_to_end(&mut buf)?;
            let header = ClassHeader::parse(&buf).map_err(|source| RemapError::Class {
                entry: name,
                source,
            })?;
            index.insert(header.name, header.super_name, header.interfaces);
        }

        tracing::debug!(
            target: "anvil.remap",
            classes = index.len(),
            "built inheritance index"
        );
        Ok(index)
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        super_name: Option<String>,
        interfaces: Vec<String>,
    ) {
        self.parents.insert(
            name.into(),
            Parents {
                super_name,
                interfaces,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Direct supertypes of `name`: superclass first, then interfaces.
    pub fn supertypes(&self, name: &str) -> Vec<&str> {
        match self.parents.get(name) {
            None => Vec::new(),
            Some(parents) => parents
                .super_name
                .iter()
                .chain(parents.interfaces.iter())
                .map(String::as_str)
                .collect(),
        }
    }

    /// Visits `owner` and then its supertypes depth-first until `visit` returns
    /// a value. Each type is visited at most once.
    pub fn find_in_hierarchy<T>(
        &self,
        owner: &str,
        mut visit: impl FnMut(&str) -> Option<T>,
    ) -> Option<T> {
        if let Some(found) = visit(owner) {
            return Some(found);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = self.supertypes(owner);
        stack.reverse();
        while let Some(current) = stack.pop() {
            if current == owner || !seen.insert(current) {
                continue;
            }
            if let Some(found) = visit(current) {
                return Some(found);
            }
            let mut next = self.supertypes(current);
            next.reverse();
            stack.extend(next);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InheritanceIndex {
        let mut index = InheritanceIndex::new();
        index.insert("c", Some("b".into()), vec!["i".into()]);
        index.insert("b", Some("a".into()), vec![]);
        index.insert("a", Some("java/lang/Object".into()), vec![]);
        index.insert("i", None, vec!["j".into()]);
        index
    }

    #[test]
    fn walks_superclass_chain_before_interfaces() {
        let index = sample();
        let mut order = Vec::new();
        let found: Option<()> = index.find_in_hierarchy("c", |name| {
            order.push(name.to_string());
            None
        });
        assert!(found.is_none());
        assert_eq!(order, vec!["c", "b", "a", "java/lang/Object", "i", "j"]);
    }

    #[test]
    fn stops_at_first_match() {
        let index = sample();
        let found = index.find_in_hierarchy("c", |name| (name == "a").then(|| name.to_string()));
        assert_eq!(found.as_deref(), Some("a"));
    }

    #[test]
    fn cycles_terminate() {
        let mut index = InheritanceIndex::new();
        index.insert("x", Some("y".into()), vec![]);
        index.insert("y", Some("x".into()), vec![]);
        let mut visits = 0;
        let found: Option<()> = index.find_in_hierarchy("x", |_| {
            visits += 1;
            None
        });
        assert!(found.is_none());
        assert_eq!(visits, 2);
    }
}
