use crate::error::Result;
use crate::map::AccessMap;
use crate::scanner::{self, Modifiers, TypeDecl};
use crate::visibility::Visibility;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

impl AccessMap {
    /// Rewrites the visibility keywords of every declaration in `source` that
    /// has an override in this map.
    ///
    /// Types without an entry are left alone; nested types are looked up by
    /// their own qualified name. Everything outside the edited keywords is
    /// preserved byte for byte.
    pub fn apply(&self, source: &str) -> Result<String> {
        if self.is_empty() {
            return Ok(source.to_string());
        }
        let unit = scanner::parse(source)?;

        let mut edits = Vec::new();
        for decl in &unit.types {
            self.collect_edits(source, decl, &mut edits);
        }
        if edits.is_empty() {
            return Ok(source.to_string());
        }

        tracing::debug!(
            target: "anvil.access",
            package = unit.package.as_deref().unwrap_or(""),
            edits = edits.len(),
            "applying access transformation"
        );

        edits.sort_by(|a, b| b.start.cmp(&a.start));
        let mut out = source.to_string();
        for edit in edits {
            out.replace_range(edit.start..edit.end, &edit.text);
        }
        Ok(out)
    }

    fn collect_edits(&self, source: &str, decl: &TypeDecl, edits: &mut Vec<Edit>) {
        if let Some(entry) = self.get(&decl.qualified_name) {
            if let Some(visibility) = entry.visibility {
                edits.extend(set_visibility(source, &decl.modifiers, visibility));
            }
            for field in &decl.fields {
                // one declaration, one keyword: the first named declarator wins
                if let Some(visibility) = field.names.iter().find_map(|name| entry.field(name)) {
                    edits.extend(set_visibility(source, &field.modifiers, visibility));
                }
            }
            for method in decl.methods.iter().filter(|m| !m.constructor) {
                if let Some(visibility) = entry.method(&method.name) {
                    edits.extend(set_visibility(source, &method.modifiers, visibility));
                }
            }
        }
        for nested in &decl.types {
            self.collect_edits(source, nested, edits);
        }
    }
}

fn set_visibility(source: &str, modifiers: &Modifiers, target: Visibility) -> Option<Edit> {
    match (modifiers.visibility, target.keyword()) {
        (Some((current, _, _)), _) if current == target => None,
        (Some((_, start, end)), Some(keyword)) => Some(Edit {
            start,
            end,
            text: keyword.to_string(),
        }),
        (Some((_, start, end)), None) => {
            let trailing = source[end..]
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(source.len() - end);
            Some(Edit {
                start,
                end: end + trailing,
                text: String::new(),
            })
        }
        (None, Some(keyword)) => Some(Edit {
            start: modifiers.insert_at,
            end: modifiers.insert_at,
            text: format!("{keyword} "),
        }),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keyword_is_replaced_inserted_or_removed() {
        let map = AccessMap::from_json(
            r#"{ "p.A": { "fields": { "a": "public", "b": "protected", "c": "default" } } }"#,
        )
        .unwrap();
        let source = "package p;\nclass A {\n    private int a;\n    static int b;\n    public  final int c;\n}\n";
        assert_eq!(
            map.apply(source).unwrap(),
            "package p;\nclass A {\n    public int a;\n    protected static int b;\n    final int c;\n}\n"
        );
    }

    #[test]
    fn keyword_is_inserted_after_annotations() {
        let map = AccessMap::from_json(
            r#"{ "A": { "visibility": "public", "methods": { "run": "protected" } } }"#,
        )
        .unwrap();
        let source = "@Deprecated\nclass A {\n    @Override\n    synchronized void run() {}\n}\n";
        assert_eq!(
            map.apply(source).unwrap(),
            "@Deprecated\npublic class A {\n    @Override\n    protected synchronized void run() {}\n}\n"
        );
    }

    #[test]
    fn empty_map_does_not_parse() {
        let source = "this is not java {";
        assert_eq!(AccessMap::default().apply(source).unwrap(), source);
    }
}
