//! Declaration scanner over a `tree-sitter-java` syntax tree.
//!
//! Only the structure access transformation needs is recovered: type
//! declarations (with nesting), their fields and methods, and where each
//! declaration's visibility keyword is or would go. Method bodies, local
//! classes and enum constant bodies are never entered.

use std::cell::RefCell;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{AccessError, Result};
use crate::visibility::Visibility;

thread_local! {
    static JAVA_PARSER: RefCell<std::result::Result<Parser, String>> = RefCell::new({
        let mut parser = Parser::new();
        match parser.set_language(tree_sitter_java::language()) {
            Ok(()) => Ok(parser),
            Err(_) => Err("tree-sitter-java language load failed".to_string()),
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

impl TypeKind {
    fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(Self::Class),
            "interface_declaration" => Some(Self::Interface),
            "enum_declaration" => Some(Self::Enum),
            "record_declaration" => Some(Self::Record),
            "annotation_type_declaration" => Some(Self::Annotation),
            _ => None,
        }
    }
}

/// Where a declaration's visibility lives in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    /// Current visibility keyword and its byte range.
    pub visibility: Option<(Visibility, usize, usize)>,
    /// Offset where a keyword is inserted when there is none: the first
    /// modifier keyword, or the declaration itself after any annotations.
    pub insert_at: usize,
}

impl Modifiers {
    pub fn visibility(&self) -> Visibility {
        self.visibility
            .map_or(Visibility::PackagePrivate, |(visibility, _, _)| visibility)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// All declarators sharing these modifiers (`int a, b;`).
    pub names: Vec<String>,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: String,
    pub constructor: bool,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    /// `package.Outer.Inner`
    pub qualified_name: String,
    pub modifiers: Modifiers,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub package: Option<String>,
    pub types: Vec<TypeDecl>,
}

/// Scans a Java compilation unit. Any syntax error fails the whole unit.
pub fn parse(source: &str) -> Result<CompilationUnit> {
    let tree = parse_java(source)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(syntax_error(source, root));
    }

    let mut package = None;
    let mut types = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "package_declaration" {
            package = package_name(source, child);
        } else if let Some(kind) = TypeKind::from_node_kind(child.kind()) {
            types.extend(type_decl(source, child, kind, package.as_deref()));
        }
    }
    Ok(CompilationUnit { package, types })
}

fn parse_java(source: &str) -> Result<Tree> {
    JAVA_PARSER.with(|parser_cell| {
        let mut parser = parser_cell.try_borrow_mut().map_err(|_| AccessError::Parser {
            message: "tree-sitter parser is already in use".to_string(),
        })?;
        let parser = match parser.as_mut() {
            Ok(parser) => parser,
            Err(err) => {
                return Err(AccessError::Parser {
                    message: err.clone(),
                })
            }
        };
        parser.parse(source, None).ok_or_else(|| AccessError::Parser {
            message: "tree-sitter failed to produce a syntax tree".to_string(),
        })
    })
}

/// Reports the first error or missing node in source order.
fn syntax_error(source: &str, root: Node<'_>) -> AccessError {
    let node = first_error(root).unwrap_or(root);
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = node_text(source, node).trim();
        let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
        format!("unexpected `{snippet}`")
    };
    AccessError::Parse {
        line: node.start_position().row + 1,
        message,
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

fn node_text<'a>(source: &'a str, node: Node<'_>) -> &'a str {
    &source[node.byte_range()]
}

fn find_named_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    result
}

fn modifier_node(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("modifiers")
        .or_else(|| find_named_child(node, "modifiers"))
}

fn name_of(source: &str, node: Node<'_>) -> Option<String> {
    node.child_by_field_name("name")
        .or_else(|| find_named_child(node, "identifier"))
        .map(|name| node_text(source, name).to_string())
}

fn package_name(source: &str, node: Node<'_>) -> Option<String> {
    let mut cursor = node.walk();
    let name = node
        .named_children(&mut cursor)
        .find(|child| matches!(child.kind(), "identifier" | "scoped_identifier"));
    name.map(|name| {
        node_text(source, name)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    })
}

fn modifiers(node: Node<'_>) -> Modifiers {
    let Some(list) = modifier_node(node) else {
        return Modifiers {
            visibility: None,
            insert_at: node.start_byte(),
        };
    };

    let mut visibility = None;
    let mut first_keyword = None;
    let mut cursor = list.walk();
    for child in list.children(&mut cursor) {
        if child.kind().ends_with("annotation") || child.kind().ends_with("comment") {
            continue;
        }
        if first_keyword.is_none() {
            first_keyword = Some(child.start_byte());
        }
        if visibility.is_none() {
            visibility = Visibility::from_keyword(child.kind())
                .map(|found| (found, child.start_byte(), child.end_byte()));
        }
    }

    // annotations only: the keyword goes in front of what follows them
    let insert_at = first_keyword.unwrap_or_else(|| {
        list.next_sibling()
            .map_or(list.end_byte(), |next| next.start_byte())
    });
    Modifiers {
        visibility,
        insert_at,
    }
}

fn type_decl(source: &str, node: Node<'_>, kind: TypeKind, owner: Option<&str>) -> Option<TypeDecl> {
    let name = name_of(source, node)?;
    let qualified_name = match owner {
        Some(owner) if !owner.is_empty() => format!("{owner}.{name}"),
        _ => name.clone(),
    };
    let mut decl = TypeDecl {
        kind,
        modifiers: modifiers(node),
        name,
        qualified_name,
        fields: Vec::new(),
        methods: Vec::new(),
        types: Vec::new(),
    };

    let body = node.child_by_field_name("body").or_else(|| {
        let mut cursor = node.walk();
        let body = node
            .named_children(&mut cursor)
            .find(|child| child.kind().ends_with("_body"));
        body
    });
    if let Some(body) = body {
        for member in members(body) {
            scan_member(source, member, &mut decl);
        }
    }
    Some(decl)
}

/// Direct members of a type body. Enum constants are skipped; the
/// declarations after them live in `enum_body_declarations`.
fn members(body: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            out.extend(child.named_children(&mut inner));
        } else {
            out.push(child);
        }
    }
    out
}

fn scan_member(source: &str, member: Node<'_>, owner: &mut TypeDecl) {
    match member.kind() {
        "field_declaration" | "constant_declaration" => {
            let mut cursor = member.walk();
            let names: Vec<String> = member
                .named_children(&mut cursor)
                .filter(|child| child.kind() == "variable_declarator")
                .filter_map(|declarator| name_of(source, declarator))
                .collect();
            if !names.is_empty() {
                owner.fields.push(FieldDecl {
                    names,
                    modifiers: modifiers(member),
                });
            }
        }
        "method_declaration" | "annotation_type_element_declaration" => {
            if let Some(name) = name_of(source, member) {
                owner.methods.push(MethodDecl {
                    name,
                    constructor: false,
                    modifiers: modifiers(member),
                });
            }
        }
        "constructor_declaration" | "compact_constructor_declaration" => {
            if let Some(name) = name_of(source, member) {
                owner.methods.push(MethodDecl {
                    name,
                    constructor: true,
                    modifiers: modifiers(member),
                });
            }
        }
        kind => {
            if let Some(kind) = TypeKind::from_node_kind(kind) {
                let qualified_name = owner.qualified_name.clone();
                owner
                    .types
                    .extend(type_decl(source, member, kind, Some(&qualified_name)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn field_names(decl: &TypeDecl) -> Vec<Vec<&str>> {
        decl.fields
            .iter()
            .map(|f| f.names.iter().map(String::as_str).collect())
            .collect()
    }

    fn method_names(decl: &TypeDecl) -> Vec<&str> {
        decl.methods.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn scans_members_of_a_class() {
        let unit = parse(
            r#"
            package net.minecraft.server;

            import java.util.*;

            @SuppressWarnings("unchecked")
            public class Foo<T extends Comparable<T>> extends Bar implements Baz {
                private static final Map<String, List<Integer>> CACHE = new HashMap<String, List<Integer>>();
                int a, b = 3, c[];
                protected String name = "}{";
                static { init(); }
                public Foo() { this(1); }
                Foo(int x) {}
                <R> R map(java.util.function.Function<T, R> fn) throws Exception { return fn.apply(null); }
                abstract void tick();
                private final Runnable r = () -> { int inner = 0; };
            }
            "#,
        )
        .unwrap();

        assert_eq!(unit.package.as_deref(), Some("net.minecraft.server"));
        let foo = &unit.types[0];
        assert_eq!(foo.qualified_name, "net.minecraft.server.Foo");
        assert_eq!(foo.modifiers.visibility(), Visibility::Public);
        assert_eq!(
            field_names(foo),
            vec![vec!["CACHE"], vec!["a", "b", "c"], vec!["name"], vec!["r"]]
        );
        assert_eq!(method_names(foo), vec!["Foo", "Foo", "map", "tick"]);
        assert!(foo.methods[0].constructor);
        assert!(!foo.methods[2].constructor);
        assert_eq!(foo.methods[1].modifiers.visibility(), Visibility::PackagePrivate);
    }

    #[test]
    fn scans_enums_records_interfaces_and_nesting() {
        let unit = parse(
            r#"
            enum Mode {
                FAST("f") { @Override void run() {} },
                SLOW("s");
                private final String id;
                Mode(String id) { this.id = id; }
                void run() {}

                public interface Listener { int LIMIT = 3; void changed(Mode mode); default void reset() {} }
                record Pair<A, B>(A first, B second) implements Comparable<Pair<A, B>> {
                    static int count;
                }
                @interface Marker { String value() default "x"; }
            }
            "#,
        )
        .unwrap();

        let mode = &unit.types[0];
        assert_eq!(mode.kind, TypeKind::Enum);
        assert_eq!(mode.qualified_name, "Mode");
        assert_eq!(field_names(mode), vec![vec!["id"]]);
        assert_eq!(method_names(mode), vec!["Mode", "run"]);

        let nested: Vec<(&str, TypeKind)> = mode
            .types
            .iter()
            .map(|t| (t.qualified_name.as_str(), t.kind))
            .collect();
        assert_eq!(
            nested,
            vec![
                ("Mode.Listener", TypeKind::Interface),
                ("Mode.Pair", TypeKind::Record),
                ("Mode.Marker", TypeKind::Annotation),
            ]
        );
        assert_eq!(field_names(&mode.types[0]), vec![vec!["LIMIT"]]);
        assert_eq!(method_names(&mode.types[0]), vec!["changed", "reset"]);
        assert_eq!(field_names(&mode.types[1]), vec![vec!["count"]]);
        assert_eq!(method_names(&mode.types[2]), vec!["value"]);
    }

    #[test]
    fn keyword_ranges_and_insert_points() {
        let source = "class A {\n    @Deprecated static int a;\n    @Override\n    void b() {}\n    final protected int c;\n}\n";
        let unit = parse(source).unwrap();
        let a = &unit.types[0];

        assert_eq!(a.modifiers.visibility, None);
        assert_eq!(a.modifiers.insert_at, 0);

        let static_at = source.find("static").unwrap();
        assert_eq!(a.fields[0].modifiers.insert_at, static_at);

        let void_at = source.find("void").unwrap();
        assert_eq!(a.methods[0].modifiers.visibility, None);
        assert_eq!(a.methods[0].modifiers.insert_at, void_at);

        let protected_at = source.find("protected").unwrap();
        assert_eq!(
            a.fields[1].modifiers.visibility,
            Some((Visibility::Protected, protected_at, protected_at + "protected".len()))
        );
    }

    #[test]
    fn local_and_anonymous_classes_are_not_members() {
        let unit = parse(
            "class A {\n    void f() {\n        class Local { int hidden; }\n        new Object() { int alsoHidden; };\n    }\n}\n",
        )
        .unwrap();
        let a = &unit.types[0];
        assert!(a.types.is_empty());
        assert!(a.fields.is_empty());
        assert_eq!(method_names(a), vec!["f"]);
    }

    #[test]
    fn syntax_error_reports_its_line() {
        match parse("package a;\n\nclass A {\n    void f() {\n        int x = ;\n    }\n}\n") {
            Err(AccessError::Parse { line, .. }) => assert_eq!(line, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unbalanced_braces_are_a_parse_error() {
        assert!(matches!(
            parse("class A {\n void f() {\n"),
            Err(AccessError::Parse { .. })
        ));
    }

    #[test]
    fn comments_and_literals_are_opaque() {
        let unit = parse(
            "class A {\n    /* int commented; } */\n    String s = \"{ int quoted; }\"; // int trailing;\n}\n",
        )
        .unwrap();
        assert_eq!(field_names(&unit.types[0]), vec![vec!["s"]]);
    }
}
