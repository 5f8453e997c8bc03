use anvil_mappings::{CompactMapping, CsvMapping};

use crate::inheritance::InheritanceIndex;

/// Maps type and member names of one class hierarchy to new names.
///
/// Every method falls back to the input name when nothing matches; a lookup
/// miss is never an error.
pub trait NameResolver {
    fn map_type(&self, name: &str) -> String;

    fn map_field(&self, owner: &str, name: &str, descriptor: &str) -> String;

    fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> String;

    /// Rewrites the object types of a field or method descriptor.
    fn map_descriptor(&self, descriptor: &str) -> anvil_classfile::Result<String> {
        anvil_classfile::map_descriptor(descriptor, |name| self.map_type(name))
    }
}

impl<T: NameResolver + ?Sized> NameResolver for &T {
    fn map_type(&self, name: &str) -> String {
        (**self).map_type(name)
    }

    fn map_field(&self, owner: &str, name: &str, descriptor: &str) -> String {
        (**self).map_field(owner, name, descriptor)
    }

    fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> String {
        (**self).map_method(owner, name, descriptor)
    }
}

/// Type renames plus owner-qualified member renames from a compact mapping.
///
/// Member lookups walk the [`InheritanceIndex`] with the original (unmapped)
/// owner names, so a reference through a subclass finds the rename declared on
/// the superclass.
#[derive(Debug, Clone)]
pub struct StructuralResolver {
    mapping: CompactMapping,
    index: InheritanceIndex,
}

impl StructuralResolver {
    pub fn new(mapping: CompactMapping, index: InheritanceIndex) -> Self {
        Self { mapping, index }
    }

    pub fn mapping(&self) -> &CompactMapping {
        &self.mapping
    }

    pub fn index(&self) -> &InheritanceIndex {
        &self.index
    }
}

impl NameResolver for StructuralResolver {
    fn map_type(&self, name: &str) -> String {
        self.mapping.type_name(name).unwrap_or(name).to_string()
    }

    fn map_field(&self, owner: &str, name: &str, _descriptor: &str) -> String {
        self.index
            .find_in_hierarchy(owner, |class| {
                self.mapping.field_name(class, name).map(str::to_string)
            })
            .unwrap_or_else(|| name.to_string())
    }

    fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> String {
        if is_special_method(name) {
            return name.to_string();
        }
        self.index
            .find_in_hierarchy(owner, |class| {
                self.mapping
                    .method_name(class, name, descriptor)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| name.to_string())
    }
}

/// Name-only member renames from the CSV mappings. Types are never renamed.
#[derive(Debug, Clone, Default)]
pub struct CosmeticResolver {
    fields: CsvMapping,
    methods: CsvMapping,
}

impl CosmeticResolver {
    pub fn new(fields: CsvMapping, methods: CsvMapping) -> Self {
        Self { fields, methods }
    }
}

impl NameResolver for CosmeticResolver {
    fn map_type(&self, name: &str) -> String {
        name.to_string()
    }

    fn map_field(&self, _owner: &str, name: &str, _descriptor: &str) -> String {
        self.fields.get(name).unwrap_or(name).to_string()
    }

    fn map_method(&self, _owner: &str, name: &str, _descriptor: &str) -> String {
        if is_special_method(name) {
            return name.to_string();
        }
        self.methods.get(name).unwrap_or(name).to_string()
    }
}

/// Runs `first` and feeds its output names into `second`.
///
/// The order is fixed: `first` sees the original owner and descriptor, while
/// `second` sees the names `first` produced. With a structural first pass and
/// a cosmetic second pass this turns `a.b` into `field_1_b` and then into the
/// readable CSV name.
#[derive(Debug, Clone)]
pub struct ComposedResolver<A, B> {
    first: A,
    second: B,
}

impl<A: NameResolver, B: NameResolver> ComposedResolver<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    fn forward_descriptor(&self, descriptor: &str) -> String {
        // Descriptors of references were already validated by the class reader;
        // an unparsable one is passed on untouched.
        self.first
            .map_descriptor(descriptor)
            .unwrap_or_else(|_| descriptor.to_string())
    }
}

impl<A: NameResolver, B: NameResolver> NameResolver for ComposedResolver<A, B> {
    fn map_type(&self, name: &str) -> String {
        self.second.map_type(&self.first.map_type(name))
    }

    fn map_field(&self, owner: &str, name: &str, descriptor: &str) -> String {
        let renamed = self.first.map_field(owner, name, descriptor);
        self.second.map_field(
            &self.first.map_type(owner),
            &renamed,
            &self.forward_descriptor(descriptor),
        )
    }

    fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> String {
        let renamed = self.first.map_method(owner, name, descriptor);
        self.second.map_method(
            &self.first.map_type(owner),
            &renamed,
            &self.forward_descriptor(descriptor),
        )
    }
}

fn is_special_method(name: &str) -> bool {
    name == "<init>" || name == "<clinit>"
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_mappings::Side;

    fn structural() -> StructuralResolver {
        let compact = CompactMapping::parse(
            "a net/Alpha\n\
             b net/Beta\n\
             a f field_1_f\n\
             a foo (I)V func_2_foo\n",
        );
        let mut index = InheritanceIndex::new();
        index.insert("b", Some("a".into()), vec![]);
        index.insert("a", Some("java/lang/Object".into()), vec![]);
        StructuralResolver::new(compact, index)
    }

    fn cosmetic() -> CosmeticResolver {
        let fields =
            CsvMapping::parse("searge,name,side,desc\nfield_1_f,health,2,\nf,wrong,2,\n", Side::Client)
                .unwrap();
        let methods = CsvMapping::parse(
            "searge,name,side,desc\nfunc_2_foo,tick,2,\nfoo,bar,2,\n",
            Side::Client,
        )
        .unwrap();
        CosmeticResolver::new(fields, methods)
    }

    #[test]
    fn unknown_type_maps_to_itself() {
        let resolver = structural();
        assert_eq!(resolver.map_type("java/lang/String"), "java/lang/String");
        assert_eq!(resolver.map_type("a"), "net/Alpha");
    }

    #[test]
    fn inherited_member_resolves_through_superclass() {
        let resolver = structural();
        assert_eq!(resolver.map_field("b", "f", "I"), "field_1_f");
        assert_eq!(resolver.map_method("b", "foo", "(I)V"), "func_2_foo");
        assert_eq!(resolver.map_method("b", "foo", "(J)V"), "foo");
    }

    #[test]
    fn compact_rename_takes_precedence_over_csv_name() {
        let resolver = ComposedResolver::new(structural(), cosmetic());
        // compact hit: foo -> func_2_foo -> tick; the csv row foo -> bar never applies
        assert_eq!(resolver.map_method("a", "foo", "(I)V"), "tick");
        assert_eq!(resolver.map_field("a", "f", "I"), "health");
    }

    #[test]
    fn csv_applies_when_compact_misses() {
        let resolver = ComposedResolver::new(structural(), cosmetic());
        assert_eq!(resolver.map_method("a", "foo", "(J)V"), "bar");
        assert_eq!(resolver.map_method("z", "unmapped", "()V"), "unmapped");
    }

    #[test]
    fn constructors_are_never_renamed() {
        let methods =
            CsvMapping::parse("searge,name,side\n<init>,oops,2\n", Side::Server).unwrap();
        let resolver = CosmeticResolver::new(CsvMapping::default(), methods);
        assert_eq!(resolver.map_method("a", "<init>", "()V"), "<init>");
    }

    #[test]
    fn composed_descriptor_mapping_uses_first_pass_types() {
        let resolver = ComposedResolver::new(structural(), cosmetic());
        assert_eq!(
            resolver.map_descriptor("(La;)Lb;").unwrap(),
            "(Lnet/Alpha;)Lnet/Beta;"
        );
    }
}
