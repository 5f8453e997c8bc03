//! Two-pass symbol remapping of class archives.
//!
//! Pass one reads the hierarchy of every class into an [`InheritanceIndex`].
//! Pass two rewrites each class through a [`NameResolver`], normally a
//! [`ComposedResolver`] that applies the owner-qualified [`StructuralResolver`]
//! before the name-only [`CosmeticResolver`].

mod archive;
mod class;
mod error;
mod inheritance;
mod resolver;

use std::path::Path;

use anvil_mappings::{CompactMapping, CsvMapping};

pub use crate::archive::{is_signature_entry, ArchiveTransformer, TransformReport};
pub use crate::class::{remap_class, RemappedClass};
pub use crate::error::{RemapError, Result};
pub use crate::inheritance::InheritanceIndex;
pub use crate::resolver::{ComposedResolver, CosmeticResolver, NameResolver, StructuralResolver};

/// Remaps `input` into `output` using both mapping passes.
pub fn remap_archive(
    input: &Path,
    output: &Path,
    compact: CompactMapping,
    fields: CsvMapping,
    methods: CsvMapping,
) -> Result<TransformReport> {
    let index = InheritanceIndex::from_archive(input)?;
    let resolver = ComposedResolver::new(
        StructuralResolver::new(compact, index),
        CosmeticResolver::new(fields, methods),
    );
    ArchiveTransformer::new(&resolver).transform_file(input, output)
}
