use anvil_classfile::{
    map_class_constant, map_class_signature, map_field_signature, map_method_signature,
    AttributeInfo, ClassFile, CodeAttribute, ConstantPool, CpInfo, Error, MemberInfo, Reader,
    Result, Writer,
};

use crate::resolver::NameResolver;

/// Attributes dropped from every rewritten class.
const STRIPPED_CLASS_ATTRIBUTES: &[&str] = &["SourceFile", "SourceDebugExtension"];
const STRIPPED_CODE_ATTRIBUTES: &[&str] = &[
    "LineNumberTable",
    "LocalVariableTable",
    "LocalVariableTypeTable",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemappedClass {
    pub original_name: String,
    /// Internal name after remapping (`net/minecraft/server/Foo`).
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Rewrites one class file through `resolver` and strips debug attributes.
///
/// Existing `Utf8` constants are never modified. New names are appended to the
/// constant pool and the structures that use them are redirected, which keeps
/// string literals and every index embedded in bytecode intact.
pub fn remap_class<R: NameResolver + ?Sized>(bytes: &[u8], resolver: &R) -> Result<RemappedClass> {
    let mut class = ClassFile::parse(bytes)?;
    let original = class.constant_pool.clone();
    let original_name = original.class_name(class.this_class)?;

    let mut rewriter = Rewriter {
        resolver,
        original: &original,
        cp: std::mem::take(&mut class.constant_pool),
        owner: &original_name,
    };

    rewriter.rewrite_constants()?;

    for field in &mut class.fields {
        rewriter.rewrite_member(field, MemberKind::Field)?;
    }
    for method in &mut class.methods {
        rewriter.rewrite_member(method, MemberKind::Method)?;
    }
    class.attributes =
        rewriter.rewrite_attributes(std::mem::take(&mut class.attributes), Target::Class)?;

    class.constant_pool = rewriter.cp;
    let name = class.name()?;
    Ok(RemappedClass {
        original_name,
        name,
        bytes: class.to_bytes(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Field,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Class,
    Field,
    Method,
    RecordComponent,
    Code,
}

struct Rewriter<'a, R: ?Sized> {
    resolver: &'a R,
    /// Snapshot of the pool before any rewrite; all lookups of original names
    /// go through it.
    original: &'a ConstantPool,
    cp: ConstantPool,
    owner: &'a str,
}

impl<R: NameResolver + ?Sized> Rewriter<'_, R> {
    fn map_type(&self, name: &str) -> String {
        self.resolver.map_type(name)
    }

    fn map_descriptor(&self, descriptor: &str) -> Result<String> {
        self.resolver.map_descriptor(descriptor)
    }

    /// Interns `new` unless it equals the original value at `index`.
    fn replace_utf8(&mut self, index: u16, new: &str) -> Result<u16> {
        if self.original.utf8(index)? == new {
            return Ok(index);
        }
        self.cp.intern_utf8(new)
    }

    fn rewrite_constants(&mut self) -> Result<()> {
        let entries: Vec<(u16, CpInfo)> = self
            .original
            .iter()
            .map(|(index, info)| (index, info.clone()))
            .collect();

        for (index, info) in entries {
            match info {
                CpInfo::Class { name_index } => {
                    let name = self.original.utf8(name_index)?;
                    let mapped = map_class_constant(&name, |n| self.map_type(n))?;
                    if mapped != name {
                        let name_index = self.cp.intern_utf8(&mapped)?;
                        self.cp.set(index, CpInfo::Class { name_index })?;
                    }
                }
                CpInfo::Fieldref {
                    class_index,
                    name_and_type_index,
                } => {
                    if let Some(nat) =
                        self.remap_member_ref(class_index, name_and_type_index, MemberKind::Field)?
                    {
                        self.cp.set(
                            index,
                            CpInfo::Fieldref {
                                class_index,
                                name_and_type_index: nat,
                            },
                        )?;
                    }
                }
                CpInfo::Methodref {
                    class_index,
                    name_and_type_index,
                } => {
                    if let Some(nat) =
                        self.remap_member_ref(class_index, name_and_type_index, MemberKind::Method)?
                    {
                        self.cp.set(
                            index,
                            CpInfo::Methodref {
                                class_index,
                                name_and_type_index: nat,
                            },
                        )?;
                    }
                }
                CpInfo::InterfaceMethodref {
                    class_index,
                    name_and_type_index,
                } => {
                    if let Some(nat) =
                        self.remap_member_ref(class_index, name_and_type_index, MemberKind::Method)?
                    {
                        self.cp.set(
                            index,
                            CpInfo::InterfaceMethodref {
                                class_index,
                                name_and_type_index: nat,
                            },
                        )?;
                    }
                }
                CpInfo::MethodType { descriptor_index } => {
                    let descriptor = self.original.utf8(descriptor_index)?;
                    let mapped = self.map_descriptor(&descriptor)?;
                    if mapped != descriptor {
                        let descriptor_index = self.cp.intern_utf8(&mapped)?;
                        self.cp.set(index, CpInfo::MethodType { descriptor_index })?;
                    }
                }
                CpInfo::InvokeDynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    if let Some(nat) = self.remap_dynamic_descriptor(name_and_type_index)? {
                        self.cp.set(
                            index,
                            CpInfo::InvokeDynamic {
                                bootstrap_method_attr_index,
                                name_and_type_index: nat,
                            },
                        )?;
                    }
                }
                CpInfo::Dynamic {
                    bootstrap_method_attr_index,
                    name_and_type_index,
                } => {
                    if let Some(nat) = self.remap_dynamic_descriptor(name_and_type_index)? {
                        self.cp.set(
                            index,
                            CpInfo::Dynamic {
                                bootstrap_method_attr_index,
                                name_and_type_index: nat,
                            },
                        )?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns a fresh `NameAndType` index when the reference changes.
    ///
    /// `NameAndType` entries are shared between references to different owners,
    /// so they are never edited in place.
    fn remap_member_ref(
        &mut self,
        class_index: u16,
        name_and_type_index: u16,
        kind: MemberKind,
    ) -> Result<Option<u16>> {
        let owner = self.original.class_name(class_index)?;
        let (name, descriptor) = self.original.name_and_type(name_and_type_index)?;
        let new_name = match kind {
            MemberKind::Field => self.resolver.map_field(&owner, &name, &descriptor),
            MemberKind::Method => self.resolver.map_method(&owner, &name, &descriptor),
        };
        let new_descriptor = self.map_descriptor(&descriptor)?;
        if new_name == name && new_descriptor == descriptor {
            return Ok(None);
        }
        self.cp
            .intern_name_and_type(&new_name, &new_descriptor)
            .map(Some)
    }

    fn remap_dynamic_descriptor(&mut self, name_and_type_index: u16) -> Result<Option<u16>> {
        let (name, descriptor) = self.original.name_and_type(name_and_type_index)?;
        let mapped = self.map_descriptor(&descriptor)?;
        if mapped == descriptor {
            return Ok(None);
        }
        self.cp.intern_name_and_type(&name, &mapped).map(Some)
    }

    fn rewrite_member(&mut self, member: &mut MemberInfo, kind: MemberKind) -> Result<()> {
        let name = self.original.utf8(member.name_index)?;
        let descriptor = self.original.utf8(member.descriptor_index)?;
        let (new_name, target) = match kind {
            MemberKind::Field => (
                self.resolver.map_field(self.owner, &name, &descriptor),
                Target::Field,
            ),
            MemberKind::Method => (
                self.resolver.map_method(self.owner, &name, &descriptor),
                Target::Method,
            ),
        };
        let new_descriptor = self.map_descriptor(&descriptor)?;

        member.name_index = self.replace_utf8(member.name_index, &new_name)?;
        member.descriptor_index = self.replace_utf8(member.descriptor_index, &new_descriptor)?;
        member.attributes = self.rewrite_attributes(std::mem::take(&mut member.attributes), target)?;
        Ok(())
    }

    fn rewrite_attributes(
        &mut self,
        attributes: Vec<AttributeInfo>,
        target: Target,
    ) -> Result<Vec<AttributeInfo>> {
        let mut out = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            let name = self.original.utf8(attribute.name_index)?;
            let stripped = match target {
                Target::Class => STRIPPED_CLASS_ATTRIBUTES.contains(&name.as_str()),
                Target::Code => STRIPPED_CODE_ATTRIBUTES.contains(&name.as_str()),
                _ => false,
            };
            if stripped {
                continue;
            }

            let info = match name.as_str() {
                "Code" if target == Target::Method => self.rewrite_code(&attribute.info)?,
                "Signature" => self.rewrite_signature(&attribute.info, target)?,
                "InnerClasses" if target == Target::Class => {
                    self.rewrite_inner_classes(&attribute.info)?
                }
                "EnclosingMethod" if target == Target::Class => {
                    self.rewrite_enclosing_method(&attribute.info)?
                }
                "Record" if target == Target::Class => self.rewrite_record(&attribute.info)?,
                "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                    self.rewrite_payload(&attribute.info, "annotations", |this, r, w| {
                        this.copy_annotations(r, w)
                    })?
                }
                "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                    self.rewrite_payload(&attribute.info, "parameter annotations", |this, r, w| {
                        let parameters = r.read_u1()?;
                        w.write_u1(parameters);
                        for _ in 0..parameters {
                            this.copy_annotations(r, w)?;
                        }
                        Ok(())
                    })?
                }
                "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                    self.rewrite_payload(&attribute.info, "type annotations", |this, r, w| {
                        let count = r.read_u2()?;
                        w.write_u2(count);
                        for _ in 0..count {
                            this.copy_type_annotation(r, w)?;
                        }
                        Ok(())
                    })?
                }
                "AnnotationDefault" if target == Target::Method => {
                    self.rewrite_payload(&attribute.info, "AnnotationDefault", |this, r, w| {
                        this.copy_element_value(r, w)
                    })?
                }
                _ => attribute.info,
            };
            out.push(AttributeInfo {
                name_index: attribute.name_index,
                info,
            });
        }
        Ok(out)
    }

    fn rewrite_payload(
        &mut self,
        info: &[u8],
        what: &'static str,
        body: impl FnOnce(&mut Self, &mut Reader<'_>, &mut Writer) -> Result<()>,
    ) -> Result<Vec<u8>> {
        let mut reader = Reader::new(info);
        let mut writer = Writer::new();
        body(self, &mut reader, &mut writer)?;
        reader
            .ensure_empty()
            .map_err(|_| Error::BadAttribute(what))?;
        Ok(writer.into_bytes())
    }

    fn rewrite_code(&mut self, info: &[u8]) -> Result<Vec<u8>> {
        let mut code = CodeAttribute::parse(info)?;
        code.attributes = self.rewrite_attributes(std::mem::take(&mut code.attributes), Target::Code)?;
        Ok(code.to_bytes())
    }

    fn rewrite_signature(&mut self, info: &[u8], target: Target) -> Result<Vec<u8>> {
        let mut reader = Reader::new(info);
        let index = reader.read_u2()?;
        reader
            .ensure_empty()
            .map_err(|_| Error::BadAttribute("Signature"))?;

        let signature = self.original.utf8(index)?;
        let resolver = self.resolver;
        let map = |name: &str| resolver.map_type(name);
        let mapped = match target {
            Target::Class => map_class_signature(&signature, map)?,
            Target::Method => map_method_signature(&signature, map)?,
            _ => map_field_signature(&signature, map)?,
        };
        let index = self.replace_utf8(index, &mapped)?;
        Ok(index.to_be_bytes().to_vec())
    }

    fn rewrite_inner_classes(&mut self, info: &[u8]) -> Result<Vec<u8>> {
        self.rewrite_payload(info, "InnerClasses", |this, r, w| {
            let count = r.read_u2()?;
            w.write_u2(count);
            for _ in 0..count {
                let inner_class = r.read_u2()?;
                let outer_class = r.read_u2()?;
                let mut inner_name = r.read_u2()?;
                let flags = r.read_u2()?;

                if inner_name != 0 {
                    let binary_name = this.original.class_name(inner_class)?;
                    let simple = this.original.utf8(inner_name)?;
                    let mapped = inner_simple_name(&this.map_type(&binary_name), &simple);
                    inner_name = this.replace_utf8(inner_name, &mapped)?;
                }

                w.write_u2(inner_class);
                w.write_u2(outer_class);
                w.write_u2(inner_name);
                w.write_u2(flags);
            }
            Ok(())
        })
    }

    fn rewrite_enclosing_method(&mut self, info: &[u8]) -> Result<Vec<u8>> {
        self.rewrite_payload(info, "EnclosingMethod", |this, r, w| {
            let class_index = r.read_u2()?;
            let mut method_index = r.read_u2()?;
            if method_index != 0 {
                let owner = this.original.class_name(class_index)?;
                let (name, descriptor) = this.original.name_and_type(method_index)?;
                let new_name = this.resolver.map_method(&owner, &name, &descriptor);
                let new_descriptor = this.map_descriptor(&descriptor)?;
                if new_name != name || new_descriptor != descriptor {
                    method_index = this.cp.intern_name_and_type(&new_name, &new_descriptor)?;
                }
            }
            w.write_u2(class_index);
            w.write_u2(method_index);
            Ok(())
        })
    }

    fn rewrite_record(&mut self, info: &[u8]) -> Result<Vec<u8>> {
        self.rewrite_payload(info, "Record", |this, r, w| {
            let count = r.read_u2()?;
            w.write_u2(count);
            for _ in 0..count {
                let name_index = r.read_u2()?;
                let descriptor_index = r.read_u2()?;
                let name = this.original.utf8(name_index)?;
                let descriptor = this.original.utf8(descriptor_index)?;
                let new_name = this.resolver.map_field(this.owner, &name, &descriptor);
                let new_descriptor = this.map_descriptor(&descriptor)?;
                w.write_u2(this.replace_utf8(name_index, &new_name)?);
                w.write_u2(this.replace_utf8(descriptor_index, &new_descriptor)?);

                let attribute_count = r.read_u2()? as usize;
                let mut attributes = Vec::with_capacity(attribute_count);
                for _ in 0..attribute_count {
                    let name_index = r.read_u2()?;
                    let length = r.read_u4()? as usize;
                    attributes.push(AttributeInfo {
                        name_index,
                        info: r.read_bytes(length)?.to_vec(),
                    });
                }
                let attributes = this.rewrite_attributes(attributes, Target::RecordComponent)?;
                w.write_u2(attributes.len() as u16);
                for attribute in attributes {
                    w.write_u2(attribute.name_index);
                    w.write_u4(attribute.info.len() as u32);
                    w.write_bytes(&attribute.info);
                }
            }
            Ok(())
        })
    }

    fn copy_annotations(&mut self, r: &mut Reader<'_>, w: &mut Writer) -> Result<()> {
        let count = r.read_u2()?;
        w.write_u2(count);
        for _ in 0..count {
            self.copy_annotation(r, w)?;
        }
        Ok(())
    }

    fn copy_annotation(&mut self, r: &mut Reader<'_>, w: &mut Writer) -> Result<()> {
        let type_index = r.read_u2()?;
        w.write_u2(self.remap_descriptor_utf8(type_index)?);
        let pairs = r.read_u2()?;
        w.write_u2(pairs);
        for _ in 0..pairs {
            w.write_u2(r.read_u2()?);
            self.copy_element_value(r, w)?;
        }
        Ok(())
    }

    fn copy_element_value(&mut self, r: &mut Reader<'_>, w: &mut Writer) -> Result<()> {
        let tag = r.read_u1()?;
        w.write_u1(tag);
        match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
                w.write_u2(r.read_u2()?);
            }
            b'e' => {
                let type_index = r.read_u2()?;
                w.write_u2(self.remap_descriptor_utf8(type_index)?);
                w.write_u2(r.read_u2()?);
            }
            b'c' => {
                let class_index = r.read_u2()?;
                w.write_u2(self.remap_descriptor_utf8(class_index)?);
            }
            b'@' => self.copy_annotation(r, w)?,
            b'[' => {
                let count = r.read_u2()?;
                w.write_u2(count);
                for _ in 0..count {
                    self.copy_element_value(r, w)?;
                }
            }
            _ => return Err(Error::BadAttribute("annotation element value")),
        }
        Ok(())
    }

    fn copy_type_annotation(&mut self, r: &mut Reader<'_>, w: &mut Writer) -> Result<()> {
        let target_type = r.read_u1()?;
        w.write_u1(target_type);
        let target_info_len = match target_type {
            0x00 | 0x01 | 0x16 => 1,
            0x10 | 0x17 | 0x42 | 0x43..=0x46 => 2,
            0x11 | 0x12 => 2,
            0x13..=0x15 => 0,
            0x47..=0x4B => 3,
            0x40 | 0x41 => {
                let entries = r.read_u2()?;
                w.write_u2(entries);
                usize::from(entries) * 6
            }
            _ => return Err(Error::BadAttribute("type annotation target")),
        };
        w.write_bytes(r.read_bytes(target_info_len)?);

        let path_length = r.read_u1()?;
        w.write_u1(path_length);
        w.write_bytes(r.read_bytes(usize::from(path_length) * 2)?);

        self.copy_annotation(r, w)
    }

    fn remap_descriptor_utf8(&mut self, index: u16) -> Result<u16> {
        let descriptor = self.original.utf8(index)?;
        let mapped = self.map_descriptor(&descriptor)?;
        self.replace_utf8(index, &mapped)
    }
}

/// Simple name for an `InnerClasses` entry after its binary name was renamed.
///
/// Takes the part after the last `$` (skipping the digits of anonymous/local
/// class counters); names without `$` keep the original simple name.
fn inner_simple_name(mapped_binary_name: &str, original_simple: &str) -> String {
    match mapped_binary_name.rfind('$') {
        None => original_simple.to_string(),
        Some(idx) => {
            let tail = &mapped_binary_name[idx + 1..];
            let simple = tail.trim_start_matches(|c: char| c.is_ascii_digit());
            if simple.is_empty() {
                original_simple.to_string()
            } else {
                simple.to_string()
            }
        }
    }
}
