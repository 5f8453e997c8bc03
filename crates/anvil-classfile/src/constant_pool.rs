use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::writer::Writer;

/// A single constant pool entry.
///
/// Floating point constants are kept as raw bits and `Utf8` entries as their
/// on-disk modified UTF-8 bytes, so a pool can be written back bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CpInfo {
    /// Slot 0 and the second slot of `Long`/`Double` entries.
    Unusable,
    Utf8(Vec<u8>),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
}

impl CpInfo {
    pub fn kind(&self) -> &'static str {
        match self {
            CpInfo::Unusable => "Unusable",
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer(_) => "Integer",
            CpInfo::Float(_) => "Float",
            CpInfo::Long(_) => "Long",
            CpInfo::Double(_) => "Double",
            CpInfo::Class { .. } => "Class",
            CpInfo::String { .. } => "String",
            CpInfo::Fieldref { .. } => "Fieldref",
            CpInfo::Methodref { .. } => "Methodref",
            CpInfo::InterfaceMethodref { .. } => "InterfaceMethodref",
            CpInfo::NameAndType { .. } => "NameAndType",
            CpInfo::MethodHandle { .. } => "MethodHandle",
            CpInfo::MethodType { .. } => "MethodType",
            CpInfo::Dynamic { .. } => "Dynamic",
            CpInfo::InvokeDynamic { .. } => "InvokeDynamic",
            CpInfo::Module { .. } => "Module",
            CpInfo::Package { .. } => "Package",
        }
    }

    fn slots(&self) -> usize {
        match self {
            CpInfo::Long(_) | CpInfo::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Append-only constant pool.
///
/// Existing entries may be redirected with [`ConstantPool::set`] but are never
/// removed, so indices embedded in bytecode keep pointing at the same slot.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<CpInfo>,
    lookup: HashMap<CpInfo, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            entries: vec![CpInfo::Unusable],
            lookup: HashMap::new(),
        }
    }

    pub fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut pool = Self {
            entries: Vec::with_capacity(count.max(1)),
            lookup: HashMap::with_capacity(count),
        };
        pool.entries.push(CpInfo::Unusable);

        while pool.entries.len() < count {
            let info = parse_entry(reader)?;
            let index = pool.entries.len() as u16;
            let slots = info.slots();
            pool.lookup.entry(info.clone()).or_insert(index);
            pool.entries.push(info);
            if slots == 2 {
                pool.entries.push(CpInfo::Unusable);
            }
        }

        if pool.entries.len() != count {
            // a trailing Long/Double overran the declared count
            return Err(Error::PoolCountMismatch {
                declared: count,
                slots: pool.entries.len(),
            });
        }
        Ok(pool)
    }

    pub fn write(&self, writer: &mut Writer) {
        writer.write_u2(self.entries.len() as u16);
        for info in &self.entries {
            write_entry(writer, info);
        }
    }

    /// Value of `constant_pool_count` (number of slots including slot 0).
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over `(index, entry)` for every usable slot.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, info)| !matches!(info, CpInfo::Unusable))
            .map(|(index, info)| (index as u16, info))
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        match self.entries.get(index as usize) {
            None | Some(CpInfo::Unusable) => Err(Error::BadConstantIndex(index)),
            Some(info) => Ok(info),
        }
    }

    /// Replace the entry at `index`. Only same-width replacements are allowed.
    pub fn set(&mut self, index: u16, info: CpInfo) -> Result<()> {
        let old = self.get(index)?.clone();
        if old.slots() != info.slots() {
            return Err(Error::SlotWidthChanged(index));
        }
        if self.lookup.get(&old) == Some(&index) {
            self.lookup.remove(&old);
        }
        self.lookup.entry(info.clone()).or_insert(index);
        self.entries[index as usize] = info;
        Ok(())
    }

    pub fn utf8(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Utf8(bytes) => decode_modified_utf8(bytes),
            other => Err(Error::WrongConstantKind {
                index,
                expected: "Utf8",
                found: other.kind(),
            }),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Class { name_index } => self.utf8(*name_index),
            other => Err(Error::WrongConstantKind {
                index,
                expected: "Class",
                found: other.kind(),
            }),
        }
    }

    /// Returns the `(name, descriptor)` pair of a `NameAndType` entry.
    pub fn name_and_type(&self, index: u16) -> Result<(String, String)> {
        match self.get(index)? {
            CpInfo::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            other => Err(Error::WrongConstantKind {
                index,
                expected: "NameAndType",
                found: other.kind(),
            }),
        }
    }

    /// Appends `info` unless an identical entry already exists.
    pub fn intern(&mut self, info: CpInfo) -> Result<u16> {
        if let Some(&index) = self.lookup.get(&info) {
            return Ok(index);
        }
        let index = self.entries.len();
        if index + info.slots() > u16::MAX as usize {
            return Err(Error::ConstantPoolFull);
        }
        let slots = info.slots();
        self.lookup.insert(info.clone(), index as u16);
        self.entries.push(info);
        if slots == 2 {
            self.entries.push(CpInfo::Unusable);
        }
        Ok(index as u16)
    }

    pub fn intern_utf8(&mut self, value: &str) -> Result<u16> {
        let bytes = encode_modified_utf8(value);
        if bytes.len() > u16::MAX as usize {
            return Err(Error::StringTooLong(bytes.len()));
        }
        self.intern(CpInfo::Utf8(bytes))
    }

    pub fn intern_class(&mut self, name: &str) -> Result<u16> {
        let name_index = self.intern_utf8(name)?;
        self.intern(CpInfo::Class { name_index })
    }

    pub fn intern_string(&mut self, value: &str) -> Result<u16> {
        let string_index = self.intern_utf8(value)?;
        self.intern(CpInfo::String { string_index })
    }

    pub fn intern_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
        let name_index = self.intern_utf8(name)?;
        let descriptor_index = self.intern_utf8(descriptor)?;
        self.intern(CpInfo::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub fn intern_field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
        let class_index = self.intern_class(owner)?;
        let name_and_type_index = self.intern_name_and_type(name, descriptor)?;
        self.intern(CpInfo::Fieldref {
            class_index,
            name_and_type_index,
        })
    }

    pub fn intern_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> Result<u16> {
        let class_index = self.intern_class(owner)?;
        let name_and_type_index = self.intern_name_and_type(name, descriptor)?;
        if interface {
            self.intern(CpInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            })
        } else {
            self.intern(CpInfo::Methodref {
                class_index,
                name_and_type_index,
            })
        }
    }
}

fn parse_entry(reader: &mut Reader<'_>) -> Result<CpInfo> {
    let tag = reader.read_u1()?;
    let info = match tag {
        1 => {
            let len = reader.read_u2()? as usize;
            CpInfo::Utf8(reader.read_bytes(len)?.to_vec())
        }
        3 => CpInfo::Integer(reader.read_u4()? as i32),
        4 => CpInfo::Float(reader.read_u4()?),
        5 => CpInfo::Long(reader.read_u8()? as i64),
        6 => CpInfo::Double(reader.read_u8()?),
        7 => CpInfo::Class {
            name_index: reader.read_u2()?,
        },
        8 => CpInfo::String {
            string_index: reader.read_u2()?,
        },
        9 => CpInfo::Fieldref {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        10 => CpInfo::Methodref {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        11 => CpInfo::InterfaceMethodref {
            class_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        12 => CpInfo::NameAndType {
            name_index: reader.read_u2()?,
            descriptor_index: reader.read_u2()?,
        },
        15 => CpInfo::MethodHandle {
            reference_kind: reader.read_u1()?,
            reference_index: reader.read_u2()?,
        },
        16 => CpInfo::MethodType {
            descriptor_index: reader.read_u2()?,
        },
        17 => CpInfo::Dynamic {
            bootstrap_method_attr_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        18 => CpInfo::InvokeDynamic {
            bootstrap_method_attr_index: reader.read_u2()?,
            name_and_type_index: reader.read_u2()?,
        },
        19 => CpInfo::Module {
            name_index: reader.read_u2()?,
        },
        20 => CpInfo::Package {
            name_index: reader.read_u2()?,
        },
        other => return Err(Error::UnknownConstantTag(other)),
    };
    Ok(info)
}

fn write_entry(writer: &mut Writer, info: &CpInfo) {
    match info {
        CpInfo::Unusable => {}
        CpInfo::Utf8(bytes) => {
            writer.write_u1(1);
            writer.write_u2(bytes.len() as u16);
            writer.write_bytes(bytes);
        }
        CpInfo::Integer(value) => {
            writer.write_u1(3);
            writer.write_u4(*value as u32);
        }
        CpInfo::Float(bits) => {
            writer.write_u1(4);
            writer.write_u4(*bits);
        }
        CpInfo::Long(value) => {
            writer.write_u1(5);
            writer.write_u8(*value as u64);
        }
        CpInfo::Double(bits) => {
            writer.write_u1(6);
            writer.write_u8(*bits);
        }
        CpInfo::Class { name_index } => {
            writer.write_u1(7);
            writer.write_u2(*name_index);
        }
        CpInfo::String { string_index } => {
            writer.write_u1(8);
            writer.write_u2(*string_index);
        }
        CpInfo::Fieldref {
            class_index,
            name_and_type_index,
        } => {
            writer.write_u1(9);
            writer.write_u2(*class_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::Methodref {
            class_index,
            name_and_type_index,
        } => {
            writer.write_u1(10);
            writer.write_u2(*class_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::InterfaceMethodref {
            class_index,
            name_and_type_index,
        } => {
            writer.write_u1(11);
            writer.write_u2(*class_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::NameAndType {
            name_index,
            descriptor_index,
        } => {
            writer.write_u1(12);
            writer.write_u2(*name_index);
            writer.write_u2(*descriptor_index);
        }
        CpInfo::MethodHandle {
            reference_kind,
            reference_index,
        } => {
            writer.write_u1(15);
            writer.write_u1(*reference_kind);
            writer.write_u2(*reference_index);
        }
        CpInfo::MethodType { descriptor_index } => {
            writer.write_u1(16);
            writer.write_u2(*descriptor_index);
        }
        CpInfo::Dynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        } => {
            writer.write_u1(17);
            writer.write_u2(*bootstrap_method_attr_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::InvokeDynamic {
            bootstrap_method_attr_index,
            name_and_type_index,
        } => {
            writer.write_u1(18);
            writer.write_u2(*bootstrap_method_attr_index);
            writer.write_u2(*name_and_type_index);
        }
        CpInfo::Module { name_index } => {
            writer.write_u1(19);
            writer.write_u2(*name_index);
        }
        CpInfo::Package { name_index } => {
            writer.write_u1(20);
            writer.write_u2(*name_index);
        }
    }
}

fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    if bytes.iter().all(|&b| b != 0 && b < 0x80) {
        return String::from_utf8(bytes.to_vec()).map_err(|_| Error::BadModifiedUtf8);
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            if b0 == 0 {
                return Err(Error::BadModifiedUtf8);
            }
            units.push(u16::from(b0));
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, i + 1)?;
            units.push((u16::from(b0 & 0x1F) << 6) | u16::from(b1 & 0x3F));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes, i + 1)?;
            let b2 = continuation(bytes, i + 2)?;
            units.push(
                (u16::from(b0 & 0x0F) << 12) | (u16::from(b1 & 0x3F) << 6) | u16::from(b2 & 0x3F),
            );
            i += 3;
        } else {
            return Err(Error::BadModifiedUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| Error::BadModifiedUtf8)
}

fn continuation(bytes: &[u8], index: usize) -> Result<u8> {
    match bytes.get(index) {
        Some(&b) if b & 0xC0 == 0x80 => Ok(b),
        _ => Err(Error::BadModifiedUtf8),
    }
}

fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
