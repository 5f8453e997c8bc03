use crate::attribute::AttributeInfo;
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::writer::Writer;
use crate::MAGIC;

/// A parsed class file that can be written back with [`ClassFile::to_bytes`].
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    /// `0` for `java/lang/Object` and module descriptors.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

/// Type hierarchy facts of a class, without its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub access_flags: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    /// Parses only the constant pool and the hierarchy part of a class file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let (_, _, cp) = read_prologue(&mut reader)?;
        let access_flags = reader.read_u2()?;
        let name = cp.class_name(reader.read_u2()?)?;
        let super_index = reader.read_u2()?;
        let super_name = if super_index == 0 {
            None
        } else {
            Some(cp.class_name(super_index)?)
        };
        let count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(count);
        for _ in 0..count {
            interfaces.push(cp.class_name(reader.read_u2()?)?);
        }
        Ok(Self {
            access_flags,
            name,
            super_name,
            interfaces,
        })
    }
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let (minor_version, major_version, constant_pool) = read_prologue(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = reader.read_u2()?;
        let super_class = reader.read_u2()?;

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(reader.read_u2()?);
        }

        let fields = parse_members(&mut reader)?;
        let methods = parse_members(&mut reader)?;
        let attributes = AttributeInfo::parse_all(&mut reader)?;

        reader.ensure_empty()?;

        let class = Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        // Fail early on a dangling this_class rather than at first use.
        class.name()?;
        Ok(class)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_u4(MAGIC);
        writer.write_u2(self.minor_version);
        writer.write_u2(self.major_version);
        self.constant_pool.write(&mut writer);
        writer.write_u2(self.access_flags);
        writer.write_u2(self.this_class);
        writer.write_u2(self.super_class);
        writer.write_u2(self.interfaces.len() as u16);
        for interface in &self.interfaces {
            writer.write_u2(*interface);
        }
        write_members(&mut writer, &self.fields);
        write_members(&mut writer, &self.methods);
        AttributeInfo::write_all(&mut writer, &self.attributes);
        writer.into_bytes()
    }

    pub fn name(&self) -> Result<String> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn super_name(&self) -> Result<Option<String>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<String>> {
        self.interfaces
            .iter()
            .map(|&index| self.constant_pool.class_name(index))
            .collect()
    }

    pub fn header(&self) -> Result<ClassHeader> {
        Ok(ClassHeader {
            access_flags: self.access_flags,
            name: self.name()?,
            super_name: self.super_name()?,
            interfaces: self.interface_names()?,
        })
    }
}

impl MemberInfo {
    pub fn name(&self, cp: &ConstantPool) -> Result<String> {
        cp.utf8(self.name_index)
    }

    pub fn descriptor(&self, cp: &ConstantPool) -> Result<String> {
        cp.utf8(self.descriptor_index)
    }
}

fn read_prologue(reader: &mut Reader<'_>) -> Result<(u16, u16, ConstantPool)> {
    let magic = reader.read_u4()?;
    if magic != MAGIC {
        return Err(Error::BadMagic(magic));
    }
    let minor_version = reader.read_u2()?;
    let major_version = reader.read_u2()?;
    let cp = ConstantPool::parse(reader)?;
    Ok((minor_version, major_version, cp))
}

fn parse_members(reader: &mut Reader<'_>) -> Result<Vec<MemberInfo>> {
    let count = reader.read_u2()? as usize;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        members.push(MemberInfo {
            access_flags: reader.read_u2()?,
            name_index: reader.read_u2()?,
            descriptor_index: reader.read_u2()?,
            attributes: AttributeInfo::parse_all(reader)?,
        });
    }
    Ok(members)
}

fn write_members(writer: &mut Writer, members: &[MemberInfo]) {
    writer.write_u2(members.len() as u16);
    for member in members {
        writer.write_u2(member.access_flags);
        writer.write_u2(member.name_index);
        writer.write_u2(member.descriptor_index);
        AttributeInfo::write_all(writer, &member.attributes);
    }
}
