use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::writer::Writer;

/// An attribute kept as its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn name(&self, cp: &ConstantPool) -> Result<String> {
        cp.utf8(self.name_index)
    }

    pub(crate) fn parse_all(reader: &mut Reader<'_>) -> Result<Vec<AttributeInfo>> {
        let count = reader.read_u2()? as usize;
        let mut attributes = Vec::with_capacity(count);
        for _ in 0..count {
            let name_index = reader.read_u2()?;
            let length = reader.read_u4()? as usize;
            let info = reader.read_bytes(length)?.to_vec();
            attributes.push(AttributeInfo { name_index, info });
        }
        Ok(attributes)
    }

    pub(crate) fn write_all(writer: &mut Writer, attributes: &[AttributeInfo]) {
        writer.write_u2(attributes.len() as u16);
        for attribute in attributes {
            writer.write_u2(attribute.name_index);
            writer.write_u4(attribute.info.len() as u32);
            writer.write_bytes(&attribute.info);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// Decoded `Code` attribute. The bytecode itself stays opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn parse(info: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(info);
        let max_stack = reader.read_u2()?;
        let max_locals = reader.read_u2()?;
        let code_length = reader.read_u4()? as usize;
        let code = reader.read_bytes(code_length)?.to_vec();

        let handlers = reader.read_u2()? as usize;
        let mut exception_table = Vec::with_capacity(handlers);
        for _ in 0..handlers {
            exception_table.push(ExceptionHandler {
                start_pc: reader.read_u2()?,
                end_pc: reader.read_u2()?,
                handler_pc: reader.read_u2()?,
                catch_type: reader.read_u2()?,
            });
        }

        let attributes = AttributeInfo::parse_all(&mut reader)?;
        reader
            .ensure_empty()
            .map_err(|_| Error::BadAttribute("Code"))?;

        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.write_u2(self.max_stack);
        writer.write_u2(self.max_locals);
        writer.write_u4(self.code.len() as u32);
        writer.write_bytes(&self.code);
        writer.write_u2(self.exception_table.len() as u16);
        for handler in &self.exception_table {
            writer.write_u2(handler.start_pc);
            writer.write_u2(handler.end_pc);
            writer.write_u2(handler.handler_pc);
            writer.write_u2(handler.catch_type);
        }
        AttributeInfo::write_all(&mut writer, &self.attributes);
        writer.into_bytes()
    }
}
