//! Lossless reading and writing of JVM class files.
//!
//! Unlike a read-only stub parser, [`ClassFile`] keeps the constant pool and every
//! attribute payload so a class can be rewritten and serialized again. Bytecode is
//! never decoded: constant pool indices inside `Code` stay valid as long as existing
//! entries are left in place, which is why [`ConstantPool`] only ever appends.

#![forbid(unsafe_code)]

mod attribute;
mod classfile;
mod constant_pool;
mod descriptor;
mod error;
mod reader;
mod signature;
mod writer;

pub use crate::attribute::{AttributeInfo, CodeAttribute, ExceptionHandler};
pub use crate::classfile::{ClassFile, ClassHeader, MemberInfo};
pub use crate::constant_pool::{ConstantPool, CpInfo};
pub use crate::descriptor::{map_class_constant, map_descriptor};
pub use crate::error::{Error, Result};
pub use crate::reader::Reader;
pub use crate::signature::{map_class_signature, map_field_signature, map_method_signature};
pub use crate::writer::Writer;

/// Class file magic number.
pub const MAGIC: u32 = 0xCAFE_BABE;
