use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a class file could not be read, edited or written back.
#[derive(Debug)]
pub enum Error {
    /// Input ended inside a structure.
    Truncated,
    /// Bytes left over after a structure that must fill its slice.
    TrailingBytes(usize),
    BadMagic(u32),
    BadConstantIndex(u16),
    UnknownConstantTag(u8),
    WrongConstantKind {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    /// `constant_pool_count` disagrees with the slots the entries occupy.
    PoolCountMismatch { declared: usize, slots: usize },
    /// Interning would push the pool past `u16::MAX` slots.
    ConstantPoolFull,
    /// A replacement would turn a one-slot entry into a two-slot one, or back.
    SlotWidthChanged(u16),
    /// Encoded length of a renamed string.
    StringTooLong(usize),
    BadModifiedUtf8,
    BadDescriptor(String),
    BadSignature(String),
    /// Attribute whose contents do not match its declared layout.
    BadAttribute(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => f.write_str("class file is truncated"),
            Error::TrailingBytes(count) => write!(f, "{count} bytes left over after a structure"),
            Error::BadMagic(magic) => write!(f, "not a class file (magic 0x{magic:08x})"),
            Error::BadConstantIndex(index) => write!(f, "no usable constant at index {index}"),
            Error::UnknownConstantTag(tag) => write!(f, "unknown constant tag {tag}"),
            Error::WrongConstantKind {
                index,
                expected,
                found,
            } => write!(f, "constant #{index} is {found}, expected {expected}"),
            Error::PoolCountMismatch { declared, slots } => write!(
                f,
                "constant pool declares {declared} slots but its entries occupy {slots}"
            ),
            Error::ConstantPoolFull => f.write_str("constant pool has no free slots left"),
            Error::SlotWidthChanged(index) => {
                write!(f, "replacing constant #{index} would change its slot width")
            }
            Error::StringTooLong(len) => {
                write!(f, "string constant of {len} bytes does not fit in a Utf8 entry")
            }
            Error::BadModifiedUtf8 => f.write_str("Utf8 constant is not valid modified UTF-8"),
            Error::BadDescriptor(desc) => write!(f, "malformed descriptor {desc:?}"),
            Error::BadSignature(sig) => write!(f, "malformed generic signature {sig:?}"),
            Error::BadAttribute(name) => write!(f, "{name} attribute does not match its layout"),
        }
    }
}

impl std::error::Error for Error {}
