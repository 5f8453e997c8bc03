//! Parsers for the two symbol table formats consumed by the remapper.
//!
//! - [`CompactMapping`]: owner-qualified type, field and method renames
//!   (`joined.csrg`).
//! - [`CsvMapping`]: name-only renames filtered by [`Side`] (`fields.csv`,
//!   `methods.csv`).

mod compact;
mod csv;
mod error;
mod side;

pub use crate::compact::CompactMapping;
pub use crate::csv::CsvMapping;
pub use crate::error::{MappingError, Result};
pub use crate::side::{Side, BOTH_SIDES_CODE};
