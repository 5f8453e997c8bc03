//! Source-level access transformation.
//!
//! An [`AccessMap`] names types by their qualified name and overrides the
//! visibility of the type itself, its fields and its methods. [`AccessMap::apply`]
//! scans a Java compilation unit for declarations and rewrites only their
//! visibility keywords.

mod error;
mod map;
pub mod scanner;
mod transform;
mod visibility;

pub use crate::error::{AccessError, Result};
pub use crate::map::{AccessMap, TransformationEntry};
pub use crate::visibility::Visibility;
