use crate::error::{Error, Result};

/// Rewrites every object type (`L...;`) in a field or method descriptor.
///
/// Array dimensions, primitives and the parameter parentheses are copied as-is.
pub fn map_descriptor(desc: &str, mut map: impl FnMut(&str) -> String) -> Result<String> {
    if !desc.contains('L') {
        return Ok(desc.to_string());
    }

    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;
    while let Some(start) = rest.find('L') {
        out.push_str(&rest[..start + 1]);
        let after = &rest[start + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| Error::BadDescriptor(desc.to_string()))?;
        out.push_str(&map(&after[..end]));
        out.push(';');
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Maps a `CONSTANT_Class` name, which is either an internal name or an array
/// descriptor such as `[[La;`.
pub fn map_class_constant(name: &str, mut map: impl FnMut(&str) -> String) -> Result<String> {
    if name.starts_with('[') {
        map_descriptor(name, map)
    } else {
        Ok(map(name))
    }
}
