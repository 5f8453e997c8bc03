//! Rewriting of generic `Signature` attribute strings (JVMS 4.7.9.1).
//!
//! Only class names change; type variables, wildcards and primitives are copied.
//! Inner class suffixes (`Lp/Outer<TT;>.Inner;`) are mapped through their full
//! binary name (`p/Outer$Inner`) and emitted as the renamed simple name.

use crate::error::{Error, Result};

pub fn map_class_signature(sig: &str, map: impl FnMut(&str) -> String) -> Result<String> {
    let mut parser = SignatureMapper::new(sig, map);
    parser.type_parameters_opt()?;
    // superclass followed by any number of interfaces
    while !parser.at_end() {
        parser.class_type()?;
    }
    parser.finish()
}

pub fn map_method_signature(sig: &str, map: impl FnMut(&str) -> String) -> Result<String> {
    let mut parser = SignatureMapper::new(sig, map);
    parser.type_parameters_opt()?;
    parser.expect('(')?;
    while parser.peek() != Some(')') {
        parser.java_type()?;
    }
    parser.expect(')')?;
    if parser.peek() == Some('V') {
        parser.copy_char()?;
    } else {
        parser.java_type()?;
    }
    while parser.peek() == Some('^') {
        parser.copy_char()?;
        parser.reference_type()?;
    }
    parser.finish()
}

pub fn map_field_signature(sig: &str, map: impl FnMut(&str) -> String) -> Result<String> {
    let mut parser = SignatureMapper::new(sig, map);
    parser.reference_type()?;
    parser.finish()
}

struct SignatureMapper<'a, F> {
    input: &'a str,
    pos: usize,
    out: String,
    map: F,
}

impl<'a, F> SignatureMapper<'a, F>
where
    F: FnMut(&str) -> String,
{
    fn new(input: &'a str, map: F) -> Self {
        Self {
            input,
            pos: 0,
            out: String::with_capacity(input.len()),
            map,
        }
    }

    fn error(&self) -> Error {
        Error::BadSignature(self.input.to_string())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn copy_char(&mut self) -> Result<char> {
        let ch = self.peek().ok_or_else(|| self.error())?;
        self.out.push(ch);
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.copy_char()?;
                Ok(())
            }
            _ => Err(self.error()),
        }
    }

    /// Consumes characters up to (not including) any of `stops`.
    fn take_until(&mut self, stops: &[char]) -> Result<&'a str> {
        let input: &'a str = self.input;
        let rest = &input[self.pos..];
        let len = rest.find(|c| stops.contains(&c)).ok_or_else(|| self.error())?;
        if len == 0 {
            return Err(self.error());
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn finish(self) -> Result<String> {
        if !self.at_end() {
            return Err(self.error());
        }
        Ok(self.out)
    }

    fn type_parameters_opt(&mut self) -> Result<()> {
        if self.peek() != Some('<') {
            return Ok(());
        }
        self.copy_char()?;
        loop {
            let ident = self.take_until(&[':'])?;
            self.out.push_str(ident);
            // class bound, which may be empty when only interface bounds follow
            self.expect(':')?;
            if !matches!(self.peek(), Some(':') | Some('>')) {
                self.reference_type()?;
            }
            while self.peek() == Some(':') {
                self.copy_char()?;
                self.reference_type()?;
            }
            if self.peek() == Some('>') {
                self.copy_char()?;
                return Ok(());
            }
        }
    }

    fn java_type(&mut self) -> Result<()> {
        match self.peek() {
            Some('B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z') => {
                self.copy_char()?;
                Ok(())
            }
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<()> {
        match self.peek() {
            Some('L') => self.class_type(),
            Some('T') => {
                self.copy_char()?;
                let ident = self.take_until(&[';'])?;
                self.out.push_str(ident);
                self.expect(';')
            }
            Some('[') => {
                self.copy_char()?;
                self.java_type()
            }
            _ => Err(self.error()),
        }
    }

    fn class_type(&mut self) -> Result<()> {
        self.expect('L')?;
        let mut original = self.take_until(&[';', '<', '.'])?.to_string();
        let mapped = (self.map)(&original);
        self.out.push_str(&mapped);
        self.type_arguments_opt()?;

        while self.peek() == Some('.') {
            self.copy_char()?;
            let simple = self.take_until(&[';', '<', '.'])?;
            let outer_original = std::mem::take(&mut original);
            let outer_mapped = format!("{}$", (self.map)(&outer_original));
            original = format!("{outer_original}${simple}");
            let inner_mapped = (self.map)(&original);
            let start = if inner_mapped.starts_with(&outer_mapped) {
                outer_mapped.len()
            } else {
                inner_mapped.rfind('$').map_or(0, |idx| idx + 1)
            };
            self.out.push_str(&inner_mapped[start..]);
            self.type_arguments_opt()?;
        }
        self.expect(';')
    }

    fn type_arguments_opt(&mut self) -> Result<()> {
        if self.peek() != Some('<') {
            return Ok(());
        }
        self.copy_char()?;
        while self.peek() != Some('>') {
            match self.peek() {
                Some('*') => {
                    self.copy_char()?;
                }
                Some('+' | '-') => {
                    self.copy_char()?;
                    self.reference_type()?;
                }
                Some(_) => self.reference_type()?,
                None => return Err(self.error()),
            }
        }
        self.copy_char()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename(name: &str) -> String {
        match name {
            "a" => "net/Alpha".to_string(),
            "b" => "net/Beta".to_string(),
            "a$c" => "net/Alpha$Inner".to_string(),
            other => other.to_string(),
        }
    }

    #[test]
    fn field_signature_with_type_arguments() {
        assert_eq!(
            map_field_signature("Ljava/util/List<+La;>;", rename).unwrap(),
            "Ljava/util/List<+Lnet/Alpha;>;"
        );
    }

    #[test]
    fn class_signature_with_bounds() {
        assert_eq!(
            map_class_signature("<T:La;U::Lb;>Ljava/lang/Object;Lb;", rename).unwrap(),
            "<T:Lnet/Alpha;U::Lnet/Beta;>Ljava/lang/Object;Lnet/Beta;"
        );
    }

    #[test]
    fn type_variable_named_like_a_class_is_untouched() {
        assert_eq!(
            map_class_signature("<a:Ljava/lang/Object;>Ljava/lang/Object;", rename).unwrap(),
            "<a:Ljava/lang/Object;>Ljava/lang/Object;"
        );
    }

    #[test]
    fn method_signature_with_throws_and_arrays() {
        assert_eq!(
            map_method_signature("<T:Ljava/lang/Object;>([TT;La;)Lb;^La;^TT;", rename).unwrap(),
            "<T:Ljava/lang/Object;>([TT;Lnet/Alpha;)Lnet/Beta;^Lnet/Alpha;^TT;"
        );
    }

    #[test]
    fn inner_class_suffix_uses_binary_name() {
        assert_eq!(
            map_field_signature("La<TT;>.c<*>;", rename).unwrap(),
            "Lnet/Alpha<TT;>.Inner<*>;"
        );
    }

    #[test]
    fn malformed_signature_is_an_error() {
        assert!(matches!(
            map_field_signature("La", rename),
            Err(Error::BadSignature(_))
        ));
    }
}
