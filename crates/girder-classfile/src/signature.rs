//! Parsers for the three generic-signature grammars of JVMS §4.7.9.1.
//!
//! Signatures are parsed into syntax trees only; turning a tree into a
//! concrete type requires the full class universe and happens in a later
//! import phase.

use crate::descriptor::BaseType;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub super_class: ClassTypeSignature,
    pub interfaces: Vec<ClassTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<FieldTypeSignature>,
    pub interface_bounds: Vec<FieldTypeSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTypeSignature {
    Class(ClassTypeSignature),
    Array(Box<TypeSignature>),
    TypeVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    Base(BaseType),
    Field(FieldTypeSignature),
}

/// `Lfoo/Bar<...>.Inner<...>;`: the outer class plus inner-class suffixes,
/// each with its own type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeSignature {
    /// Internal name of the outermost class, e.g. `java/util/Map`.
    pub base_name: String,
    pub type_arguments: Vec<TypeArgument>,
    /// Inner-class qualifications: simple name plus type arguments each.
    pub suffixes: Vec<(String, Vec<TypeArgument>)>,
}

impl ClassTypeSignature {
    /// The erased internal name, with inner-class suffixes joined by `$`.
    pub fn erased_internal_name(&self) -> String {
        let mut name = self.base_name.clone();
        for (simple, _) in &self.suffixes {
            name.push('$');
            name.push_str(simple);
        }
        name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgument {
    /// `*`
    Unbounded,
    /// `+X`
    Extends(FieldTypeSignature),
    /// `-X`
    Super(FieldTypeSignature),
    /// `X`
    Exact(FieldTypeSignature),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<TypeSignature>,
    /// `None` for `void`.
    pub return_type: Option<TypeSignature>,
    pub throws: Vec<FieldTypeSignature>,
}

pub fn parse_class_signature(sig: &str) -> Result<ClassSignature> {
    let mut cursor = Cursor::new(sig);
    let type_parameters = cursor.type_parameters_opt()?;
    let super_class = cursor.class_type_signature()?;
    let mut interfaces = Vec::new();
    while !cursor.at_end() {
        interfaces.push(cursor.class_type_signature()?);
    }
    Ok(ClassSignature {
        type_parameters,
        super_class,
        interfaces,
    })
}

pub fn parse_field_signature(sig: &str) -> Result<FieldTypeSignature> {
    let mut cursor = Cursor::new(sig);
    let parsed = cursor.field_type_signature()?;
    cursor.expect_end()?;
    Ok(parsed)
}

pub fn parse_method_signature(sig: &str) -> Result<MethodSignature> {
    let mut cursor = Cursor::new(sig);
    let type_parameters = cursor.type_parameters_opt()?;
    cursor.expect(b'(')?;
    let mut parameters = Vec::new();
    while !cursor.eat(b')') {
        parameters.push(cursor.type_signature()?);
    }
    let return_type = if cursor.eat(b'V') {
        None
    } else {
        Some(cursor.type_signature()?)
    };
    let mut throws = Vec::new();
    while cursor.eat(b'^') {
        throws.push(match cursor.peek() {
            Some(b'T') => cursor.type_variable()?,
            _ => FieldTypeSignature::Class(cursor.class_type_signature()?),
        });
    }
    cursor.expect_end()?;
    Ok(MethodSignature {
        type_parameters,
        parameters,
        return_type,
        throws,
    })
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn err(&self) -> Error {
        Error::InvalidSignature(self.input.to_string())
    }

    fn at_end(&self) -> bool {
        self.pos == self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.err())
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.err())
        }
    }

    /// Identifier up to one of the signature delimiters.
    fn identifier(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.err());
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn type_parameters_opt(&mut self) -> Result<Vec<TypeParameter>> {
        if !self.eat(b'<') {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        while !self.eat(b'>') {
            let name = self.identifier()?;
            self.expect(b':')?;
            // The class bound may be empty (interface-only bounds).
            let class_bound = match self.peek() {
                Some(b':') | Some(b'>') | None => None,
                _ => Some(self.field_type_signature()?),
            };
            let mut interface_bounds = Vec::new();
            while self.eat(b':') {
                interface_bounds.push(self.field_type_signature()?);
            }
            params.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
        }
        if params.is_empty() {
            return Err(self.err());
        }
        Ok(params)
    }

    fn type_signature(&mut self) -> Result<TypeSignature> {
        if let Some(base) = self.peek().and_then(BaseType::from_tag) {
            // `L` and `T` are not base-type tags, so any hit here is a primitive.
            self.pos += 1;
            return Ok(TypeSignature::Base(base));
        }
        Ok(TypeSignature::Field(self.field_type_signature()?))
    }

    fn field_type_signature(&mut self) -> Result<FieldTypeSignature> {
        match self.peek().ok_or_else(|| self.err())? {
            b'L' => Ok(FieldTypeSignature::Class(self.class_type_signature()?)),
            b'[' => {
                self.pos += 1;
                Ok(FieldTypeSignature::Array(Box::new(self.type_signature()?)))
            }
            b'T' => self.type_variable(),
            _ => Err(self.err()),
        }
    }

    fn type_variable(&mut self) -> Result<FieldTypeSignature> {
        self.expect(b'T')?;
        let name = self.identifier()?;
        self.expect(b';')?;
        Ok(FieldTypeSignature::TypeVariable(name))
    }

    fn class_type_signature(&mut self) -> Result<ClassTypeSignature> {
        self.expect(b'L')?;
        let mut base_name = self.identifier()?;
        while self.eat(b'/') {
            base_name.push('/');
            base_name.push_str(&self.identifier()?);
        }
        let type_arguments = self.type_arguments_opt()?;
        let mut suffixes = Vec::new();
        while self.eat(b'.') {
            let simple = self.identifier()?;
            let args = self.type_arguments_opt()?;
            suffixes.push((simple, args));
        }
        self.expect(b';')?;
        Ok(ClassTypeSignature {
            base_name,
            type_arguments,
            suffixes,
        })
    }

    fn type_arguments_opt(&mut self) -> Result<Vec<TypeArgument>> {
        if !self.eat(b'<') {
            return Ok(Vec::new());
        }
        let mut args = Vec::new();
        while !self.eat(b'>') {
            let arg = match self.peek().ok_or_else(|| self.err())? {
                b'*' => {
                    self.pos += 1;
                    TypeArgument::Unbounded
                }
                b'+' => {
                    self.pos += 1;
                    TypeArgument::Extends(self.field_type_signature()?)
                }
                b'-' => {
                    self.pos += 1;
                    TypeArgument::Super(self.field_type_signature()?)
                }
                _ => TypeArgument::Exact(self.field_type_signature()?),
            };
            args.push(arg);
        }
        if args.is_empty() {
            return Err(self.err());
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_signature_with_self_referential_bound() {
        let sig = parse_class_signature(
            "<T:Ljava/lang/Object;:Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;",
        )
        .unwrap();
        assert_eq!(sig.type_parameters.len(), 1);
        let param = &sig.type_parameters[0];
        assert_eq!(param.name, "T");
        assert!(param.class_bound.is_some());
        assert_eq!(param.interface_bounds.len(), 1);
        assert_eq!(sig.super_class.base_name, "java/lang/Object");
    }

    #[test]
    fn interface_only_bound_leaves_class_bound_empty() {
        let sig = parse_class_signature("<T::Ljava/io/Serializable;>Ljava/lang/Object;").unwrap();
        let param = &sig.type_parameters[0];
        assert!(param.class_bound.is_none());
        assert_eq!(param.interface_bounds.len(), 1);
    }

    #[test]
    fn field_signature_wildcards() {
        let sig = parse_field_signature("Ljava/util/List<*>;").unwrap();
        let FieldTypeSignature::Class(class) = sig else {
            panic!("expected class type signature");
        };
        assert_eq!(class.type_arguments, vec![TypeArgument::Unbounded]);

        let sig = parse_field_signature("Ljava/util/List<+Ljava/lang/Number;>;").unwrap();
        let FieldTypeSignature::Class(class) = sig else {
            panic!("expected class type signature");
        };
        assert!(matches!(class.type_arguments[0], TypeArgument::Extends(_)));
    }

    #[test]
    fn inner_class_suffixes_erase_with_dollar() {
        let sig = parse_field_signature("Ljava/util/Map<TK;TV;>.Entry<TK;TV;>;").unwrap();
        let FieldTypeSignature::Class(class) = sig else {
            panic!("expected class type signature");
        };
        assert_eq!(class.erased_internal_name(), "java/util/Map$Entry");
        assert_eq!(class.suffixes.len(), 1);
    }

    #[test]
    fn method_signature_with_throws() {
        let sig = parse_method_signature("<X:Ljava/lang/Object;>(TX;[I)TX;^Ljava/io/IOException;")
            .unwrap();
        assert_eq!(sig.type_parameters.len(), 1);
        assert_eq!(sig.parameters.len(), 2);
        assert!(sig.return_type.is_some());
        assert_eq!(sig.throws.len(), 1);
    }

    #[test]
    fn void_return_is_none() {
        let sig = parse_method_signature("(Ljava/util/List<Ljava/lang/String;>;)V").unwrap();
        assert!(sig.return_type.is_none());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_field_signature("Ljava/util/List<*>;X").is_err());
        assert!(parse_method_signature("()Vx").is_err());
    }
}
