use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            b'B' => BaseType::Byte,
            b'C' => BaseType::Char,
            b'D' => BaseType::Double,
            b'F' => BaseType::Float,
            b'I' => BaseType::Int,
            b'J' => BaseType::Long,
            b'S' => BaseType::Short,
            b'Z' => BaseType::Boolean,
            _ => return None,
        })
    }

    /// Java source keyword, e.g. `int`.
    pub fn keyword(self) -> &'static str {
        match self {
            BaseType::Byte => "byte",
            BaseType::Char => "char",
            BaseType::Double => "double",
            BaseType::Float => "float",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Short => "short",
            BaseType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Base(BaseType),
    /// Internal name, e.g. `java/lang/String`.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Array element type after stripping all dimensions, with the number of
    /// dimensions stripped.
    pub fn element_type(&self) -> (&FieldType, usize) {
        let mut current = self;
        let mut dimensions = 0;
        while let FieldType::Array(component) = current {
            current = component;
            dimensions += 1;
        }
        (current, dimensions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType> {
    let mut cursor = Cursor::new(desc);
    let ty = cursor.field_type()?;
    cursor.expect_end()?;
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let mut cursor = Cursor::new(desc);
    cursor.expect(b'(')?;
    let mut params = Vec::new();
    while !cursor.eat(b')') {
        params.push(cursor.field_type()?);
    }
    let return_type = if cursor.eat(b'V') {
        ReturnType::Void
    } else {
        ReturnType::Type(cursor.field_type()?)
    };
    cursor.expect_end()?;
    Ok(MethodDescriptor { params, return_type })
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
        Error::InvalidDescriptor(self.input.to_string())
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
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(self.err())
        }
    }

    fn field_type(&mut self) -> Result<FieldType> {
        let tag = self.peek().ok_or_else(|| self.err())?;
        if let Some(base) = BaseType::from_tag(tag) {
            self.pos += 1;
            return Ok(FieldType::Base(base));
        }
        match tag {
            b'L' => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some_and(|b| b != b';') {
                    self.pos += 1;
                }
                let name = &self.input[start..self.pos];
                self.expect(b';')?;
                if name.is_empty() {
                    return Err(self.err());
                }
                Ok(FieldType::Object(name.to_string()))
            }
            b'[' => {
                self.pos += 1;
                let component = self.field_type()?;
                Ok(FieldType::Array(Box::new(component)))
            }
            _ => Err(self.err()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_descriptor_primitives_and_arrays() {
        assert_eq!(parse_field_descriptor("J").unwrap(), FieldType::Base(BaseType::Long));
        assert_eq!(
            parse_field_descriptor("[[Ljava/lang/String;").unwrap(),
            FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Object(
                "java/lang/String".to_string()
            )))))
        );
        assert!(parse_field_descriptor("L;").is_err());
        assert!(parse_field_descriptor("II").is_err());
    }

    #[test]
    fn method_descriptor_roundtrip_parts() {
        let desc = parse_method_descriptor("(ILjava/lang/String;[D)V").unwrap();
        assert_eq!(desc.params.len(), 3);
        assert_eq!(desc.return_type, ReturnType::Void);

        let desc = parse_method_descriptor("()[Ljava/lang/Object;").unwrap();
        assert!(desc.params.is_empty());
        assert_eq!(
            desc.return_type,
            ReturnType::Type(FieldType::Array(Box::new(FieldType::Object(
                "java/lang/Object".to_string()
            ))))
        );
    }

    #[test]
    fn element_type_strips_dimensions() {
        let ty = parse_field_descriptor("[[I").unwrap();
        let (element, dims) = ty.element_type();
        assert_eq!(element, &FieldType::Base(BaseType::Int));
        assert_eq!(dims, 2);
    }
}
