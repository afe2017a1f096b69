use crate::constant_pool::{ConstantPool, CpInfo};
use crate::error::{Error, Result};
use crate::reader::Reader;

/// One `annotation` structure from a Runtime(In)VisibleAnnotations attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Lcom/example/Marker;`.
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub(crate) fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let type_index = reader.read_u2()?;
        let type_descriptor = cp.get_utf8(type_index)?.to_string();

        let num_pairs = reader.read_u2()? as usize;
        let mut elements = Vec::with_capacity(num_pairs);
        for _ in 0..num_pairs {
            let name_index = reader.read_u2()?;
            let name = cp.get_utf8(name_index)?.to_string();
            let value = ElementValue::parse(reader, cp)?;
            elements.push((name, value));
        }

        Ok(Self {
            type_descriptor,
            elements,
        })
    }

    /// Internal name of the annotation type, if the descriptor is an object
    /// descriptor (always the case for well-formed class files).
    pub fn type_internal_name(&self) -> Option<&str> {
        self.type_descriptor
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(ConstValue),
    Enum {
        /// Field descriptor of the enum type.
        type_descriptor: String,
        const_name: String,
    },
    /// Field descriptor of the referenced class, or `V` for `void.class`.
    Class(String),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    pub(crate) fn parse(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Self> {
        let tag = reader.read_u1()?;
        match tag {
            b'B' | b'C' | b'I' | b'S' | b'Z' => {
                let value = int_constant(cp, reader.read_u2()?)?;
                let cv = match tag {
                    b'B' => ConstValue::Byte(value as i8),
                    b'C' => ConstValue::Char(
                        char::from_u32(value as u32)
                            .ok_or(Error::MalformedAttribute("annotation element value"))?,
                    ),
                    b'I' => ConstValue::Int(value),
                    b'S' => ConstValue::Short(value as i16),
                    b'Z' => ConstValue::Boolean(value != 0),
                    _ => unreachable!(),
                };
                Ok(ElementValue::Const(cv))
            }
            b'D' => match cp.get(reader.read_u2()?)? {
                CpInfo::Double(v) => Ok(ElementValue::Const(ConstValue::Double(*v))),
                _ => Err(Error::MalformedAttribute("annotation element value")),
            },
            b'F' => match cp.get(reader.read_u2()?)? {
                CpInfo::Float(v) => Ok(ElementValue::Const(ConstValue::Float(*v))),
                _ => Err(Error::MalformedAttribute("annotation element value")),
            },
            b'J' => match cp.get(reader.read_u2()?)? {
                CpInfo::Long(v) => Ok(ElementValue::Const(ConstValue::Long(*v))),
                _ => Err(Error::MalformedAttribute("annotation element value")),
            },
            b's' => {
                let index = reader.read_u2()?;
                Ok(ElementValue::Const(ConstValue::String(
                    cp.get_utf8(index)?.to_string(),
                )))
            }
            b'e' => {
                let type_index = reader.read_u2()?;
                let name_index = reader.read_u2()?;
                Ok(ElementValue::Enum {
                    type_descriptor: cp.get_utf8(type_index)?.to_string(),
                    const_name: cp.get_utf8(name_index)?.to_string(),
                })
            }
            b'c' => {
                let index = reader.read_u2()?;
                Ok(ElementValue::Class(cp.get_utf8(index)?.to_string()))
            }
            b'@' => Ok(ElementValue::Annotation(Box::new(Annotation::parse(
                reader, cp,
            )?))),
            b'[' => {
                let count = reader.read_u2()? as usize;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(ElementValue::parse(reader, cp)?);
                }
                Ok(ElementValue::Array(values))
            }
            _ => Err(Error::MalformedAttribute("annotation element value")),
        }
    }
}

fn int_constant(cp: &ConstantPool, index: u16) -> Result<i32> {
    match cp.get(index)? {
        CpInfo::Integer(v) => Ok(*v),
        other => Err(Error::ConstantPoolTypeMismatch {
            index,
            expected: "Integer",
            found: other.kind(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
}
