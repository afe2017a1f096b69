use crate::error::{Error, Result};
use crate::reader::Reader;

/// One parsed `cp_info` entry.
///
/// Long and Double occupy two slots; the second slot is `Unusable`.
#[derive(Debug, Clone, PartialEq)]
pub enum CpInfo {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    Unusable,
}

impl CpInfo {
    pub fn kind(&self) -> &'static str {
        match self {
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer(_) => "Integer",
            CpInfo::Float(_) => "Float",
            CpInfo::Long(_) => "Long",
            CpInfo::Double(_) => "Double",
            CpInfo::Class { .. } => "Class",
            CpInfo::String { .. } => "String",
            CpInfo::FieldRef { .. } => "FieldRef",
            CpInfo::MethodRef { .. } => "MethodRef",
            CpInfo::InterfaceMethodRef { .. } => "InterfaceMethodRef",
            CpInfo::NameAndType { .. } => "NameAndType",
            CpInfo::MethodHandle { .. } => "MethodHandle",
            CpInfo::MethodType { .. } => "MethodType",
            CpInfo::Dynamic { .. } => "Dynamic",
            CpInfo::InvokeDynamic { .. } => "InvokeDynamic",
            CpInfo::Module { .. } => "Module",
            CpInfo::Package { .. } => "Package",
            CpInfo::Unusable => "Unusable",
        }
    }
}

/// A member reference resolved out of the pool: owner internal name plus the
/// referenced name-and-type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRefInfo {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// A `CONSTANT_MethodHandle` resolved to its referenced member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

pub mod handle_kind {
    pub const GET_FIELD: u8 = 1;
    pub const GET_STATIC: u8 = 2;
    pub const PUT_FIELD: u8 = 3;
    pub const PUT_STATIC: u8 = 4;
    pub const INVOKE_VIRTUAL: u8 = 5;
    pub const INVOKE_STATIC: u8 = 6;
    pub const INVOKE_SPECIAL: u8 = 7;
    pub const NEW_INVOKE_SPECIAL: u8 = 8;
    pub const INVOKE_INTERFACE: u8 = 9;
}

#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<CpInfo>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        // Index 0 is unusable by definition.
        entries.push(CpInfo::Unusable);

        while entries.len() < count {
            let tag = reader.read_u1()?;
            let info = match tag {
                1 => {
                    let len = reader.read_u2()? as usize;
                    let bytes = reader.read_bytes(len)?;
                    CpInfo::Utf8(decode_modified_utf8(bytes)?)
                }
                3 => CpInfo::Integer(reader.read_u4()? as i32),
                4 => CpInfo::Float(f32::from_bits(reader.read_u4()?)),
                5 => {
                    let high = reader.read_u4()? as u64;
                    let low = reader.read_u4()? as u64;
                    CpInfo::Long(((high << 32) | low) as i64)
                }
                6 => {
                    let high = reader.read_u4()? as u64;
                    let low = reader.read_u4()? as u64;
                    CpInfo::Double(f64::from_bits((high << 32) | low))
                }
                7 => CpInfo::Class { name_index: reader.read_u2()? },
                8 => CpInfo::String { string_index: reader.read_u2()? },
                9 => CpInfo::FieldRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                10 => CpInfo::MethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                11 => CpInfo::InterfaceMethodRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                12 => CpInfo::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                15 => CpInfo::MethodHandle {
                    reference_kind: reader.read_u1()?,
                    reference_index: reader.read_u2()?,
                },
                16 => CpInfo::MethodType { descriptor_index: reader.read_u2()? },
                17 => CpInfo::Dynamic {
                    bootstrap_method_attr_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                18 => CpInfo::InvokeDynamic {
                    bootstrap_method_attr_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                19 => CpInfo::Module { name_index: reader.read_u2()? },
                20 => CpInfo::Package { name_index: reader.read_u2()? },
                other => return Err(Error::InvalidConstantPoolTag(other)),
            };

            let takes_two_slots = matches!(info, CpInfo::Long(_) | CpInfo::Double(_));
            entries.push(info);
            if takes_two_slots {
                entries.push(CpInfo::Unusable);
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        match self.entries.get(index as usize) {
            Some(CpInfo::Unusable) | None => Err(Error::InvalidConstantPoolIndex(index)),
            Some(info) => Ok(info),
        }
    }

    pub fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            CpInfo::Utf8(s) => Ok(s),
            other => Err(Error::ConstantPoolTypeMismatch {
                index,
                expected: "Utf8",
                found: other.kind(),
            }),
        }
    }

    /// Internal name of a `CONSTANT_Class` entry, e.g. `java/lang/String` or
    /// `[Ljava/lang/String;` for array classes.
    pub fn get_class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Class { name_index } => Ok(self.get_utf8(*name_index)?.to_string()),
            other => Err(Error::ConstantPoolTypeMismatch {
                index,
                expected: "Class",
                found: other.kind(),
            }),
        }
    }

    pub fn get_string_constant(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::String { string_index } => Ok(self.get_utf8(*string_index)?.to_string()),
            other => Err(Error::ConstantPoolTypeMismatch {
                index,
                expected: "String",
                found: other.kind(),
            }),
        }
    }

    pub fn get_name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            CpInfo::NameAndType { name_index, descriptor_index } => {
                Ok((self.get_utf8(*name_index)?, self.get_utf8(*descriptor_index)?))
            }
            other => Err(Error::ConstantPoolTypeMismatch {
                index,
                expected: "NameAndType",
                found: other.kind(),
            }),
        }
    }

    /// Resolve a FieldRef, MethodRef or InterfaceMethodRef entry.
    pub fn get_member_ref(&self, index: u16) -> Result<MemberRefInfo> {
        let (class_index, name_and_type_index) = match self.get(index)? {
            CpInfo::FieldRef { class_index, name_and_type_index }
            | CpInfo::MethodRef { class_index, name_and_type_index }
            | CpInfo::InterfaceMethodRef { class_index, name_and_type_index } => {
                (*class_index, *name_and_type_index)
            }
            other => {
                return Err(Error::ConstantPoolTypeMismatch {
                    index,
                    expected: "FieldRef/MethodRef/InterfaceMethodRef",
                    found: other.kind(),
                })
            }
        };
        let owner = self.get_class_name(class_index)?;
        let (name, descriptor) = self.get_name_and_type(name_and_type_index)?;
        Ok(MemberRefInfo {
            owner,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    pub fn get_method_handle(&self, index: u16) -> Result<MethodHandleInfo> {
        match self.get(index)? {
            CpInfo::MethodHandle { reference_kind, reference_index } => {
                let member = self.get_member_ref(*reference_index)?;
                Ok(MethodHandleInfo {
                    reference_kind: *reference_kind,
                    owner: member.owner,
                    name: member.name,
                    descriptor: member.descriptor,
                })
            }
            other => Err(Error::ConstantPoolTypeMismatch {
                index,
                expected: "MethodHandle",
                found: other.kind(),
            }),
        }
    }

    /// Resolve an InvokeDynamic entry to its bootstrap-method slot and
    /// call-site name-and-type.
    pub fn get_invoke_dynamic(&self, index: u16) -> Result<(u16, &str, &str)> {
        match self.get(index)? {
            CpInfo::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } => {
                let (name, descriptor) = self.get_name_and_type(*name_and_type_index)?;
                Ok((*bootstrap_method_attr_index, name, descriptor))
            }
            other => Err(Error::ConstantPoolTypeMismatch {
                index,
                expected: "InvokeDynamic",
                found: other.kind(),
            }),
        }
    }
}

/// Decode the JVM's modified UTF-8: no NUL byte, no 4-byte sequences, and
/// supplementary characters encoded as surrogate pairs of 3-byte sequences.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let a = bytes[i];
        if a & 0x80 == 0 {
            if a == 0 {
                return Err(Error::InvalidModifiedUtf8);
            }
            out.push(a as char);
            i += 1;
        } else if a & 0xE0 == 0xC0 {
            let b = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)?;
            if b & 0xC0 != 0x80 {
                return Err(Error::InvalidModifiedUtf8);
            }
            let code = ((a as u32 & 0x1F) << 6) | (b as u32 & 0x3F);
            out.push(char::from_u32(code).ok_or(Error::InvalidModifiedUtf8)?);
            i += 2;
        } else if a & 0xF0 == 0xE0 {
            let b = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)?;
            let c = *bytes.get(i + 2).ok_or(Error::InvalidModifiedUtf8)?;
            if b & 0xC0 != 0x80 || c & 0xC0 != 0x80 {
                return Err(Error::InvalidModifiedUtf8);
            }
            let code = ((a as u32 & 0x0F) << 12) | ((b as u32 & 0x3F) << 6) | (c as u32 & 0x3F);
            if (0xD800..=0xDBFF).contains(&code) {
                // High surrogate; the pair must follow as another 3-byte sequence.
                let (low, advance) = decode_low_surrogate(&bytes[i + 3..])?;
                let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                out.push(char::from_u32(combined).ok_or(Error::InvalidModifiedUtf8)?);
                i += 3 + advance;
            } else {
                out.push(char::from_u32(code).ok_or(Error::InvalidModifiedUtf8)?);
                i += 3;
            }
        } else {
            return Err(Error::InvalidModifiedUtf8);
        }
    }
    Ok(out)
}

fn decode_low_surrogate(bytes: &[u8]) -> Result<(u32, usize)> {
    if bytes.len() < 3 {
        return Err(Error::InvalidModifiedUtf8);
    }
    let (a, b, c) = (bytes[0], bytes[1], bytes[2]);
    if a & 0xF0 != 0xE0 || b & 0xC0 != 0x80 || c & 0xC0 != 0x80 {
        return Err(Error::InvalidModifiedUtf8);
    }
    let code = ((a as u32 & 0x0F) << 12) | ((b as u32 & 0x3F) << 6) | (c as u32 & 0x3F);
    if !(0xDC00..=0xDFFF).contains(&code) {
        return Err(Error::InvalidModifiedUtf8);
    }
    Ok((code, 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_from(entries: Vec<CpInfo>) -> ConstantPool {
        let mut all = vec![CpInfo::Unusable];
        all.extend(entries);
        ConstantPool { entries: all }
    }

    #[test]
    fn member_ref_resolves_through_class_and_name_and_type() {
        let pool = pool_from(vec![
            CpInfo::Utf8("java/lang/String".to_string()),
            CpInfo::Class { name_index: 1 },
            CpInfo::Utf8("length".to_string()),
            CpInfo::Utf8("()I".to_string()),
            CpInfo::NameAndType { name_index: 3, descriptor_index: 4 },
            CpInfo::MethodRef { class_index: 2, name_and_type_index: 5 },
        ]);

        let member = pool.get_member_ref(6).unwrap();
        assert_eq!(member.owner, "java/lang/String");
        assert_eq!(member.name, "length");
        assert_eq!(member.descriptor, "()I");
    }

    #[test]
    fn modified_utf8_rejects_nul_and_decodes_two_byte_nul_encoding() {
        assert!(decode_modified_utf8(&[0x00]).is_err());
        assert_eq!(decode_modified_utf8(&[0xC0, 0x80]).unwrap(), "\0");
        assert_eq!(decode_modified_utf8(b"plain").unwrap(), "plain");
    }

    #[test]
    fn long_entries_occupy_two_slots() {
        let mut bytes = vec![0x00, 0x04]; // count = 4 -> 3 usable slots
        bytes.push(5); // Long tag
        bytes.extend_from_slice(&0x0000_0001_0000_0002u64.to_be_bytes());
        bytes.push(3); // Integer tag
        bytes.extend_from_slice(&7i32.to_be_bytes());

        let mut reader = Reader::new(&bytes);
        let pool = ConstantPool::parse(&mut reader).unwrap();
        assert_eq!(pool.get(1).unwrap(), &CpInfo::Long(0x0000_0001_0000_0002));
        assert!(pool.get(2).is_err());
        assert_eq!(pool.get(3).unwrap(), &CpInfo::Integer(7));
    }
}
