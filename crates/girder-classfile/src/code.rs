//! Code-attribute decoding: walks the bytecode of one method body and
//! materializes only the instructions the importer cares about, plus the
//! line-number and exception tables.

use crate::constant_pool::{ConstantPool, CpInfo};
use crate::error::{Error, Result};
use crate::reader::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

impl FieldOp {
    pub fn is_write(self) -> bool {
        matches!(self, FieldOp::PutStatic | FieldOp::PutField)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Bytecode offset of the instruction within the method body.
    pub pc: u16,
    pub kind: InstructionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    FieldAccess {
        op: FieldOp,
        owner: String,
        name: String,
        descriptor: String,
    },
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    /// The bootstrap-method slot is resolved against the class-level
    /// `BootstrapMethods` attribute once the whole file is parsed.
    InvokeDynamic {
        bootstrap_index: u16,
        name: String,
        descriptor: String,
    },
    /// `ldc`/`ldc_w` of a class constant. The name is the constant-pool
    /// class name: an internal name, or an array descriptor for array
    /// literals like `int[].class`.
    ClassConstant { class: String },
    Instanceof { class: String },
    Checkcast { class: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` for catch-all entries (`finally`).
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line: u16,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeInfo {
    pub instructions: Vec<Instruction>,
    pub line_numbers: Vec<LineNumberEntry>,
    pub exception_table: Vec<ExceptionTableEntry>,
}

impl CodeInfo {
    /// Source line active at the given bytecode offset, or 0 when the method
    /// carries no line metadata for it.
    pub fn line_at(&self, pc: u16) -> u16 {
        let mut line = 0;
        for entry in &self.line_numbers {
            if entry.start_pc > pc {
                break;
            }
            line = entry.line;
        }
        line
    }

    /// Line attached exactly at `pc`, if any. Offsets without an entry are
    /// synthetic control-flow labels.
    pub fn line_exactly_at(&self, pc: u16) -> Option<u16> {
        self.line_numbers
            .iter()
            .find(|entry| entry.start_pc == pc)
            .map(|entry| entry.line)
    }
}

pub(crate) fn parse_code_attribute(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<CodeInfo> {
    let _max_stack = reader.read_u2()?;
    let _max_locals = reader.read_u2()?;
    let code_length = reader.read_u4()? as usize;
    let code = reader.read_bytes(code_length)?;

    let instructions = walk_bytecode(code, cp)?;

    let exception_table_length = reader.read_u2()? as usize;
    let mut exception_table = Vec::with_capacity(exception_table_length);
    for _ in 0..exception_table_length {
        let start_pc = reader.read_u2()?;
        let end_pc = reader.read_u2()?;
        let handler_pc = reader.read_u2()?;
        let catch_type_index = reader.read_u2()?;
        let catch_type = if catch_type_index == 0 {
            None
        } else {
            Some(cp.get_class_name(catch_type_index)?)
        };
        exception_table.push(ExceptionTableEntry {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }

    let mut line_numbers = Vec::new();
    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        if cp.get_utf8(name_index)? == "LineNumberTable" {
            let mut sub = Reader::new(info);
            let count = sub.read_u2()? as usize;
            for _ in 0..count {
                let start_pc = sub.read_u2()?;
                let line = sub.read_u2()?;
                line_numbers.push(LineNumberEntry { start_pc, line });
            }
            sub.ensure_empty()?;
        }
    }
    line_numbers.sort_by_key(|entry| entry.start_pc);

    Ok(CodeInfo {
        instructions,
        line_numbers,
        exception_table,
    })
}

fn walk_bytecode(code: &[u8], cp: &ConstantPool) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut offset = 0usize;
    while offset < code.len() {
        let opcode = code[offset];
        let pc = offset as u16;
        match opcode {
            0xb2..=0xb5 => {
                let op = match opcode {
                    0xb2 => FieldOp::GetStatic,
                    0xb3 => FieldOp::PutStatic,
                    0xb4 => FieldOp::GetField,
                    _ => FieldOp::PutField,
                };
                let member = cp.get_member_ref(operand_u16(code, offset)?)?;
                instructions.push(Instruction {
                    pc,
                    kind: InstructionKind::FieldAccess {
                        op,
                        owner: member.owner,
                        name: member.name,
                        descriptor: member.descriptor,
                    },
                });
            }
            0xb6..=0xb9 => {
                let kind = match opcode {
                    0xb6 => InvokeKind::Virtual,
                    0xb7 => InvokeKind::Special,
                    0xb8 => InvokeKind::Static,
                    _ => InvokeKind::Interface,
                };
                let member = cp.get_member_ref(operand_u16(code, offset)?)?;
                instructions.push(Instruction {
                    pc,
                    kind: InstructionKind::Invoke {
                        kind,
                        owner: member.owner,
                        name: member.name,
                        descriptor: member.descriptor,
                    },
                });
            }
            0xba => {
                let (bootstrap_index, name, descriptor) =
                    cp.get_invoke_dynamic(operand_u16(code, offset)?)?;
                instructions.push(Instruction {
                    pc,
                    kind: InstructionKind::InvokeDynamic {
                        bootstrap_index,
                        name: name.to_string(),
                        descriptor: descriptor.to_string(),
                    },
                });
            }
            // ldc / ldc_w: only class constants are of interest.
            0x12 | 0x13 => {
                let index = if opcode == 0x12 {
                    *code.get(offset + 1).ok_or(Error::TruncatedCode)? as u16
                } else {
                    operand_u16(code, offset)?
                };
                if let CpInfo::Class { name_index } = cp.get(index)? {
                    instructions.push(Instruction {
                        pc,
                        kind: InstructionKind::ClassConstant {
                            class: cp.get_utf8(*name_index)?.to_string(),
                        },
                    });
                }
            }
            0xc0 | 0xc1 => {
                let class = cp.get_class_name(operand_u16(code, offset)?)?;
                let kind = if opcode == 0xc0 {
                    InstructionKind::Checkcast { class }
                } else {
                    InstructionKind::Instanceof { class }
                };
                instructions.push(Instruction { pc, kind });
            }
            _ => {}
        }
        offset += opcode_length(code, offset)?;
    }
    Ok(instructions)
}

fn operand_u16(code: &[u8], offset: usize) -> Result<u16> {
    let high = *code.get(offset + 1).ok_or(Error::TruncatedCode)?;
    let low = *code.get(offset + 2).ok_or(Error::TruncatedCode)?;
    Ok(u16::from_be_bytes([high, low]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32> {
    let bytes = code
        .get(offset..offset + 4)
        .ok_or(Error::TruncatedCode)?;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Total encoded length of the instruction at `offset`, including operands.
fn opcode_length(code: &[u8], offset: usize) -> Result<usize> {
    let opcode = code[offset];
    let length = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,          // bipush
        0x11 => 3,          // sipush
        0x12 => 2,          // ldc
        0x13 | 0x14 => 3,   // ldc_w, ldc2_w
        0x15..=0x19 => 2,   // *load with index
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,   // *store with index
        0x3b..=0x83 => 1,
        0x84 => 3,          // iinc
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,   // branches, goto, jsr
        0xa9 => 2,          // ret
        0xaa => tableswitch_length(code, offset)?,
        0xab => lookupswitch_length(code, offset)?,
        0xac..=0xb1 => 1,
        0xb2..=0xb8 => 3,
        0xb9 | 0xba => 5,   // invokeinterface, invokedynamic
        0xbb => 3,          // new
        0xbc => 2,          // newarray
        0xbd => 3,          // anewarray
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        0xc4 => wide_length(code, offset)?,
        0xc5 => 4,          // multianewarray
        0xc6 | 0xc7 => 3,   // ifnull, ifnonnull
        0xc8 | 0xc9 => 5,   // goto_w, jsr_w
        other => return Err(Error::UnknownOpcode(other)),
    };
    if offset + length > code.len() {
        return Err(Error::TruncatedCode);
    }
    Ok(length)
}

fn switch_padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

fn tableswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let base = offset + 1 + switch_padding(offset);
    let low = read_i32(code, base + 4)?;
    let high = read_i32(code, base + 8)?;
    let count = high
        .checked_sub(low)
        .and_then(|v| v.checked_add(1))
        .filter(|v| *v >= 0)
        .ok_or(Error::TruncatedCode)?;
    Ok(1 + switch_padding(offset) + 12 + count as usize * 4)
}

fn lookupswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let base = offset + 1 + switch_padding(offset);
    let npairs = read_i32(code, base + 4)?;
    if npairs < 0 {
        return Err(Error::TruncatedCode);
    }
    Ok(1 + switch_padding(offset) + 8 + npairs as usize * 8)
}

fn wide_length(code: &[u8], offset: usize) -> Result<usize> {
    let modified = *code.get(offset + 1).ok_or(Error::TruncatedCode)?;
    // wide iinc carries two 16-bit operands.
    Ok(if modified == 0x84 { 6 } else { 4 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup_uses_last_entry_at_or_before_pc() {
        let code = CodeInfo {
            instructions: Vec::new(),
            line_numbers: vec![
                LineNumberEntry { start_pc: 0, line: 10 },
                LineNumberEntry { start_pc: 4, line: 12 },
            ],
            exception_table: Vec::new(),
        };
        assert_eq!(code.line_at(0), 10);
        assert_eq!(code.line_at(3), 10);
        assert_eq!(code.line_at(4), 12);
        assert_eq!(code.line_at(100), 12);
        assert_eq!(code.line_exactly_at(4), Some(12));
        assert_eq!(code.line_exactly_at(3), None);
    }

    #[test]
    fn switch_lengths_account_for_padding() {
        // tableswitch at offset 0: 3 bytes padding, default, low=0, high=1, 2 offsets.
        let mut code = vec![0xaa, 0, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        code.extend_from_slice(&[0u8; 8]);
        assert_eq!(opcode_length(&code, 0).unwrap(), code.len());
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(matches!(
            opcode_length(&[0xcb], 0),
            Err(Error::UnknownOpcode(0xcb))
        ));
    }
}
