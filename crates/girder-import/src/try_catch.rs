//! Correlates exception-table triples into structured try/catch regions
//! and associates the dependency records that occur textually inside each
//! region.
//!
//! Per method body: a (start, end) pair from the exception table is a
//! *pending* block; when its start offset carries a line number the block
//! becomes *active*, and reaching the end offset finishes it. Start
//! offsets without a line entry are synthetic control edges; blocks keyed
//! to them are discarded. A region sharing its start with a known handler
//! offset is the compiler's duplicated `finally` body and is not recorded
//! twice.

use std::collections::{BTreeMap, BTreeSet};

use girder_classfile::CodeInfo;
use girder_graph::TypeRef;

use crate::raw::{RawAccessRecord, RawCodeUnit, RawTryCatch};

pub(crate) fn correlate_try_catches(
    origin: &RawCodeUnit,
    code: &CodeInfo,
    records: &[(u16, RawAccessRecord)],
) -> Vec<RawTryCatch> {
    if code.exception_table.is_empty() {
        return Vec::new();
    }

    let handler_offsets: BTreeSet<u16> = code
        .exception_table
        .iter()
        .map(|entry| entry.handler_pc)
        .collect();

    // Merge multi-catch entries: one block per (start, end) range with all
    // caught types collected.
    let mut pending: BTreeMap<(u16, u16), Vec<TypeRef>> = BTreeMap::new();
    for entry in &code.exception_table {
        if handler_offsets.contains(&entry.start_pc) {
            // Duplicated finally body starting at a handler offset.
            continue;
        }
        let caught = pending.entry((entry.start_pc, entry.end_pc)).or_default();
        if let Some(catch_type) = &entry.catch_type {
            let type_ref = TypeRef::from_class_entry(catch_type);
            if !caught.contains(&type_ref) {
                caught.push(type_ref);
            }
        }
    }

    let mut labels: BTreeSet<u16> = BTreeSet::new();
    for (start, end) in pending.keys() {
        labels.insert(*start);
        labels.insert(*end);
    }

    let mut active: Vec<((u16, u16), Vec<TypeRef>, u16)> = Vec::new();
    let mut finished = Vec::new();

    for label in labels {
        // A block ending where another starts must finish first.
        let mut index = 0;
        while index < active.len() {
            if active[index].0 .1 == label {
                let ((start, end), caught, line) = active.remove(index);
                finished.push(RawTryCatch {
                    origin: origin.clone(),
                    caught_types: caught,
                    line_number: line,
                    records: contained_records(records, start, end),
                });
            } else {
                index += 1;
            }
        }

        let starting: Vec<(u16, u16)> = pending
            .keys()
            .filter(|(start, _)| *start == label)
            .copied()
            .collect();
        for key in starting {
            let caught = pending.remove(&key).unwrap_or_default();
            match code.line_exactly_at(label) {
                Some(line) => active.push((key, caught, line)),
                None => {
                    tracing::trace!(
                        origin = %origin.owner,
                        start = key.0,
                        "discarding try block keyed to a synthetic label"
                    );
                }
            }
        }
    }

    if !pending.is_empty() || !active.is_empty() {
        tracing::warn!(
            origin = %origin.owner,
            unit = %origin.name,
            pending = pending.len(),
            active = active.len(),
            "discarding unfinished try/catch blocks at end of method"
        );
    }

    finished
}

fn contained_records(
    records: &[(u16, RawAccessRecord)],
    start: u16,
    end: u16,
) -> Vec<RawAccessRecord> {
    records
        .iter()
        .filter(|(pc, _)| *pc >= start && *pc < end)
        .map(|(_, record)| record.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use girder_classfile::{ExceptionTableEntry, LineNumberEntry};
    use girder_graph::TypeRef;

    use super::*;
    use crate::raw::{RawAccessKind, RawTarget};

    fn origin() -> RawCodeUnit {
        RawCodeUnit::new("com.example.A", "run", "()V")
    }

    fn code(
        exception_table: Vec<ExceptionTableEntry>,
        line_numbers: Vec<LineNumberEntry>,
    ) -> CodeInfo {
        CodeInfo {
            instructions: Vec::new(),
            line_numbers,
            exception_table,
        }
    }

    fn record_at(pc: u16) -> (u16, RawAccessRecord) {
        (
            pc,
            RawAccessRecord {
                origin: origin(),
                kind: RawAccessKind::FieldWrite,
                target: RawTarget {
                    owner: TypeRef::object("com.example.B"),
                    name: "state".to_string(),
                    descriptor: "I".to_string(),
                },
                line_number: 5,
                declared_in_lambda: false,
            },
        )
    }

    #[test]
    fn block_with_line_number_collects_contained_records() {
        let code = code(
            vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 8,
                handler_pc: 11,
                catch_type: Some("java/lang/Exception".to_string()),
            }],
            vec![
                LineNumberEntry { start_pc: 0, line: 4 },
                LineNumberEntry { start_pc: 8, line: 6 },
            ],
        );
        let records = vec![record_at(3), record_at(9)];
        let blocks = correlate_try_catches(&origin(), &code, &records);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].line_number, 4);
        assert_eq!(blocks[0].records.len(), 1);
        assert_eq!(
            blocks[0].caught_types,
            vec![TypeRef::object("java.lang.Exception")]
        );
    }

    #[test]
    fn block_keyed_to_lineless_label_is_discarded() {
        let code = code(
            vec![ExceptionTableEntry {
                start_pc: 0,
                end_pc: 8,
                handler_pc: 11,
                catch_type: None,
            }],
            Vec::new(),
        );
        let blocks = correlate_try_catches(&origin(), &code, &[]);
        assert!(blocks.is_empty());
    }

    #[test]
    fn finally_duplicate_sharing_handler_start_is_skipped() {
        let code = code(
            vec![
                ExceptionTableEntry {
                    start_pc: 0,
                    end_pc: 8,
                    handler_pc: 11,
                    catch_type: None,
                },
                // Duplicated finally body: starts exactly at the handler.
                ExceptionTableEntry {
                    start_pc: 11,
                    end_pc: 14,
                    handler_pc: 11,
                    catch_type: None,
                },
            ],
            vec![LineNumberEntry { start_pc: 0, line: 3 }],
        );
        let blocks = correlate_try_catches(&origin(), &code, &[]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].line_number, 3);
    }

    #[test]
    fn multi_catch_merges_caught_types() {
        let code = code(
            vec![
                ExceptionTableEntry {
                    start_pc: 0,
                    end_pc: 8,
                    handler_pc: 11,
                    catch_type: Some("java/io/IOException".to_string()),
                },
                ExceptionTableEntry {
                    start_pc: 0,
                    end_pc: 8,
                    handler_pc: 15,
                    catch_type: Some("java/lang/IllegalStateException".to_string()),
                },
            ],
            vec![LineNumberEntry { start_pc: 0, line: 7 }],
        );
        let blocks = correlate_try_catches(&origin(), &code, &[]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].caught_types.len(), 2);
    }
}
