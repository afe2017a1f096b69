//! Rewrites dependency records whose origin is a compiler-injected code
//! unit (synthetic accessor or lambda body) so that edges are attributed
//! to the code a human actually wrote.
//!
//! Rewriting is an explicit pass producing new records; originals are
//! never mutated. The non-synthetic common case returns a shared
//! [`Rewritten::Unchanged`] sentinel so no collection is allocated for it,
//! and resolved rewrite chains are memoized per origin unit.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::raw::{RawAccessRecord, RawCodeUnit, SyntheticInvocation};
use crate::record::SyntheticPredicates;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Rewritten {
    /// The origin is not synthetic; the caller keeps the original record.
    Unchanged,
    /// One record per enclosing invocation; empty when no invocation of
    /// the synthetic unit was found anywhere (the record is dropped).
    Replaced(Vec<RawAccessRecord>),
}

/// A rewrite chain endpoint: the real origin plus whether any link of the
/// chain went through a lambda body.
type Chain = (RawCodeUnit, bool);

pub(crate) struct SyntheticOriginResolver<'r> {
    index: &'r HashMap<RawCodeUnit, Vec<SyntheticInvocation>>,
    predicates: &'r SyntheticPredicates,
    chains: RefCell<HashMap<RawCodeUnit, Rc<Vec<Chain>>>>,
}

impl<'r> SyntheticOriginResolver<'r> {
    pub(crate) fn new(
        index: &'r HashMap<RawCodeUnit, Vec<SyntheticInvocation>>,
        predicates: &'r SyntheticPredicates,
    ) -> Self {
        Self {
            index,
            predicates,
            chains: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn is_synthetic_origin(&self, origin: &RawCodeUnit) -> bool {
        self.predicates.is_synthetic_unit_name(&origin.name)
    }

    pub(crate) fn rewrite(&self, record: &RawAccessRecord) -> Rewritten {
        if !self.is_synthetic_origin(&record.origin) {
            return Rewritten::Unchanged;
        }
        let chains = self.chains_for(&record.origin);
        if chains.is_empty() {
            tracing::debug!(
                origin = %record.origin.owner,
                unit = %record.origin.name,
                "no invocation of synthetic unit found, dropping dependency record"
            );
            return Rewritten::Replaced(Vec::new());
        }
        Rewritten::Replaced(
            chains
                .iter()
                .map(|(origin, through_lambda)| RawAccessRecord {
                    origin: origin.clone(),
                    declared_in_lambda: record.declared_in_lambda || *through_lambda,
                    ..record.clone()
                })
                .collect(),
        )
    }

    /// Real origins for a synthetic unit, for rewriting non-record facts
    /// (try/catch regions). `None` when the unit is not synthetic.
    pub(crate) fn origins_for(&self, origin: &RawCodeUnit) -> Option<Rc<Vec<Chain>>> {
        if !self.is_synthetic_origin(origin) {
            return None;
        }
        Some(self.chains_for(origin))
    }

    fn chains_for(&self, unit: &RawCodeUnit) -> Rc<Vec<Chain>> {
        if let Some(cached) = self.chains.borrow().get(unit) {
            return Rc::clone(cached);
        }
        let mut visited = HashSet::new();
        let computed = Rc::new(self.compute_chains(unit, &mut visited));
        self.chains
            .borrow_mut()
            .insert(unit.clone(), Rc::clone(&computed));
        computed
    }

    fn compute_chains(&self, unit: &RawCodeUnit, visited: &mut HashSet<RawCodeUnit>) -> Vec<Chain> {
        visited.insert(unit.clone());
        let Some(invocations) = self.index.get(unit) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for invocation in invocations {
            if self.is_synthetic_origin(&invocation.origin) {
                if visited.contains(&invocation.origin) {
                    continue;
                }
                for (origin, through_lambda) in self.compute_chains(&invocation.origin, visited) {
                    out.push((origin, through_lambda || invocation.through_lambda));
                }
            } else {
                out.push((invocation.origin.clone(), invocation.through_lambda));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use girder_graph::TypeRef;

    use super::*;
    use crate::raw::{RawAccessKind, RawTarget};

    fn unit(owner: &str, name: &str) -> RawCodeUnit {
        RawCodeUnit::new(owner, name, "()V")
    }

    fn record_from(origin: RawCodeUnit) -> RawAccessRecord {
        RawAccessRecord {
            origin,
            kind: RawAccessKind::FieldRead,
            target: RawTarget {
                owner: TypeRef::object("com.example.Target"),
                name: "value".to_string(),
                descriptor: "I".to_string(),
            },
            line_number: 8,
            declared_in_lambda: false,
        }
    }

    #[test]
    fn non_synthetic_origin_is_a_no_op() {
        let index = HashMap::new();
        let predicates = SyntheticPredicates::default();
        let resolver = SyntheticOriginResolver::new(&index, &predicates);
        let record = record_from(unit("com.example.A", "realMethod"));
        assert_eq!(resolver.rewrite(&record), Rewritten::Unchanged);
    }

    #[test]
    fn accessor_origin_is_rewritten_to_its_caller() {
        let mut index = HashMap::new();
        index.insert(
            unit("com.example.Outer", "access$000"),
            vec![SyntheticInvocation {
                origin: unit("com.example.Outer$Inner", "doWork"),
                through_lambda: false,
            }],
        );
        let predicates = SyntheticPredicates::default();
        let resolver = SyntheticOriginResolver::new(&index, &predicates);

        let record = record_from(unit("com.example.Outer", "access$000"));
        let Rewritten::Replaced(records) = resolver.rewrite(&record) else {
            panic!("expected a rewrite");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin, unit("com.example.Outer$Inner", "doWork"));
        assert!(!records[0].declared_in_lambda);
    }

    #[test]
    fn lambda_chain_sets_the_lambda_flag_transitively() {
        let mut index = HashMap::new();
        // lambda$a$0 is hooked from access$100, itself called from run().
        index.insert(
            unit("com.example.A", "lambda$a$0"),
            vec![SyntheticInvocation {
                origin: unit("com.example.A", "access$100"),
                through_lambda: true,
            }],
        );
        index.insert(
            unit("com.example.A", "access$100"),
            vec![SyntheticInvocation {
                origin: unit("com.example.A", "run"),
                through_lambda: false,
            }],
        );
        let predicates = SyntheticPredicates::default();
        let resolver = SyntheticOriginResolver::new(&index, &predicates);

        let record = record_from(unit("com.example.A", "lambda$a$0"));
        let Rewritten::Replaced(records) = resolver.rewrite(&record) else {
            panic!("expected a rewrite");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin, unit("com.example.A", "run"));
        assert!(records[0].declared_in_lambda);
    }

    #[test]
    fn unmatched_synthetic_origin_drops_the_record() {
        let index = HashMap::new();
        let predicates = SyntheticPredicates::default();
        let resolver = SyntheticOriginResolver::new(&index, &predicates);

        let record = record_from(unit("com.example.A", "access$999"));
        assert_eq!(resolver.rewrite(&record), Rewritten::Replaced(Vec::new()));
    }

    #[test]
    fn cyclic_synthetic_invocations_terminate() {
        let mut index = HashMap::new();
        index.insert(
            unit("com.example.A", "access$000"),
            vec![SyntheticInvocation {
                origin: unit("com.example.A", "access$100"),
                through_lambda: false,
            }],
        );
        index.insert(
            unit("com.example.A", "access$100"),
            vec![SyntheticInvocation {
                origin: unit("com.example.A", "access$000"),
                through_lambda: false,
            }],
        );
        let predicates = SyntheticPredicates::default();
        let resolver = SyntheticOriginResolver::new(&index, &predicates);

        let record = record_from(unit("com.example.A", "access$000"));
        assert_eq!(resolver.rewrite(&record), Rewritten::Replaced(Vec::new()));
    }
}
