//! Per-session accumulation of raw facts, keyed by owning type name.
//!
//! Accumulation is commutative with respect to import order except the
//! single-valued superclass and static-initializer registrations, which
//! fail fast on conflicting re-registration (see [`RawClassFacts`]).

use std::collections::{BTreeSet, HashMap};

use crate::raw::{
    RawAccessKind, RawAccessRecord, RawClassFacts, RawCodeUnit, RawTryCatch, SyntheticInvocation,
};

/// Name predicates for compiler-generated members, used to route raw facts
/// either into ordinary storage or into the synthetic-origin index.
#[derive(Clone, Copy)]
pub(crate) struct SyntheticPredicates {
    pub is_lambda_method: fn(&str) -> bool,
    pub is_synthetic_accessor: fn(&str) -> bool,
    pub is_switch_map_field: fn(&str) -> bool,
}

impl Default for SyntheticPredicates {
    fn default() -> Self {
        Self {
            is_lambda_method: |name| name.starts_with("lambda$"),
            is_synthetic_accessor: |name| {
                name.strip_prefix("access$")
                    .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            },
            is_switch_map_field: |name| name.starts_with("$SwitchMap$"),
        }
    }
}

impl SyntheticPredicates {
    pub(crate) fn is_synthetic_unit_name(&self, name: &str) -> bool {
        (self.is_lambda_method)(name) || (self.is_synthetic_accessor)(name)
    }
}

/// Where [`ImportRecord::add_access`] puts a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Routing {
    Ordinary,
    SyntheticIndex,
    Dropped,
}

pub(crate) struct ImportRecord {
    predicates: SyntheticPredicates,
    classes: HashMap<String, RawClassFacts>,
    /// Ordinary dependency records, keyed by origin owner.
    accesses: HashMap<String, Vec<RawAccessRecord>>,
    try_catches: HashMap<String, Vec<RawTryCatch>>,
    /// Synthetic unit -> the invocations of it seen anywhere.
    synthetic_index: HashMap<RawCodeUnit, Vec<SyntheticInvocation>>,
    /// Names the resolution engine decided to stub.
    stubbed: BTreeSet<String>,
}

impl ImportRecord {
    pub(crate) fn new() -> Self {
        Self {
            predicates: SyntheticPredicates::default(),
            classes: HashMap::new(),
            accesses: HashMap::new(),
            try_catches: HashMap::new(),
            synthetic_index: HashMap::new(),
            stubbed: BTreeSet::new(),
        }
    }

    pub(crate) fn predicates(&self) -> &SyntheticPredicates {
        &self.predicates
    }

    pub(crate) fn contains_class(&self, binary_name: &str) -> bool {
        self.classes.contains_key(binary_name)
    }

    pub(crate) fn add_class(&mut self, binary_name: String, facts: RawClassFacts) {
        // A stubbed name that later gets decoded is promoted to a real class.
        self.stubbed.remove(&binary_name);
        self.classes.insert(binary_name, facts);
    }

    pub(crate) fn class_facts(&self, binary_name: &str) -> Option<&RawClassFacts> {
        self.classes.get(binary_name)
    }

    pub(crate) fn classes(&self) -> impl Iterator<Item = (&String, &RawClassFacts)> {
        self.classes.iter()
    }

    pub(crate) fn class_names(&self) -> impl Iterator<Item = &String> {
        self.classes.keys()
    }

    pub(crate) fn mark_stubbed(&mut self, binary_name: String) {
        if !self.classes.contains_key(&binary_name) {
            self.stubbed.insert(binary_name);
        }
    }

    pub(crate) fn is_stubbed(&self, binary_name: &str) -> bool {
        self.stubbed.contains(binary_name)
    }

    pub(crate) fn stubbed_names(&self) -> impl Iterator<Item = &String> {
        self.stubbed.iter()
    }

    /// Decide where a raw record belongs without consuming it.
    pub(crate) fn classify(&self, record: &RawAccessRecord) -> Routing {
        match record.kind {
            RawAccessKind::FieldRead | RawAccessKind::FieldWrite
                if (self.predicates.is_switch_map_field)(&record.target.name) =>
            {
                Routing::Dropped
            }
            RawAccessKind::MethodCall
                if self.predicates.is_synthetic_unit_name(&record.target.name) =>
            {
                Routing::SyntheticIndex
            }
            _ => Routing::Ordinary,
        }
    }

    /// Route one dependency record: accesses of synthetic switch-map fields
    /// are compiler noise and dropped; calls targeting synthetic units are
    /// recorded as invocations in the synthetic-origin index; everything
    /// else lands in ordinary storage.
    pub(crate) fn add_access(&mut self, record: RawAccessRecord) {
        match self.classify(&record) {
            Routing::Dropped => {
                tracing::trace!(
                    origin = %record.origin.owner,
                    field = %record.target.name,
                    "dropping synthetic enum switch-map field access"
                );
            }
            Routing::SyntheticIndex => {
                let Some(owner) = record.target.owner.element_object_name() else {
                    return;
                };
                let unit = RawCodeUnit::new(
                    owner,
                    record.target.name.clone(),
                    record.target.descriptor.clone(),
                );
                let through_lambda = (self.predicates.is_lambda_method)(&record.target.name);
                self.add_synthetic_invocation(
                    unit,
                    SyntheticInvocation {
                        origin: record.origin,
                        through_lambda,
                    },
                );
            }
            Routing::Ordinary => self
                .accesses
                .entry(record.origin.owner.clone())
                .or_default()
                .push(record),
        }
    }

    pub(crate) fn add_synthetic_invocation(
        &mut self,
        unit: RawCodeUnit,
        invocation: SyntheticInvocation,
    ) {
        self.synthetic_index.entry(unit).or_default().push(invocation);
    }

    pub(crate) fn add_try_catch(&mut self, block: RawTryCatch) {
        self.try_catches
            .entry(block.origin.owner.clone())
            .or_default()
            .push(block);
    }

    pub(crate) fn accesses_for(&self, owner: &str) -> &[RawAccessRecord] {
        self.accesses.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn try_catches_for(&self, owner: &str) -> &[RawTryCatch] {
        self.try_catches.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn synthetic_index(&self) -> &HashMap<RawCodeUnit, Vec<SyntheticInvocation>> {
        &self.synthetic_index
    }
}

#[cfg(test)]
mod tests {
    use girder_graph::TypeRef;

    use super::*;
    use crate::raw::RawTarget;

    fn record(kind: RawAccessKind, target_name: &str) -> RawAccessRecord {
        RawAccessRecord {
            origin: RawCodeUnit::new("com.example.A", "run", "()V"),
            kind,
            target: RawTarget {
                owner: TypeRef::object("com.example.B"),
                name: target_name.to_string(),
                descriptor: "()V".to_string(),
            },
            line_number: 1,
            declared_in_lambda: false,
        }
    }

    #[test]
    fn calls_to_synthetic_units_go_to_the_index() {
        let mut rec = ImportRecord::new();
        rec.add_access(record(RawAccessKind::MethodCall, "access$000"));
        assert!(rec.accesses_for("com.example.A").is_empty());
        let unit = RawCodeUnit::new("com.example.B", "access$000", "()V");
        assert_eq!(rec.synthetic_index().get(&unit).map(Vec::len), Some(1));
    }

    #[test]
    fn ordinary_calls_stay_in_ordinary_storage() {
        let mut rec = ImportRecord::new();
        rec.add_access(record(RawAccessKind::MethodCall, "run"));
        assert_eq!(rec.accesses_for("com.example.A").len(), 1);
        assert!(rec.synthetic_index().is_empty());
    }

    #[test]
    fn switch_map_field_accesses_are_dropped() {
        let mut rec = ImportRecord::new();
        rec.add_access(record(RawAccessKind::FieldRead, "$SwitchMap$com$example$Color"));
        assert!(rec.accesses_for("com.example.A").is_empty());
    }

    #[test]
    fn accessor_predicate_requires_digits() {
        let predicates = SyntheticPredicates::default();
        assert!((predicates.is_synthetic_accessor)("access$000"));
        assert!(!(predicates.is_synthetic_accessor)("access$helper"));
        assert!(!(predicates.is_synthetic_accessor)("access$"));
        assert!((predicates.is_lambda_method)("lambda$run$0"));
        assert!(!(predicates.is_lambda_method)("run"));
    }

    #[test]
    #[should_panic(expected = "conflicting superclass")]
    fn conflicting_superclass_registration_fails_fast() {
        let mut facts = RawClassFacts::default();
        facts.set_superclass("com.example.A", "com.example.Base".to_string());
        facts.set_superclass("com.example.A", "com.example.Other".to_string());
    }
}
