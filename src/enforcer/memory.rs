//! In-process interval-set driver.
//!
//! Mirrors what the kernel does with `flags interval` sets: elements are
//! stored exactly as given, deletes must match a stored element, overlapping
//! intervals are rejected and a batch is applied all-or-nothing on commit.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{IntervalDriver, NamedSet, Verdict};
use crate::addr::Family;
use crate::error::{FwsetError, Result};
use crate::interval::{decode, terminator, BoundaryElement};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    set: String,
    verdict: Verdict,
}

#[derive(Debug, Clone, Default)]
struct Table {
    chains: BTreeMap<String, Vec<Rule>>,
    sets: BTreeMap<String, BTreeSet<BoundaryElement>>,
}

impl Table {
    fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.chains.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone)]
enum Op {
    CreateSet(NamedSet),
    Add(NamedSet, Vec<BoundaryElement>),
    Remove(NamedSet, Vec<BoundaryElement>),
    DestroySet(NamedSet),
    DestroyTable(Family, String),
}

type TableKey = (Family, String);

/// Interval sets held in memory, with kernel-like transaction semantics.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    tables: BTreeMap<TableKey, Table>,
    pending: Vec<Op>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// No tables exist
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of committed rules that reference `set`.
    pub fn rule_count(&self, set: &NamedSet) -> usize {
        self.tables
            .get(&(set.family, set.table.clone()))
            .and_then(|t| t.chains.get(&set.chain))
            .map(|rules| rules.iter().filter(|r| r.set == set.name).count())
            .unwrap_or(0)
    }

    fn apply(tables: &mut BTreeMap<TableKey, Table>, op: Op) -> Result<Option<NamedSet>> {
        match op {
            Op::CreateSet(set) => {
                let table = tables.entry((set.family, set.table.clone())).or_default();
                let rules = table.chains.entry(set.chain.clone()).or_default();
                if !rules.iter().any(|r| r.set == set.name) {
                    rules.push(Rule {
                        set: set.name.clone(),
                        verdict: set.verdict,
                    });
                }
                table
                    .sets
                    .entry(set.name.clone())
                    .or_insert_with(|| BTreeSet::from([terminator(set.family)]));
                Ok(None)
            }
            Op::Add(set, elements) => {
                let stored = Self::set_mut(tables, &set)?;
                let existing = decode(&stored.iter().copied().collect::<Vec<_>>())?;
                // Re-adding a stored interval is a no-op, any other intersection conflicts
                for range in decode(&elements)? {
                    if let Some(clash) = existing.iter().find(|r| r.overlaps(&range) && **r != range) {
                        return Err(FwsetError::backend(format!(
                            "interval overlaps in set {}: {} conflicts with {}",
                            set, range, clash
                        )));
                    }
                }
                stored.extend(elements);
                Ok(Some(set))
            }
            Op::Remove(set, elements) => {
                let stored = Self::set_mut(tables, &set)?;
                for element in elements {
                    if !stored.remove(&element) {
                        return Err(FwsetError::backend(format!(
                            "could not delete element {} from set {}: no such element",
                            element, set
                        )));
                    }
                }
                Ok(Some(set))
            }
            Op::DestroySet(set) => {
                if let Some(table) = tables.get_mut(&(set.family, set.table.clone())) {
                    for rules in table.chains.values_mut() {
                        rules.retain(|r| r.set != set.name);
                    }
                    table.sets.remove(&set.name);
                }
                Ok(None)
            }
            Op::DestroyTable(family, name) => {
                let key = (family, name);
                if tables.get(&key).is_some_and(Table::is_empty) {
                    tables.remove(&key);
                }
                Ok(None)
            }
        }
    }

    fn set_mut<'a>(
        tables: &'a mut BTreeMap<TableKey, Table>,
        set: &NamedSet,
    ) -> Result<&'a mut BTreeSet<BoundaryElement>> {
        tables
            .get_mut(&(set.family, set.table.clone()))
            .and_then(|t| t.sets.get_mut(&set.name))
            .ok_or_else(|| FwsetError::SetNotFound(set.name.clone()))
    }
}

impl IntervalDriver for MemoryDriver {
    fn create_set(&mut self, set: &NamedSet) -> Result<()> {
        self.pending.push(Op::CreateSet(set.clone()));
        Ok(())
    }

    fn add_boundaries(&mut self, set: &NamedSet, elements: &[BoundaryElement]) -> Result<()> {
        self.pending.push(Op::Add(set.clone(), elements.to_vec()));
        Ok(())
    }

    fn remove_boundaries(&mut self, set: &NamedSet, elements: &[BoundaryElement]) -> Result<()> {
        self.pending.push(Op::Remove(set.clone(), elements.to_vec()));
        Ok(())
    }

    fn read_boundaries(&self, set: &NamedSet) -> Result<Vec<BoundaryElement>> {
        self.tables
            .get(&(set.family, set.table.clone()))
            .and_then(|t| t.sets.get(&set.name))
            .map(|stored| stored.iter().copied().collect())
            .ok_or_else(|| FwsetError::SetNotFound(set.name.clone()))
    }

    fn destroy_set(&mut self, set: &NamedSet) -> Result<()> {
        self.pending.push(Op::DestroySet(set.clone()));
        Ok(())
    }

    fn destroy_table(&mut self, family: Family, table: &str) -> Result<()> {
        self.pending.push(Op::DestroyTable(family, table.to_string()));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let ops = std::mem::take(&mut self.pending);
        if ops.is_empty() {
            return Ok(());
        }
        debug!("Committing {} staged operation(s)", ops.len());

        let mut staged = self.tables.clone();
        let mut touched = Vec::new();
        for op in ops {
            if let Some(set) = Self::apply(&mut staged, op)? {
                touched.push(set);
            }
        }

        // Overlapping intervals leave an unbalanced boundary sequence
        for set in &touched {
            if let Some(stored) = staged
                .get(&(set.family, set.table.clone()))
                .and_then(|t| t.sets.get(&set.name))
            {
                let elements: Vec<BoundaryElement> = stored.iter().copied().collect();
                decode(&elements).map_err(|e| {
                    FwsetError::backend(format!("interval overlaps in set {}: {}", set, e))
                })?;
            }
        }

        self.tables = staged;
        Ok(())
    }

    fn rollback(&mut self) {
        self.pending.clear();
    }
}
