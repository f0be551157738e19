use crate::{
    errors::BomError,
    models::{AggregatedRow, BomTree, StructuralRole},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Ordering of structural roles in the aggregated view. Roles missing from
/// the list sort after every listed role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPriority(Vec<StructuralRole>);

impl CategoryPriority {
    pub fn new(order: Vec<StructuralRole>) -> Self {
        Self(order)
    }

    pub fn rank(&self, role: StructuralRole) -> usize {
        self.0
            .iter()
            .position(|candidate| *candidate == role)
            .unwrap_or(self.0.len())
    }

    pub fn roles(&self) -> &[StructuralRole] {
        &self.0
    }
}

impl Default for CategoryPriority {
    fn default() -> Self {
        Self(StructuralRole::iter().collect())
    }
}

/// Sums effective quantities per catalog id across the whole forest, part
/// and assembly nodes alike.
///
/// Rows are ordered by the best-ranked role among their sources, then by id.
pub fn aggregate(
    tree: &BomTree,
    priorities: &CategoryPriority,
) -> Result<Vec<AggregatedRow>, BomError> {
    let mut rows: BTreeMap<&str, AggregatedRow> = BTreeMap::new();

    for node in tree.nodes() {
        let row = rows.entry(node.id.as_str()).or_insert_with(|| AggregatedRow {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            quantity: 0,
            sources: Default::default(),
            root_labels: Default::default(),
            requires_serial: node.requires_serial,
            requires_batch: node.requires_batch,
            outsourced: node.outsourced,
        });

        row.quantity = row
            .quantity
            .checked_add(node.quantity)
            .ok_or_else(|| BomError::QuantityOverflow {
                id: node.id.clone(),
            })?;
        row.sources.insert(node.role);
        row.root_labels.insert(node.root_label.clone());
    }

    let mut rows: Vec<AggregatedRow> = rows.into_values().collect();
    // Stable: rows of equal rank keep the id order of the BTreeMap.
    rows.sort_by_key(|row| best_rank(row, priorities));
    Ok(rows)
}

fn best_rank(row: &AggregatedRow, priorities: &CategoryPriority) -> usize {
    row.sources
        .iter()
        .map(|role| priorities.rank(*role))
        .min()
        .unwrap_or(usize::MAX)
}
