//! Export views over an already resolved tree: nested JSON, flat outline
//! rows and CSV.

use crate::{
    errors::ServiceError,
    models::{AggregatedRow, BomTree, ItemKind, ResolvedBomNode, StructuralRole, TrackingMetadata},
};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A node with its children inline, for JSON consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedBomNode {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub quantity: u64,
    pub declared_quantity: u32,
    pub role: StructuralRole,
    pub requires_serial: bool,
    pub requires_batch: bool,
    pub outsourced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<NestedBomNode>,
}

impl NestedBomNode {
    fn leaf(node: &ResolvedBomNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            quantity: node.quantity,
            declared_quantity: node.declared_quantity,
            role: node.role,
            requires_serial: node.requires_serial,
            requires_batch: node.requires_batch,
            outsourced: node.outsourced,
            notes: node.notes.clone(),
            tracking: node.tracking.clone(),
            children: Vec::new(),
        }
    }
}

/// Builds the nested view of the forest.
///
/// Nodes are stored in pre-order, so walking the arena backwards finishes
/// every child before its parent is taken.
pub fn to_nested(tree: &BomTree) -> Vec<NestedBomNode> {
    let mut built: Vec<Option<NestedBomNode>> = vec![None; tree.len()];

    for (index, node) in tree.nodes().iter().enumerate().rev() {
        let mut nested = NestedBomNode::leaf(node);
        nested.children = node
            .children
            .iter()
            .filter_map(|child| built.get_mut(*child).and_then(Option::take))
            .collect();
        built[index] = Some(nested);
    }

    tree.roots()
        .iter()
        .filter_map(|root| built.get_mut(*root).and_then(Option::take))
        .collect()
}

/// Order context stamped on every export row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_id: String,
    pub build_number: String,
}

/// One line of the flat export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub order_id: String,
    pub build_number: String,
    pub level: usize,
    /// Outline position such as `1.2.1`.
    pub position: String,
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub quantity: u64,
    pub declared_quantity: u32,
    pub role: StructuralRole,
    pub requires_serial: bool,
    pub requires_batch: bool,
    pub outsourced: bool,
    /// Serial numbers joined with `"; "`.
    pub serial_numbers: String,
    pub batch_number: String,
    pub notes: String,
}

/// Flattens the forest into pre-order rows with outline positions.
pub fn flatten_for_export(tree: &BomTree, order_info: &OrderInfo) -> Vec<ExportRow> {
    let mut positions: Vec<String> = vec![String::new(); tree.len()];
    for (index, root) in tree.roots().iter().enumerate() {
        if let Some(slot) = positions.get_mut(*root) {
            *slot = (index + 1).to_string();
        }
    }

    let mut rows = Vec::with_capacity(tree.len());
    for (index, node) in tree.nodes().iter().enumerate() {
        // Parents precede children, so the parent's position is final here.
        for (ordinal, child) in node.children.iter().enumerate() {
            let position = format!("{}.{}", positions[index], ordinal + 1);
            if let Some(slot) = positions.get_mut(*child) {
                *slot = position;
            }
        }

        let tracking = node.tracking.as_ref();
        rows.push(ExportRow {
            order_id: order_info.order_id.clone(),
            build_number: order_info.build_number.clone(),
            level: node.depth,
            position: positions[index].clone(),
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            quantity: node.quantity,
            declared_quantity: node.declared_quantity,
            role: node.role,
            requires_serial: node.requires_serial,
            requires_batch: node.requires_batch,
            outsourced: node.outsourced,
            serial_numbers: tracking
                .map(|tracking| tracking.serial_numbers.join("; "))
                .unwrap_or_default(),
            batch_number: tracking
                .and_then(|tracking| tracking.batch_number.clone())
                .unwrap_or_default(),
            notes: node.notes.clone().unwrap_or_default(),
        });
    }
    rows
}

/// Writes export rows as CSV with a header line.
pub fn write_export_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), ServiceError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    Ok(())
}

#[derive(Serialize)]
struct AggregatedCsvRow<'a> {
    id: &'a str,
    name: &'a str,
    kind: ItemKind,
    quantity: u64,
    sources: String,
    root_labels: String,
    requires_serial: bool,
    requires_batch: bool,
    outsourced: bool,
}

/// Writes the aggregated view as CSV; set-valued columns are joined with `"; "`.
pub fn write_aggregated_csv<W: Write>(
    rows: &[AggregatedRow],
    writer: W,
) -> Result<(), ServiceError> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in rows {
        csv.serialize(AggregatedCsvRow {
            id: &row.id,
            name: &row.name,
            kind: row.kind,
            quantity: row.quantity,
            sources: row
                .sources
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
            root_labels: row
                .root_labels
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("; "),
            requires_serial: row.requires_serial,
            requires_batch: row.requires_batch,
            outsourced: row.outsourced,
        })?;
    }
    csv.flush()
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    Ok(())
}
