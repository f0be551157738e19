use super::catalog::ItemKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumIter, EnumString};

/// The structural element of a build a root selection stands for. Declaration
/// order is the default category priority for aggregated output.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StructuralRole {
    SinkBody,
    Basin,
    BasinAddon,
    Legs,
    Feet,
    Pegboard,
    Faucet,
    Sprayer,
    ControlBox,
    Accessory,
    Manual,
}

/// Index of a node inside its [`BomTree`].
pub type NodeId = usize;

/// Serial and batch numbers assigned downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingMetadata {
    #[serde(default)]
    pub serial_numbers: Vec<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBomNode {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    /// Quantity declared on the catalog link (or the root selection).
    pub declared_quantity: u32,
    /// Declared quantity multiplied down the path from the root.
    pub quantity: u64,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub role: StructuralRole,
    /// Label of the root selection this node descends from, e.g. "basin 2".
    pub root_label: String,
    pub requires_serial: bool,
    pub requires_batch: bool,
    pub outsourced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingMetadata>,
}

impl ResolvedBomNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn requires_tracking(&self) -> bool {
        self.requires_serial || self.requires_batch
    }
}

/// Resolved forest stored as an arena. Nodes are kept in pre-order, so a
/// parent always has a smaller index than its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomTree {
    pub(crate) nodes: Vec<ResolvedBomNode>,
    pub(crate) roots: Vec<NodeId>,
}

impl BomTree {
    pub fn nodes(&self) -> &[ResolvedBomNode] {
        &self.nodes
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&ResolvedBomNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &ResolvedBomNode> + '_ {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |child| self.nodes.get(*child))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &ResolvedBomNode> + '_ {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// Sum of leaf quantities grouped by catalog id. Sums saturate at
    /// `u64::MAX`; [`crate::bom::aggregate`] reports the overflow instead.
    pub fn leaf_totals(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for leaf in self.leaves() {
            let total: &mut u64 = totals.entry(leaf.id.clone()).or_insert(0);
            *total = total.saturating_add(leaf.quantity);
        }
        totals
    }

    pub(crate) fn push(&mut self, node: ResolvedBomNode) -> NodeId {
        let id = self.nodes.len();
        match node.parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(parent) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.nodes.push(node);
        id
    }
}

/// One row of the flat, quantity-summed view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub quantity: u64,
    /// Structural roles that contributed to this row.
    pub sources: BTreeSet<StructuralRole>,
    /// Root selections that contributed to this row.
    pub root_labels: BTreeSet<String>,
    pub requires_serial: bool,
    pub requires_batch: bool,
    pub outsourced: bool,
}

/// Result of generating the BOM for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomOutput {
    pub hierarchical: BomTree,
    pub aggregated: Vec<AggregatedRow>,
    /// Number of resolved nodes in the hierarchical view.
    pub total_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildBom {
    pub build_number: String,
    pub output: BomOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBom {
    pub order_id: String,
    pub builds: Vec<BuildBom>,
    pub total_items: usize,
}
