use crate::{
    bom::resolver::RootSelection,
    catalog::CatalogStore,
    errors::BomError,
    models::{AssemblyCatalogEntry, BomTree, CatalogItem, LinkTarget, NodeId, ResolvedBomNode},
};
use std::collections::HashSet;
use tracing::debug;

/// An assembly whose components are being visited.
struct Frame<'a> {
    assembly: &'a AssemblyCatalogEntry,
    node: NodeId,
    next: usize,
}

/// Expands every root selection into a resolved forest.
///
/// Traversal is depth-first with an explicit stack, visiting components in
/// declared order, so depth is bounded by memory rather than by the call
/// stack. The assemblies on the current path are tracked; meeting one of
/// them again is a cycle. The same sub-assembly reached through different
/// branches is expanded once per occurrence.
pub fn expand(roots: &[RootSelection], catalog: &dyn CatalogStore) -> Result<BomTree, BomError> {
    let mut tree = BomTree::default();

    for root in roots {
        let before = tree.len();
        expand_root(root, catalog, &mut tree)?;
        debug!(
            role = %root.role,
            label = %root.label,
            id = %root.id,
            nodes = tree.len() - before,
            "Expanded root selection"
        );
    }

    Ok(tree)
}

fn expand_root(
    root: &RootSelection,
    catalog: &dyn CatalogStore,
    tree: &mut BomTree,
) -> Result<(), BomError> {
    let item = catalog
        .resolve(&root.id)
        .ok_or_else(|| BomError::UnknownComponent {
            parent: root.label.clone(),
            child: root.id.clone(),
        })?;
    if root.quantity == 0 {
        return Err(BomError::InvalidQuantity {
            parent: root.label.clone(),
            child: root.id.clone(),
            quantity: 0,
        });
    }

    let root_node = tree.push(resolved_node(
        item,
        root,
        root.quantity,
        u64::from(root.quantity),
        None,
        None,
    ));

    let CatalogItem::Assembly(assembly) = item else {
        return Ok(());
    };

    let mut stack = vec![Frame {
        assembly,
        node: root_node,
        next: 0,
    }];
    let mut path: Vec<&str> = vec![assembly.id.as_str()];
    let mut on_path: HashSet<&str> = HashSet::from([assembly.id.as_str()]);

    while let Some(frame) = stack.last_mut() {
        let parent = frame.assembly;
        let parent_node = frame.node;
        let Some(link) = parent.components.get(frame.next) else {
            stack.pop();
            if let Some(id) = path.pop() {
                on_path.remove(id);
            }
            continue;
        };
        frame.next += 1;

        let child = match link.target() {
            LinkTarget::Part(id) => catalog.part(id).map(CatalogItem::Part).ok_or(id),
            LinkTarget::Assembly(id) => catalog.assembly(id).map(CatalogItem::Assembly).ok_or(id),
            LinkTarget::Unset => Err(""),
            LinkTarget::Both { part, assembly } => {
                return Err(BomError::AmbiguousComponent {
                    parent: parent.id.clone(),
                    child: format!("{part} / {assembly}"),
                });
            }
        }
        .map_err(|child| BomError::UnknownComponent {
            parent: parent.id.clone(),
            child: child.to_string(),
        })?;

        if link.quantity == 0 {
            return Err(BomError::InvalidQuantity {
                parent: parent.id.clone(),
                child: child.id().to_string(),
                quantity: 0,
            });
        }

        let (parent_quantity, depth) = {
            let parent = &tree.nodes[parent_node];
            (parent.quantity, parent.depth + 1)
        };
        let quantity = parent_quantity
            .checked_mul(u64::from(link.quantity))
            .ok_or_else(|| BomError::QuantityOverflow {
                id: child.id().to_string(),
            })?;

        let node = tree.push(resolved_node(
            child,
            root,
            link.quantity,
            quantity,
            Some((parent_node, depth)),
            link.notes.clone(),
        ));

        if let CatalogItem::Assembly(assembly) = child {
            if on_path.contains(assembly.id.as_str()) {
                let start = path
                    .iter()
                    .position(|id| *id == assembly.id)
                    .unwrap_or_default();
                let mut cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                cycle.push(assembly.id.clone());
                return Err(BomError::CyclicAssembly { cycle });
            }

            path.push(assembly.id.as_str());
            on_path.insert(assembly.id.as_str());
            stack.push(Frame {
                assembly,
                node,
                next: 0,
            });
        }
    }

    Ok(())
}

fn resolved_node(
    item: CatalogItem<'_>,
    root: &RootSelection,
    declared_quantity: u32,
    quantity: u64,
    parent: Option<(NodeId, usize)>,
    notes: Option<String>,
) -> ResolvedBomNode {
    ResolvedBomNode {
        id: item.id().to_string(),
        name: item.name().to_string(),
        kind: item.kind(),
        declared_quantity,
        quantity,
        depth: parent.map_or(0, |(_, depth)| depth),
        parent: parent.map(|(node, _)| node),
        children: Vec::new(),
        role: root.role,
        root_label: root.label.clone(),
        requires_serial: item.requires_serial(),
        requires_batch: item.requires_batch(),
        outsourced: item.outsourced(),
        notes,
        tracking: None,
    }
}
