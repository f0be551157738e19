use crate::{
    errors::BomError,
    models::{BomTree, NodeId, ResolvedBomNode, TrackingMetadata},
};
use std::collections::HashSet;

impl BomTree {
    /// Attaches serial and batch numbers to one node. This is the only
    /// mutation a resolved tree accepts, and it happens at most once per node.
    ///
    /// A serial-tracked node needs one distinct serial number per unit of its
    /// effective quantity; a batch-tracked node needs a batch number. Numbers
    /// for tracking the node does not require are rejected.
    pub fn attach_tracking(
        &mut self,
        node: NodeId,
        metadata: TrackingMetadata,
    ) -> Result<(), BomError> {
        let rejected = |reason: String| BomError::Tracking { node, reason };

        let target = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| rejected("no such node".into()))?;

        if target.tracking.is_some() {
            return Err(rejected(format!("{} already carries tracking data", target.id)));
        }
        if !target.requires_tracking() {
            return Err(rejected(format!("{} does not require tracking", target.id)));
        }

        let serials = &metadata.serial_numbers;
        if target.requires_serial {
            if serials.len() as u64 != target.quantity {
                return Err(rejected(format!(
                    "{} needs {} serial number(s), got {}",
                    target.id,
                    target.quantity,
                    serials.len()
                )));
            }
            let mut seen = HashSet::new();
            for serial in serials {
                if serial.trim().is_empty() {
                    return Err(rejected("blank serial number".into()));
                }
                if !seen.insert(serial.as_str()) {
                    return Err(rejected(format!("duplicate serial number {serial}")));
                }
            }
        } else if !serials.is_empty() {
            return Err(rejected(format!("{} is not serial tracked", target.id)));
        }

        let batch = metadata
            .batch_number
            .as_deref()
            .filter(|batch| !batch.trim().is_empty());
        match (target.requires_batch, batch) {
            (true, None) => {
                return Err(rejected(format!("{} needs a batch number", target.id)));
            }
            (false, Some(_)) => {
                return Err(rejected(format!("{} is not batch tracked", target.id)));
            }
            _ => {}
        }

        target.tracking = Some(metadata);
        Ok(())
    }

    /// Nodes that require serial or batch numbers, in pre-order.
    pub fn tracked_nodes(&self) -> impl Iterator<Item = (NodeId, &ResolvedBomNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.requires_tracking())
    }
}
