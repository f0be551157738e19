use crate::{
    catalog::{CatalogSnapshot, CatalogSource},
    entities::catalog::{
        assembly::{self, Entity as AssemblyEntity},
        assembly_component::{self, Entity as AssemblyComponentEntity},
        part::{self, Entity as PartEntity},
    },
    errors::{BomError, ServiceError},
    models::{AssemblyCatalogEntry, ComponentLink, PartCatalogEntry},
};
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Loads the whole catalog in three queries (parts, assemblies, components).
#[derive(Clone)]
pub struct DbCatalogSource {
    db: Arc<DatabaseConnection>,
}

impl DbCatalogSource {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogSource for DbCatalogSource {
    #[instrument(skip(self))]
    async fn load_snapshot(&self) -> Result<Arc<CatalogSnapshot>, ServiceError> {
        let db = &*self.db;

        let parts = PartEntity::find()
            .order_by_asc(part::Column::Id)
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to load catalog parts: {}", e);
                ServiceError::db_error(e)
            })?;

        let assemblies = AssemblyEntity::find()
            .order_by_asc(assembly::Column::Id)
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to load catalog assemblies: {}", e);
                ServiceError::db_error(e)
            })?;

        let components = AssemblyComponentEntity::find()
            .order_by_asc(assembly_component::Column::AssemblyId)
            .order_by_asc(assembly_component::Column::Position)
            .all(db)
            .await
            .map_err(|e| {
                error!("Failed to load assembly components: {}", e);
                ServiceError::db_error(e)
            })?;

        let snapshot = build_snapshot(parts, assemblies, components)?;

        info!(
            parts = snapshot.part_count(),
            assemblies = snapshot.assembly_count(),
            fingerprint = %snapshot.fingerprint(),
            "Catalog snapshot loaded"
        );

        Ok(Arc::new(snapshot))
    }
}

fn build_snapshot(
    parts: Vec<part::Model>,
    assemblies: Vec<assembly::Model>,
    components: Vec<assembly_component::Model>,
) -> Result<CatalogSnapshot, BomError> {
    let mut links: HashMap<String, Vec<ComponentLink>> = HashMap::new();
    for component in components {
        let quantity =
            u32::try_from(component.quantity).map_err(|_| BomError::InvalidQuantity {
                parent: component.assembly_id.clone(),
                child: component
                    .child_part_id
                    .clone()
                    .or_else(|| component.child_assembly_id.clone())
                    .unwrap_or_default(),
                quantity: i64::from(component.quantity),
            })?;

        links
            .entry(component.assembly_id)
            .or_default()
            .push(ComponentLink {
                child_part_id: component.child_part_id,
                child_assembly_id: component.child_assembly_id,
                quantity,
                notes: component.notes,
            });
    }

    let assemblies: Vec<AssemblyCatalogEntry> = assemblies
        .into_iter()
        .map(|model| AssemblyCatalogEntry {
            components: links.remove(&model.id).unwrap_or_default(),
            id: model.id,
            name: model.name,
            requires_serial: model.requires_serial,
            outsourced: model.outsourced,
        })
        .collect();

    if let Some(orphan) = links.keys().min().cloned() {
        warn!(assembly_id = %orphan, "Components reference an unknown assembly");
        let child = links
            .get(&orphan)
            .and_then(|orphan_links| orphan_links.first())
            .and_then(|link| {
                link.child_part_id
                    .clone()
                    .or_else(|| link.child_assembly_id.clone())
            })
            .unwrap_or_default();
        return Err(BomError::UnknownComponent {
            parent: orphan,
            child,
        });
    }

    CatalogSnapshot::from_entries(
        parts.into_iter().map(PartCatalogEntry::from),
        assemblies,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogStore;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use uuid::Uuid;

    fn part_row(id: &str) -> part::Model {
        part::Model {
            id: id.into(),
            name: format!("Part {id}"),
            requires_serial: false,
            requires_batch: false,
            outsourced: false,
            manufacturer_name: None,
            manufacturer_part_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn assembly_row(id: &str) -> assembly::Model {
        assembly::Model {
            id: id.into(),
            name: format!("Assembly {id}"),
            requires_serial: false,
            outsourced: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn component_row(
        assembly_id: &str,
        part_id: &str,
        quantity: i32,
        position: i32,
    ) -> assembly_component::Model {
        assembly_component::Model {
            id: Uuid::new_v4(),
            assembly_id: assembly_id.into(),
            child_part_id: Some(part_id.into()),
            child_assembly_id: None,
            quantity,
            position,
            notes: None,
        }
    }

    #[test]
    fn components_are_grouped_under_their_assembly() {
        let snapshot = build_snapshot(
            vec![part_row("P1"), part_row("P2")],
            vec![assembly_row("A1")],
            vec![
                component_row("A1", "P2", 1, 1),
                component_row("A1", "P1", 3, 2),
            ],
        )
        .unwrap();

        let assembly = snapshot.assembly("A1").unwrap();
        let ids: Vec<_> = assembly
            .components
            .iter()
            .map(|link| link.child_part_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["P2", "P1"]);
        assert_eq!(assembly.components[1].quantity, 3);
    }

    #[test]
    fn components_of_unknown_assembly_are_rejected() {
        let result = build_snapshot(
            vec![part_row("P1")],
            vec![assembly_row("A1")],
            vec![
                component_row("A1", "P1", 1, 1),
                component_row("GONE", "P1", 2, 1),
            ],
        );
        assert_matches!(
            result,
            Err(BomError::UnknownComponent { parent, child }) if parent == "GONE" && child == "P1"
        );
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let result = build_snapshot(
            vec![part_row("P1")],
            vec![assembly_row("A1")],
            vec![component_row("A1", "P1", -2, 1)],
        );
        assert_matches!(
            result,
            Err(BomError::InvalidQuantity { parent, quantity: -2, .. }) if parent == "A1"
        );
    }
}
