//! Read-only access to the part/assembly catalog.
//!
//! Generation never talks to the database directly: a [`CatalogSource`]
//! produces an immutable [`CatalogSnapshot`] up front, and the expander walks
//! that snapshot through the synchronous [`CatalogStore`] lookups.

pub mod db;

use crate::{
    errors::{BomError, ServiceError},
    models::{AssemblyCatalogEntry, CatalogItem, PartCatalogEntry},
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub use db::DbCatalogSource;

/// Synchronous catalog lookups used during expansion.
pub trait CatalogStore: Send + Sync {
    fn part(&self, id: &str) -> Option<&PartCatalogEntry>;

    fn assembly(&self, id: &str) -> Option<&AssemblyCatalogEntry>;

    fn resolve(&self, id: &str) -> Option<CatalogItem<'_>> {
        self.part(id)
            .map(CatalogItem::Part)
            .or_else(|| self.assembly(id).map(CatalogItem::Assembly))
    }
}

/// Produces a catalog snapshot, typically by preloading every table.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_snapshot(&self) -> Result<Arc<CatalogSnapshot>, ServiceError>;
}

/// Immutable, fully loaded catalog. An id is either a part or an assembly,
/// never both.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    parts: HashMap<String, PartCatalogEntry>,
    assemblies: HashMap<String, AssemblyCatalogEntry>,
    fingerprint: String,
}

impl CatalogSnapshot {
    pub fn builder() -> CatalogSnapshotBuilder {
        CatalogSnapshotBuilder::default()
    }

    pub fn from_entries(
        parts: impl IntoIterator<Item = PartCatalogEntry>,
        assemblies: impl IntoIterator<Item = AssemblyCatalogEntry>,
    ) -> Result<Self, BomError> {
        let mut part_map = HashMap::new();
        for part in parts {
            if part_map.contains_key(&part.id) {
                return Err(BomError::DuplicateCatalogId { id: part.id });
            }
            part_map.insert(part.id.clone(), part);
        }

        let mut assembly_map = HashMap::new();
        for assembly in assemblies {
            if part_map.contains_key(&assembly.id) || assembly_map.contains_key(&assembly.id) {
                return Err(BomError::DuplicateCatalogId { id: assembly.id });
            }
            assembly_map.insert(assembly.id.clone(), assembly);
        }

        let fingerprint = fingerprint(&part_map, &assembly_map);

        Ok(Self {
            parts: part_map,
            assemblies: assembly_map,
            fingerprint,
        })
    }

    /// SHA-256 over the sorted catalog contents; equal catalogs share a
    /// fingerprint regardless of load order.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn assembly_count(&self) -> usize {
        self.assemblies.len()
    }
}

impl CatalogStore for CatalogSnapshot {
    fn part(&self, id: &str) -> Option<&PartCatalogEntry> {
        self.parts.get(id)
    }

    fn assembly(&self, id: &str) -> Option<&AssemblyCatalogEntry> {
        self.assemblies.get(id)
    }
}

fn fingerprint(
    parts: &HashMap<String, PartCatalogEntry>,
    assemblies: &HashMap<String, AssemblyCatalogEntry>,
) -> String {
    let sorted_parts: BTreeMap<&String, &PartCatalogEntry> = parts.iter().collect();
    let sorted_assemblies: BTreeMap<&String, &AssemblyCatalogEntry> = assemblies.iter().collect();

    let mut hasher = Sha256::new();
    for part in sorted_parts.values() {
        hasher.update(b"part\0");
        // Serializing plain structs of strings and bools cannot fail.
        hasher.update(serde_json::to_vec(part).unwrap_or_default());
    }
    for assembly in sorted_assemblies.values() {
        hasher.update(b"assembly\0");
        hasher.update(serde_json::to_vec(assembly).unwrap_or_default());
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
pub struct CatalogSnapshotBuilder {
    parts: Vec<PartCatalogEntry>,
    assemblies: Vec<AssemblyCatalogEntry>,
}

impl CatalogSnapshotBuilder {
    pub fn part(mut self, part: PartCatalogEntry) -> Self {
        self.parts.push(part);
        self
    }

    pub fn assembly(mut self, assembly: AssemblyCatalogEntry) -> Self {
        self.assemblies.push(assembly);
        self
    }

    pub fn build(self) -> Result<CatalogSnapshot, BomError> {
        CatalogSnapshot::from_entries(self.parts, self.assemblies)
    }
}

/// Serves an already loaded snapshot.
#[derive(Debug, Clone)]
pub struct StaticCatalogSource {
    snapshot: Arc<CatalogSnapshot>,
}

impl StaticCatalogSource {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load_snapshot(&self) -> Result<Arc<CatalogSnapshot>, ServiceError> {
        Ok(self.snapshot.clone())
    }
}
