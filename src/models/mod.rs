pub mod bom;
pub mod catalog;
pub mod configuration;

pub use bom::{
    AggregatedRow, BomOutput, BomTree, BuildBom, NodeId, OrderBom, ResolvedBomNode,
    StructuralRole, TrackingMetadata,
};
pub use catalog::{
    AssemblyCatalogEntry, CatalogItem, ComponentLink, ItemKind, LinkTarget, Manufacturer,
    PartCatalogEntry,
};
pub use configuration::{
    AccessorySelection, BasinAddon, BasinComposition, BasinConfiguration, BasinType,
    BuildConfiguration, BuildRequest, FaucetConfiguration, OrderRequest, SinkDimensions,
    SprayerConfiguration,
};
