// BOM generation services
pub mod bom_generation;

// Stored build configurations
pub mod configuration_store;

pub use bom_generation::{BomGenerationService, CacheSettings};
pub use configuration_store::{
    ConfigurationStore, DbConfigurationStore, InMemoryConfigurationStore,
};
