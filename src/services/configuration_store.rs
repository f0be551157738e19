use crate::{
    entities::order_build_configuration::{self, Entity as OrderBuildConfigurationEntity},
    errors::ServiceError,
    models::{AccessorySelection, BuildConfiguration, BuildRequest},
};
use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{error, instrument};

/// Source of stored build configurations.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Returns the stored request of one build, or `None` when the order has
    /// no such build.
    async fn fetch_build(
        &self,
        order_id: &str,
        build_number: &str,
    ) -> Result<Option<BuildRequest>, ServiceError>;
}

/// Reads build configurations from the `order_build_configurations` table.
#[derive(Clone)]
pub struct DbConfigurationStore {
    db: Arc<DatabaseConnection>,
}

impl DbConfigurationStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfigurationStore for DbConfigurationStore {
    #[instrument(skip(self))]
    async fn fetch_build(
        &self,
        order_id: &str,
        build_number: &str,
    ) -> Result<Option<BuildRequest>, ServiceError> {
        let row = OrderBuildConfigurationEntity::find()
            .filter(order_build_configuration::Column::OrderId.eq(order_id))
            .filter(order_build_configuration::Column::BuildNumber.eq(build_number))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!("Failed to fetch build configuration: {}", e);
                ServiceError::db_error(e)
            })?;

        row.map(build_request_from_row).transpose()
    }
}

fn build_request_from_row(
    row: order_build_configuration::Model,
) -> Result<BuildRequest, ServiceError> {
    let configuration: BuildConfiguration = serde_json::from_value(row.configuration)?;
    let accessories: Vec<AccessorySelection> = match row.accessories {
        Some(value) if !value.is_null() => serde_json::from_value(value)?,
        _ => Vec::new(),
    };

    Ok(BuildRequest {
        order_id: row.order_id,
        build_number: row.build_number,
        customer_language: row.customer_language,
        configuration,
        accessories,
    })
}

/// Build configurations held in memory, keyed by (order id, build number).
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigurationStore {
    builds: Arc<DashMap<(String, String), BuildRequest>>,
}

impl InMemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a build; returns the previous request if any.
    pub fn upsert(&self, request: BuildRequest) -> Option<BuildRequest> {
        self.builds.insert(
            (request.order_id.clone(), request.build_number.clone()),
            request,
        )
    }

    pub fn remove(&self, order_id: &str, build_number: &str) -> Option<BuildRequest> {
        self.builds
            .remove(&(order_id.to_string(), build_number.to_string()))
            .map(|(_, request)| request)
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryConfigurationStore {
    async fn fetch_build(
        &self,
        order_id: &str,
        build_number: &str,
    ) -> Result<Option<BuildRequest>, ServiceError> {
        Ok(self
            .builds
            .get(&(order_id.to_string(), build_number.to_string()))
            .map(|entry| entry.value().clone()))
    }
}
