use crate::{
    bom::{generate_bom_with_priority, split_order, validate_build_request, CategoryPriority},
    catalog::{CatalogSource, DbCatalogSource},
    config::{AppConfig, CacheConfig},
    db::{establish_connection, DbConfig},
    errors::{BomError, ServiceError},
    models::{
        AccessorySelection, BomOutput, BuildBom, BuildConfiguration, BuildRequest, OrderBom,
        OrderRequest,
    },
    rules::RuleTables,
    services::configuration_store::{ConfigurationStore, DbConfigurationStore},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// (order id, build number)
type BuildKey = (String, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_entries: config.max_entries,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedBom {
    fingerprint: String,
    output: Arc<BomOutput>,
    generated_at: DateTime<Utc>,
    sequence: u64,
}

/// Generates BOMs for stored or submitted builds and caches them per build.
///
/// A cache entry is keyed by (order id, build number) and remembers a
/// fingerprint of everything the BOM depends on: the build configuration,
/// its accessories, the customer language and the catalog snapshot. A
/// request whose fingerprint differs from the cached one regenerates.
#[derive(Clone)]
pub struct BomGenerationService {
    catalog: Arc<dyn CatalogSource>,
    configurations: Arc<dyn ConfigurationStore>,
    rules: Arc<RuleTables>,
    priorities: CategoryPriority,
    cache: Arc<DashMap<BuildKey, CachedBom>>,
    settings: CacheSettings,
    sequence: Arc<AtomicU64>,
}

impl BomGenerationService {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        configurations: Arc<dyn ConfigurationStore>,
        rules: Arc<RuleTables>,
    ) -> Self {
        let priorities = rules.category_priority();
        Self {
            catalog,
            configurations,
            rules,
            priorities,
            cache: Arc::new(DashMap::new()),
            settings: CacheSettings::default(),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_cache(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_priority(mut self, priorities: CategoryPriority) -> Self {
        self.priorities = priorities;
        self
    }

    /// Wires the database-backed catalog and configuration stores and the
    /// rule tables named by the application configuration.
    #[instrument(skip(config))]
    pub async fn connect(config: &AppConfig) -> Result<Self, ServiceError> {
        let rules = Arc::new(config.load_rules()?);
        let db = Arc::new(establish_connection(&DbConfig::from(config)).await?);

        Ok(Self::new(
            Arc::new(DbCatalogSource::new(db.clone())),
            Arc::new(DbConfigurationStore::new(db)),
            rules,
        )
        .with_cache(CacheSettings::from(&config.cache)))
    }

    pub fn rules(&self) -> &RuleTables {
        &self.rules
    }

    /// Generates (or serves from cache) the BOM of a stored build.
    #[instrument(skip(self))]
    pub async fn generate_for_build(
        &self,
        order_id: &str,
        build_number: &str,
    ) -> Result<Arc<BomOutput>, ServiceError> {
        let request = self
            .configurations
            .fetch_build(order_id, build_number)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Build {} of order {} not found",
                    build_number, order_id
                ))
            })?;

        self.generate(&request).await
    }

    /// Generates (or serves from cache) the BOM of a submitted build.
    ///
    /// The request is validated before the catalog is touched.
    #[instrument(
        skip(self, request),
        fields(order_id = %request.order_id, build_number = %request.build_number)
    )]
    pub async fn generate(&self, request: &BuildRequest) -> Result<Arc<BomOutput>, ServiceError> {
        validate_build_request(request, &self.rules).map_err(|e| self.failed(e))?;

        let catalog = self.catalog.load_snapshot().await?;
        let fingerprint = request_fingerprint(request, catalog.fingerprint())?;
        let key: BuildKey = (request.order_id.clone(), request.build_number.clone());

        if self.settings.enabled {
            let hit = self
                .cache
                .get(&key)
                .filter(|entry| entry.fingerprint == fingerprint)
                .map(|entry| (entry.output.clone(), entry.generated_at));
            if let Some((output, generated_at)) = hit {
                debug!(%generated_at, "Serving cached BOM");
                return Ok(output);
            }
        }

        let output = generate_bom_with_priority(request, &*catalog, &self.rules, &self.priorities)
            .map(Arc::new)
            .map_err(|e| self.failed(e))?;

        if self.settings.enabled {
            self.store(key, fingerprint, output.clone());
        }

        Ok(output)
    }

    /// Generates every build of an order through the cache, in build order.
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn generate_order(&self, order: &OrderRequest) -> Result<OrderBom, ServiceError> {
        let requests = split_order(order).map_err(|e| self.failed(e))?;
        for request in &requests {
            validate_build_request(request, &self.rules).map_err(|e| self.failed(e))?;
        }

        let mut builds = Vec::with_capacity(requests.len());
        for request in &requests {
            let output = self.generate(request).await?;
            builds.push(BuildBom {
                build_number: request.build_number.clone(),
                output: output.as_ref().clone(),
            });
        }
        let total_items: usize = builds.iter().map(|build| build.output.total_items).sum();

        info!(builds = builds.len(), total_items, "Order BOM generated");
        Ok(OrderBom {
            order_id: order.order_id.clone(),
            builds,
            total_items,
        })
    }

    /// Drops the cached BOM of one build. Returns whether an entry existed.
    pub fn invalidate(&self, order_id: &str, build_number: &str) -> bool {
        let removed = self
            .cache
            .remove(&(order_id.to_string(), build_number.to_string()))
            .is_some();
        if removed {
            warn!(order_id, build_number, "Cached BOM invalidated");
        }
        removed
    }

    /// Drops every cached build of an order. Returns the number removed.
    pub fn invalidate_order(&self, order_id: &str) -> usize {
        let before = self.cache.len();
        self.cache.retain(|(order, _), _| order != order_id);
        let removed = before.saturating_sub(self.cache.len());
        if removed > 0 {
            warn!(order_id, removed, "Cached order BOMs invalidated");
        }
        removed
    }

    /// Cached (order id, build number) pairs, sorted.
    pub fn cached_builds(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self.cache.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Inserts an entry, evicting the oldest one when the cache is full.
    ///
    /// The capacity check and the insert are separate map operations, so
    /// concurrent misses may briefly hold more than `max_entries` entries.
    /// The limit is a soft cap.
    fn store(&self, key: BuildKey, fingerprint: String, output: Arc<BomOutput>) {
        if !self.cache.contains_key(&key) && self.cache.len() >= self.settings.max_entries {
            let oldest = self
                .cache
                .iter()
                .min_by_key(|entry| entry.sequence)
                .map(|entry| entry.key().clone());
            if let Some(oldest) = oldest {
                debug!(order_id = %oldest.0, build_number = %oldest.1, "Evicting cached BOM");
                self.cache.remove(&oldest);
            }
        }

        self.cache.insert(
            key,
            CachedBom {
                fingerprint,
                output,
                generated_at: Utc::now(),
                sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    fn failed(&self, err: BomError) -> ServiceError {
        error!(code = err.code(), category = %err.category(), "BOM generation failed: {}", err);
        ServiceError::Bom(err)
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    customer_language: &'a str,
    configuration: &'a BuildConfiguration,
    accessories: &'a [AccessorySelection],
    catalog: &'a str,
}

/// SHA-256 over the inputs a build's BOM depends on.
fn request_fingerprint(
    request: &BuildRequest,
    catalog_fingerprint: &str,
) -> Result<String, ServiceError> {
    let input = FingerprintInput {
        customer_language: &request.customer_language,
        configuration: &request.configuration,
        accessories: &request.accessories,
        catalog: catalog_fingerprint,
    };
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&input)?);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BasinConfiguration, BasinType, SinkDimensions};

    fn request() -> BuildRequest {
        BuildRequest {
            order_id: "ORD-1".into(),
            build_number: "B-1".into(),
            customer_language: "EN".into(),
            configuration: BuildConfiguration {
                sink_model_id: "T2-B1".into(),
                dimensions: SinkDimensions {
                    width: 30,
                    length: 60,
                },
                legs_type_id: None,
                feet_type_id: None,
                has_pegboard: false,
                pegboard_type_id: None,
                pegboard_color: None,
                basins: vec![BasinConfiguration {
                    basin_type: BasinType::EDrain,
                    size_id: "20X20X8".into(),
                    addons: vec![],
                }],
                faucets: vec![],
                sprayers: vec![],
            },
            accessories: vec![],
        }
    }

    #[test]
    fn fingerprint_tracks_configuration_language_and_catalog() {
        let base = request_fingerprint(&request(), "catalog-a").unwrap();
        assert_eq!(base, request_fingerprint(&request(), "catalog-a").unwrap());
        assert_ne!(base, request_fingerprint(&request(), "catalog-b").unwrap());

        let mut french = request();
        french.customer_language = "FR".into();
        assert_ne!(base, request_fingerprint(&french, "catalog-a").unwrap());

        let mut longer = request();
        longer.configuration.dimensions.length = 72;
        assert_ne!(base, request_fingerprint(&longer, "catalog-a").unwrap());
    }

    #[test]
    fn fingerprint_ignores_build_identity() {
        let mut other_build = request();
        other_build.build_number = "B-2".into();
        assert_eq!(
            request_fingerprint(&request(), "c").unwrap(),
            request_fingerprint(&other_build, "c").unwrap()
        );
    }
}
