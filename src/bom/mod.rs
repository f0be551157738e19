//! BOM generation pipeline.
//!
//! Configuration is resolved into root selections, roots are expanded
//! against an immutable catalog into a resolved forest, and the forest is
//! aggregated and exported. Every step is synchronous and any failure aborts
//! the whole generation.

pub mod aggregator;
pub mod expander;
pub mod exporter;
pub mod resolver;
pub mod tracking;

pub use aggregator::{aggregate, CategoryPriority};
pub use expander::expand;
pub use exporter::{
    flatten_for_export, to_nested, write_aggregated_csv, write_export_csv, ExportRow,
    NestedBomNode, OrderInfo,
};
pub use resolver::{resolve_roots, split_order, validate_build_request, RootSelection};

use crate::{
    catalog::CatalogStore,
    errors::BomError,
    models::{BomOutput, BuildBom, BuildRequest, OrderBom, OrderRequest},
    rules::RuleTables,
};
use tracing::{info, warn};

/// Generates the BOM of one build, ordering aggregated rows with the
/// category priority of the rule tables.
pub fn generate_bom(
    request: &BuildRequest,
    catalog: &dyn CatalogStore,
    rules: &RuleTables,
) -> Result<BomOutput, BomError> {
    generate_bom_with_priority(request, catalog, rules, &rules.category_priority())
}

pub fn generate_bom_with_priority(
    request: &BuildRequest,
    catalog: &dyn CatalogStore,
    rules: &RuleTables,
    priorities: &CategoryPriority,
) -> Result<BomOutput, BomError> {
    validate_build_request(request, rules)?;

    let roots = resolve_roots(request, rules).map_err(|err| {
        if let BomError::MappingNotFound { table, key } = &err {
            warn!(
                order_id = %request.order_id,
                build_number = %request.build_number,
                table = %table,
                key = %key,
                "No mapping for configuration value"
            );
        }
        err
    })?;

    let hierarchical = expand(&roots, catalog)?;
    let aggregated = aggregate(&hierarchical, priorities)?;
    let total_items = hierarchical.len();

    info!(
        order_id = %request.order_id,
        build_number = %request.build_number,
        roots = roots.len(),
        nodes = total_items,
        rows = aggregated.len(),
        "BOM generated"
    );

    Ok(BomOutput {
        hierarchical,
        aggregated,
        total_items,
    })
}

/// Generates one BOM per build of an order, in the order's build order.
/// The whole order is validated first; any failing build aborts the order.
pub fn generate_order_bom(
    order: &OrderRequest,
    catalog: &dyn CatalogStore,
    rules: &RuleTables,
) -> Result<OrderBom, BomError> {
    let requests = split_order(order)?;
    for request in &requests {
        validate_build_request(request, rules)?;
    }

    let priorities = rules.category_priority();
    let builds = requests
        .iter()
        .map(|request| {
            generate_bom_with_priority(request, catalog, rules, &priorities).map(|output| {
                BuildBom {
                    build_number: request.build_number.clone(),
                    output,
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total_items: usize = builds.iter().map(|build| build.output.total_items).sum();

    Ok(OrderBom {
        order_id: order.order_id.clone(),
        builds,
        total_items,
    })
}
