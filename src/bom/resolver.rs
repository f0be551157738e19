//! Configuration resolution: turns one build's selections into the root
//! selections the expander starts from.

use crate::{
    errors::BomError,
    models::{BasinComposition, BuildRequest, OrderRequest, StructuralRole},
    rules::RuleTables,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// One top-level catalog item implied by the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSelection {
    pub role: StructuralRole,
    pub id: String,
    pub quantity: u32,
    /// Human-readable origin, e.g. "basin 2" or "faucet 1".
    pub label: String,
}

impl RootSelection {
    pub fn new(
        role: StructuralRole,
        id: impl Into<String>,
        quantity: u32,
        label: impl Into<String>,
    ) -> Self {
        Self {
            role,
            id: id.into(),
            quantity,
            label: label.into(),
        }
    }
}

/// Rejects incomplete or inconsistent build requests before any catalog
/// access.
pub fn validate_build_request(request: &BuildRequest, rules: &RuleTables) -> Result<(), BomError> {
    require("order id", &request.order_id)?;
    require("build number", &request.build_number)?;
    require("customer language", &request.customer_language)?;

    let configuration = &request.configuration;
    require("sink model", &configuration.sink_model_id)?;
    if configuration.basins.is_empty() {
        return Err(BomError::validation(format!(
            "build {} has no basins; at least one basin is required",
            request.build_number
        )));
    }

    configuration
        .validate()
        .map_err(|err| BomError::validation(err.to_string()))?;
    for basin in &configuration.basins {
        basin
            .validate()
            .map_err(|err| BomError::validation(err.to_string()))?;
    }
    for faucet in &configuration.faucets {
        faucet
            .validate()
            .map_err(|err| BomError::validation(err.to_string()))?;
    }
    for sprayer in &configuration.sprayers {
        sprayer
            .validate()
            .map_err(|err| BomError::validation(err.to_string()))?;
    }
    for accessory in &request.accessories {
        accessory
            .validate()
            .map_err(|err| BomError::validation(err.to_string()))?;
    }

    if configuration.has_pegboard && non_blank(configuration.pegboard_type_id.as_deref()).is_none()
    {
        return Err(BomError::validation(
            "pegboard type is required when a pegboard is selected",
        ));
    }
    for (field, value) in [
        ("legs type", &configuration.legs_type_id),
        ("feet type", &configuration.feet_type_id),
    ] {
        if let Some(value) = value {
            require(field, value)?;
        }
    }

    let expected = rules.sink_model_basin_count(configuration.sink_model_id.trim())?;
    let actual = configuration.basins.len();
    if actual != expected as usize {
        return Err(BomError::validation(format!(
            "sink model {} takes {expected} basin(s), configuration has {actual}",
            configuration.sink_model_id
        )));
    }

    Ok(())
}

/// Maps a validated build request onto root selections, in build order:
/// sink body, basins with their add-ons, legs, feet, pegboard, faucets,
/// sprayers, control box, accessories, manual.
pub fn resolve_roots(
    request: &BuildRequest,
    rules: &RuleTables,
) -> Result<Vec<RootSelection>, BomError> {
    let configuration = &request.configuration;
    let mut roots = Vec::new();

    roots.push(RootSelection::new(
        StructuralRole::SinkBody,
        rules.sink_body(configuration.dimensions.length)?,
        1,
        "sink body",
    ));

    for (index, basin) in configuration.basins.iter().enumerate() {
        let label = format!("basin {}", index + 1);
        roots.push(RootSelection::new(
            StructuralRole::Basin,
            rules.basin_kit(basin.basin_type, basin.size_id.trim())?,
            1,
            label.clone(),
        ));
        for addon in &basin.addons {
            roots.push(RootSelection::new(
                StructuralRole::BasinAddon,
                rules.basin_addon_kit(*addon, basin.basin_type)?,
                1,
                label.clone(),
            ));
        }
    }

    if let Some(legs) = non_blank(configuration.legs_type_id.as_deref()) {
        roots.push(RootSelection::new(
            StructuralRole::Legs,
            rules.legs_kit(legs)?,
            1,
            "legs",
        ));
    }
    if let Some(feet) = non_blank(configuration.feet_type_id.as_deref()) {
        roots.push(RootSelection::new(
            StructuralRole::Feet,
            rules.feet_kit(feet)?,
            1,
            "feet",
        ));
    }

    if configuration.has_pegboard {
        let pegboard_type = non_blank(configuration.pegboard_type_id.as_deref()).ok_or_else(|| {
            BomError::validation("pegboard type is required when a pegboard is selected")
        })?;
        roots.push(RootSelection::new(
            StructuralRole::Pegboard,
            rules.pegboard_kit(
                pegboard_type,
                non_blank(configuration.pegboard_color.as_deref()),
            )?,
            1,
            "pegboard",
        ));
    }

    for (index, faucet) in configuration.faucets.iter().enumerate() {
        roots.push(RootSelection::new(
            StructuralRole::Faucet,
            rules.faucet_kit(faucet.faucet_type_id.trim())?,
            faucet.quantity,
            format!("faucet {}", index + 1),
        ));
    }
    for (index, sprayer) in configuration.sprayers.iter().enumerate() {
        roots.push(RootSelection::new(
            StructuralRole::Sprayer,
            rules.sprayer_kit(sprayer.sprayer_type_id.trim())?,
            sprayer.quantity,
            format!("sprayer {}", index + 1),
        ));
    }

    let composition = BasinComposition::from_basins(&configuration.basins);
    let control_box = rules.control_box(&composition)?;
    roots.push(RootSelection::new(
        StructuralRole::ControlBox,
        control_box.control_box_id.as_str(),
        1,
        "control box",
    ));

    for (index, accessory) in request.accessories.iter().enumerate() {
        roots.push(RootSelection::new(
            StructuralRole::Accessory,
            accessory.catalog_id.trim(),
            accessory.quantity,
            format!("accessory {}", index + 1),
        ));
    }

    roots.push(RootSelection::new(
        StructuralRole::Manual,
        rules.manual(&request.customer_language)?,
        1,
        "manual",
    ));

    Ok(roots)
}

/// Splits an order into per-build requests, in the order's build order.
pub fn split_order(order: &OrderRequest) -> Result<Vec<BuildRequest>, BomError> {
    require("order id", &order.order_id)?;
    require("customer language", &order.customer_language)?;
    if order.build_numbers.is_empty() {
        return Err(BomError::validation(format!(
            "order {} lists no builds",
            order.order_id
        )));
    }

    let mut seen = HashSet::new();
    for build_number in &order.build_numbers {
        require("build number", build_number)?;
        if !seen.insert(build_number.as_str()) {
            return Err(BomError::validation(format!(
                "build number {build_number} is listed twice"
            )));
        }
    }
    if let Some(stray) = order
        .configurations
        .keys()
        .find(|build_number| !seen.contains(build_number.as_str()))
    {
        return Err(BomError::validation(format!(
            "configuration given for unlisted build {stray}"
        )));
    }

    order
        .build_numbers
        .iter()
        .map(|build_number| {
            let configuration = order.configurations.get(build_number).ok_or_else(|| {
                BomError::validation(format!("build {build_number} has no configuration"))
            })?;
            Ok(BuildRequest {
                order_id: order.order_id.clone(),
                build_number: build_number.clone(),
                customer_language: order.customer_language.clone(),
                configuration: configuration.clone(),
                accessories: order
                    .accessories
                    .get(build_number)
                    .cloned()
                    .unwrap_or_default(),
            })
        })
        .collect()
}

fn require(field: &str, value: &str) -> Result<(), BomError> {
    if value.trim().is_empty() {
        return Err(BomError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
