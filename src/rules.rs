//! Mapping tables that turn configuration values into catalog ids.
//!
//! The tables are data, loaded at startup from a TOML or JSON file, so that
//! catalog and kit changes ship without a rebuild. Every lookup fails closed:
//! a missing mapping is a [`BomError::MappingNotFound`], never a default.

use crate::{
    bom::aggregator::CategoryPriority,
    errors::{BomError, ServiceError},
    models::{BasinAddon, BasinComposition, BasinType, StructuralRole},
};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkModelRule {
    pub model_id: String,
    pub basin_count: u32,
}

/// Inclusive sink length range (inches) served by one body assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkBodyRule {
    pub min_length: u32,
    pub max_length: u32,
    pub assembly_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitMapping {
    pub type_id: String,
    pub assembly_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PegboardRule {
    pub pegboard_type: String,
    #[serde(default)]
    pub color: Option<String>,
    pub assembly_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasinKitRule {
    pub basin_type: BasinType,
    pub size_id: String,
    pub assembly_id: String,
}

/// Add-on kit, either specific to one basin type or generic when
/// `basin_type` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasinAddonRule {
    pub addon: BasinAddon,
    #[serde(default)]
    pub basin_type: Option<BasinType>,
    pub assembly_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualRule {
    pub language: String,
    pub part_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlBoxRuleKind {
    /// Matches one basin composition exactly; absent counts are zero.
    Exact,
    /// Matches when any basin of the listed types is present.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBoxRule {
    pub control_box_id: String,
    pub kind: ControlBoxRuleKind,
    #[serde(default)]
    pub e_drain: u32,
    #[serde(default)]
    pub e_sink: u32,
    #[serde(default)]
    pub e_sink_di: u32,
    #[serde(default)]
    pub any_of: Vec<BasinType>,
    #[serde(default)]
    pub max_basins: Option<u32>,
    /// Lower wins among matching fallbacks.
    #[serde(default)]
    pub priority: u32,
}

impl ControlBoxRule {
    fn composition(&self) -> BasinComposition {
        BasinComposition {
            e_drain: self.e_drain,
            e_sink: self.e_sink,
            e_sink_di: self.e_sink_di,
        }
    }

    fn matches(&self, composition: &BasinComposition) -> bool {
        match self.kind {
            ControlBoxRuleKind::Exact => self.composition() == *composition,
            ControlBoxRuleKind::Fallback => {
                self.any_of
                    .iter()
                    .any(|basin_type| composition.count(*basin_type) > 0)
                    && self
                        .max_basins
                        .map_or(true, |max| composition.total() <= max)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTables {
    #[serde(default)]
    pub category_priority: Option<Vec<StructuralRole>>,
    #[serde(default)]
    pub sink_models: Vec<SinkModelRule>,
    #[serde(default)]
    pub sink_bodies: Vec<SinkBodyRule>,
    #[serde(default)]
    pub legs: Vec<KitMapping>,
    #[serde(default)]
    pub feet: Vec<KitMapping>,
    #[serde(default)]
    pub pegboards: Vec<PegboardRule>,
    #[serde(default)]
    pub basins: Vec<BasinKitRule>,
    #[serde(default)]
    pub basin_addons: Vec<BasinAddonRule>,
    #[serde(default)]
    pub faucets: Vec<KitMapping>,
    #[serde(default)]
    pub sprayers: Vec<KitMapping>,
    #[serde(default)]
    pub manuals: Vec<ManualRule>,
    #[serde(default)]
    pub control_boxes: Vec<ControlBoxRule>,
}

impl RuleTables {
    /// Loads the tables from a file; the format follows the extension.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let tables: RuleTables = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        tables.validate()?;

        info!(
            path = %path.display(),
            control_boxes = tables.control_boxes.len(),
            basins = tables.basins.len(),
            "BOM rule tables loaded"
        );
        Ok(tables)
    }

    pub fn from_str(content: &str, format: FileFormat) -> Result<Self, ServiceError> {
        let tables: RuleTables = Config::builder()
            .add_source(File::from_str(content, format))
            .build()?
            .try_deserialize()?;
        tables.validate()?;
        Ok(tables)
    }

    /// Structural checks that keep every lookup unambiguous.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let invalid = |message: String| ServiceError::ValidationError(format!("BOM rules: {message}"));

        for body in &self.sink_bodies {
            if body.min_length > body.max_length {
                return Err(invalid(format!(
                    "sink body {} has min_length {} above max_length {}",
                    body.assembly_id, body.min_length, body.max_length
                )));
            }
        }
        for (i, a) in self.sink_bodies.iter().enumerate() {
            for b in &self.sink_bodies[i + 1..] {
                if a.min_length <= b.max_length && b.min_length <= a.max_length {
                    return Err(invalid(format!(
                        "sink body ranges of {} and {} overlap",
                        a.assembly_id, b.assembly_id
                    )));
                }
            }
        }

        for (table, mappings) in [
            ("legs", &self.legs),
            ("feet", &self.feet),
            ("faucets", &self.faucets),
            ("sprayers", &self.sprayers),
        ] {
            ensure_unique(table, mappings.iter().map(|m| m.type_id.clone())).map_err(invalid)?;
        }
        ensure_unique(
            "sink_models",
            self.sink_models.iter().map(|m| m.model_id.clone()),
        )
        .map_err(invalid)?;
        ensure_unique(
            "pegboards",
            self.pegboards
                .iter()
                .map(|p| pegboard_key(&p.pegboard_type, p.color.as_deref())),
        )
        .map_err(invalid)?;
        ensure_unique(
            "basins",
            self.basins
                .iter()
                .map(|b| format!("{}/{}", b.basin_type, b.size_id)),
        )
        .map_err(invalid)?;
        ensure_unique(
            "basin_addons",
            self.basin_addons.iter().map(|a| match a.basin_type {
                Some(basin_type) => format!("{}/{}", a.addon, basin_type),
                None => a.addon.to_string(),
            }),
        )
        .map_err(invalid)?;
        ensure_unique(
            "manuals",
            self.manuals.iter().map(|m| m.language.to_ascii_uppercase()),
        )
        .map_err(invalid)?;
        ensure_unique(
            "control_boxes",
            self.control_boxes
                .iter()
                .filter(|rule| rule.kind == ControlBoxRuleKind::Exact)
                .map(|rule| rule.composition().to_string()),
        )
        .map_err(invalid)?;

        for rule in &self.control_boxes {
            if rule.kind == ControlBoxRuleKind::Fallback && rule.any_of.is_empty() {
                return Err(invalid(format!(
                    "fallback control box {} lists no basin types",
                    rule.control_box_id
                )));
            }
            if rule.kind == ControlBoxRuleKind::Exact && rule.composition().total() == 0 {
                return Err(invalid(format!(
                    "exact control box {} matches an empty composition",
                    rule.control_box_id
                )));
            }
        }

        Ok(())
    }

    pub fn category_priority(&self) -> CategoryPriority {
        self.category_priority
            .clone()
            .map(CategoryPriority::new)
            .unwrap_or_default()
    }

    /// Declared basin count of a sink model.
    pub fn sink_model_basin_count(&self, model_id: &str) -> Result<u32, BomError> {
        self.sink_models
            .iter()
            .find(|model| model.model_id == model_id)
            .map(|model| model.basin_count)
            .ok_or_else(|| BomError::mapping("sink_models", model_id))
    }

    pub fn sink_body(&self, length: u32) -> Result<&str, BomError> {
        self.sink_bodies
            .iter()
            .find(|body| body.min_length <= length && length <= body.max_length)
            .map(|body| body.assembly_id.as_str())
            .ok_or_else(|| BomError::mapping("sink_bodies", length.to_string()))
    }

    pub fn legs_kit(&self, type_id: &str) -> Result<&str, BomError> {
        lookup_kit("legs", &self.legs, type_id)
    }

    pub fn feet_kit(&self, type_id: &str) -> Result<&str, BomError> {
        lookup_kit("feet", &self.feet, type_id)
    }

    pub fn faucet_kit(&self, type_id: &str) -> Result<&str, BomError> {
        lookup_kit("faucets", &self.faucets, type_id)
    }

    pub fn sprayer_kit(&self, type_id: &str) -> Result<&str, BomError> {
        lookup_kit("sprayers", &self.sprayers, type_id)
    }

    pub fn pegboard_kit(&self, pegboard_type: &str, color: Option<&str>) -> Result<&str, BomError> {
        self.pegboards
            .iter()
            .find(|rule| rule.pegboard_type == pegboard_type && rule.color.as_deref() == color)
            .map(|rule| rule.assembly_id.as_str())
            .ok_or_else(|| BomError::mapping("pegboards", pegboard_key(pegboard_type, color)))
    }

    pub fn basin_kit(&self, basin_type: BasinType, size_id: &str) -> Result<&str, BomError> {
        self.basins
            .iter()
            .find(|rule| rule.basin_type == basin_type && rule.size_id == size_id)
            .map(|rule| rule.assembly_id.as_str())
            .ok_or_else(|| BomError::mapping("basins", format!("{basin_type}/{size_id}")))
    }

    /// Type-specific add-on kits win over generic ones.
    pub fn basin_addon_kit(&self, addon: BasinAddon, basin_type: BasinType) -> Result<&str, BomError> {
        let candidates = || self.basin_addons.iter().filter(|rule| rule.addon == addon);

        candidates()
            .find(|rule| rule.basin_type == Some(basin_type))
            .or_else(|| candidates().find(|rule| rule.basin_type.is_none()))
            .map(|rule| rule.assembly_id.as_str())
            .ok_or_else(|| BomError::mapping("basin_addons", format!("{addon}/{basin_type}")))
    }

    pub fn manual(&self, language: &str) -> Result<&str, BomError> {
        self.manuals
            .iter()
            .find(|rule| rule.language.eq_ignore_ascii_case(language.trim()))
            .map(|rule| rule.part_id.as_str())
            .ok_or_else(|| BomError::mapping("manuals", language))
    }

    /// Exact composition rules are consulted first, in table order. Without
    /// an exact match the matching fallback with the lowest priority wins,
    /// ties broken by table order.
    pub fn control_box(&self, composition: &BasinComposition) -> Result<&ControlBoxRule, BomError> {
        if let Some(rule) = self
            .control_boxes
            .iter()
            .filter(|rule| rule.kind == ControlBoxRuleKind::Exact)
            .find(|rule| rule.matches(composition))
        {
            return Ok(rule);
        }

        self.control_boxes
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.kind == ControlBoxRuleKind::Fallback && rule.matches(composition))
            .min_by_key(|(position, rule)| (rule.priority, *position))
            .map(|(_, rule)| rule)
            .ok_or_else(|| BomError::mapping("control_boxes", composition.to_string()))
    }
}

fn lookup_kit<'a>(
    table: &'static str,
    mappings: &'a [KitMapping],
    type_id: &str,
) -> Result<&'a str, BomError> {
    mappings
        .iter()
        .find(|mapping| mapping.type_id == type_id)
        .map(|mapping| mapping.assembly_id.as_str())
        .ok_or_else(|| BomError::mapping(table, type_id))
}

fn pegboard_key(pegboard_type: &str, color: Option<&str>) -> String {
    match color {
        Some(color) => format!("{pegboard_type}/{color}"),
        None => pegboard_type.to_string(),
    }
}

fn ensure_unique(table: &str, keys: impl Iterator<Item = String>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            return Err(format!("duplicate {table} entry '{key}'"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const RULES: &str = r#"
        [[sink_bodies]]
        min_length = 48
        max_length = 60
        assembly_id = "T2-BODY-48-60-HA"

        [[sink_bodies]]
        min_length = 61
        max_length = 72
        assembly_id = "T2-BODY-61-72-HA"

        [[legs]]
        type_id = "DL27"
        assembly_id = "T2-DL27-KIT"

        [[pegboards]]
        pegboard_type = "PERFORATED"
        assembly_id = "T2-ADW-PB-PERF-KIT"

        [[pegboards]]
        pegboard_type = "PERFORATED"
        color = "BLUE"
        assembly_id = "T2-ADW-PB-PERF-BLUE-KIT"

        [[basin_addons]]
        addon = "LIGHTING"
        assembly_id = "T2-OA-BASIN-LIGHT-KIT"

        [[basin_addons]]
        addon = "LIGHTING"
        basin_type = "E_DRAIN"
        assembly_id = "T2-OA-BASIN-LIGHT-EDR-KIT"

        [[manuals]]
        language = "EN"
        part_id = "T2-STD-MANUAL-EN"

        [[control_boxes]]
        control_box_id = "T2-CTRL-EDR1-ESK1"
        kind = "exact"
        e_drain = 1
        e_sink = 1

        [[control_boxes]]
        control_box_id = "T2-CTRL-EDR1"
        kind = "exact"
        e_drain = 1

        [[control_boxes]]
        control_box_id = "T2-CTRL-ESK-GENERIC"
        kind = "fallback"
        any_of = ["E_SINK", "E_SINK_DI"]
        priority = 20

        [[control_boxes]]
        control_box_id = "T2-CTRL-ESK-SMALL"
        kind = "fallback"
        any_of = ["E_SINK", "E_SINK_DI"]
        max_basins = 2
        priority = 10
    "#;

    fn rules() -> RuleTables {
        RuleTables::from_str(RULES, FileFormat::Toml).unwrap()
    }

    #[test]
    fn exact_composition_wins_over_fallback() {
        let composition = BasinComposition {
            e_drain: 1,
            e_sink: 1,
            e_sink_di: 0,
        };
        let tables = rules();
        let rule = tables.control_box(&composition).unwrap();
        assert_eq!(rule.control_box_id, "T2-CTRL-EDR1-ESK1");
    }

    #[test]
    fn fallback_priority_and_basin_limit() {
        let tables = rules();
        let two_sinks = BasinComposition {
            e_drain: 0,
            e_sink: 1,
            e_sink_di: 1,
        };
        assert_eq!(
            tables.control_box(&two_sinks).unwrap().control_box_id,
            "T2-CTRL-ESK-SMALL"
        );

        let three_sinks = BasinComposition {
            e_drain: 0,
            e_sink: 3,
            e_sink_di: 0,
        };
        assert_eq!(
            tables.control_box(&three_sinks).unwrap().control_box_id,
            "T2-CTRL-ESK-GENERIC"
        );
    }

    #[test]
    fn unmatched_composition_fails_closed() {
        let composition = BasinComposition {
            e_drain: 2,
            e_sink: 0,
            e_sink_di: 0,
        };
        assert_matches!(
            rules().control_box(&composition),
            Err(BomError::MappingNotFound { table: "control_boxes", key }) if key == "{E_DRAIN:2}"
        );
    }

    #[test]
    fn lookups_name_the_missing_key() {
        let tables = rules();
        assert_eq!(tables.sink_body(60).unwrap(), "T2-BODY-48-60-HA");
        assert_eq!(tables.sink_body(61).unwrap(), "T2-BODY-61-72-HA");
        assert_matches!(
            tables.sink_body(130),
            Err(BomError::MappingNotFound { table: "sink_bodies", key }) if key == "130"
        );
        assert_matches!(
            tables.legs_kit("DL14"),
            Err(BomError::MappingNotFound { table: "legs", key }) if key == "DL14"
        );
        assert_matches!(
            tables.feet_kit("SEISMIC"),
            Err(BomError::MappingNotFound { table: "feet", .. })
        );
    }

    #[test]
    fn pegboard_color_is_part_of_the_key() {
        let tables = rules();
        assert_eq!(
            tables.pegboard_kit("PERFORATED", None).unwrap(),
            "T2-ADW-PB-PERF-KIT"
        );
        assert_eq!(
            tables.pegboard_kit("PERFORATED", Some("BLUE")).unwrap(),
            "T2-ADW-PB-PERF-BLUE-KIT"
        );
        assert_matches!(
            tables.pegboard_kit("PERFORATED", Some("GREEN")),
            Err(BomError::MappingNotFound { key, .. }) if key == "PERFORATED/GREEN"
        );
    }

    #[test]
    fn basin_specific_addon_beats_generic() {
        let tables = rules();
        assert_eq!(
            tables
                .basin_addon_kit(BasinAddon::Lighting, BasinType::EDrain)
                .unwrap(),
            "T2-OA-BASIN-LIGHT-EDR-KIT"
        );
        assert_eq!(
            tables
                .basin_addon_kit(BasinAddon::Lighting, BasinType::ESink)
                .unwrap(),
            "T2-OA-BASIN-LIGHT-KIT"
        );
        assert!(tables
            .basin_addon_kit(BasinAddon::DrainButton, BasinType::ESink)
            .is_err());
    }

    #[test]
    fn manual_language_is_case_insensitive() {
        assert_eq!(rules().manual("en").unwrap(), "T2-STD-MANUAL-EN");
        assert!(rules().manual("FR").is_err());
    }

    #[test]
    fn overlapping_body_ranges_are_rejected() {
        let content = r#"
            [[sink_bodies]]
            min_length = 48
            max_length = 60
            assembly_id = "A"

            [[sink_bodies]]
            min_length = 60
            max_length = 72
            assembly_id = "B"
        "#;
        assert_matches!(
            RuleTables::from_str(content, FileFormat::Toml),
            Err(ServiceError::ValidationError(message)) if message.contains("overlap")
        );
    }

    #[test]
    fn duplicate_exact_compositions_are_rejected() {
        let content = r#"
            [[control_boxes]]
            control_box_id = "A"
            kind = "exact"
            e_sink = 1

            [[control_boxes]]
            control_box_id = "B"
            kind = "exact"
            e_sink = 1
        "#;
        assert!(RuleTables::from_str(content, FileFormat::Toml).is_err());
    }

    #[test]
    fn load_reads_tables_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(RULES.as_bytes()).unwrap();

        let tables = RuleTables::load(file.path()).unwrap();
        assert_eq!(tables.control_boxes.len(), 4);
        assert_eq!(tables.legs_kit("DL27").unwrap(), "T2-DL27-KIT");
    }
}
