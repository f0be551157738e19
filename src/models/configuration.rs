use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use validator::{Validate, ValidationError};

/// Basin variants; the mix of basin types in a build decides the control box.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum BasinType {
    #[serde(rename = "E_DRAIN", alias = "E-Drain")]
    #[strum(serialize = "E_DRAIN")]
    EDrain,
    #[serde(rename = "E_SINK", alias = "E-Sink")]
    #[strum(serialize = "E_SINK")]
    ESink,
    #[serde(rename = "E_SINK_DI", alias = "E-Sink-DI")]
    #[strum(serialize = "E_SINK_DI")]
    ESinkDi,
}

/// Optional per-basin hardware.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
pub enum BasinAddon {
    #[serde(rename = "LIGHTING")]
    #[strum(serialize = "LIGHTING")]
    Lighting,
    #[serde(rename = "DRAIN_BUTTON")]
    #[strum(serialize = "DRAIN_BUTTON")]
    DrainButton,
}

/// Overall sink dimensions in inches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SinkDimensions {
    #[validate(range(min = 1, message = "Sink width must be positive"))]
    pub width: u32,
    #[validate(range(min = 1, message = "Sink length must be positive"))]
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BasinConfiguration {
    pub basin_type: BasinType,
    #[validate(custom = "validate_not_blank")]
    pub size_id: String,
    #[serde(default)]
    pub addons: Vec<BasinAddon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FaucetConfiguration {
    #[validate(custom = "validate_not_blank")]
    pub faucet_type_id: String,
    #[validate(range(min = 1, message = "Faucet quantity must be positive"))]
    pub quantity: u32,
    #[serde(default)]
    pub placement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SprayerConfiguration {
    #[validate(custom = "validate_not_blank")]
    pub sprayer_type_id: String,
    #[validate(range(min = 1, message = "Sprayer quantity must be positive"))]
    pub quantity: u32,
    #[serde(default)]
    pub location: Option<String>,
}

/// A catalog item ordered alongside the build, referenced directly by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AccessorySelection {
    #[validate(custom = "validate_not_blank")]
    pub catalog_id: String,
    #[validate(range(min = 1, message = "Accessory quantity must be positive"))]
    pub quantity: u32,
}

/// Selections for one build of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BuildConfiguration {
    pub sink_model_id: String,
    #[validate]
    pub dimensions: SinkDimensions,
    #[serde(default)]
    pub legs_type_id: Option<String>,
    #[serde(default)]
    pub feet_type_id: Option<String>,
    #[serde(default)]
    pub has_pegboard: bool,
    #[serde(default)]
    pub pegboard_type_id: Option<String>,
    #[serde(default)]
    pub pegboard_color: Option<String>,
    #[serde(default)]
    pub basins: Vec<BasinConfiguration>,
    #[serde(default)]
    pub faucets: Vec<FaucetConfiguration>,
    #[serde(default)]
    pub sprayers: Vec<SprayerConfiguration>,
}

/// Everything needed to generate the BOM of a single build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub order_id: String,
    pub build_number: String,
    pub customer_language: String,
    pub configuration: BuildConfiguration,
    #[serde(default)]
    pub accessories: Vec<AccessorySelection>,
}

/// Order-level envelope as captured at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub order_id: String,
    pub customer_language: String,
    pub build_numbers: Vec<String>,
    pub configurations: BTreeMap<String, BuildConfiguration>,
    #[serde(default)]
    pub accessories: BTreeMap<String, Vec<AccessorySelection>>,
}

/// Basin counts per type for one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BasinComposition {
    pub e_drain: u32,
    pub e_sink: u32,
    pub e_sink_di: u32,
}

impl BasinComposition {
    pub fn from_basins(basins: &[BasinConfiguration]) -> Self {
        basins
            .iter()
            .fold(Self::default(), |mut composition, basin| {
                *composition.count_mut(basin.basin_type) += 1;
                composition
            })
    }

    pub fn count(&self, basin_type: BasinType) -> u32 {
        match basin_type {
            BasinType::EDrain => self.e_drain,
            BasinType::ESink => self.e_sink,
            BasinType::ESinkDi => self.e_sink_di,
        }
    }

    fn count_mut(&mut self, basin_type: BasinType) -> &mut u32 {
        match basin_type {
            BasinType::EDrain => &mut self.e_drain,
            BasinType::ESink => &mut self.e_sink,
            BasinType::ESinkDi => &mut self.e_sink_di,
        }
    }

    pub fn total(&self) -> u32 {
        self.e_drain + self.e_sink + self.e_sink_di
    }
}

impl fmt::Display for BasinComposition {
    /// Renders as `{E_DRAIN:1, E_SINK:1}`, omitting absent types.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = BasinType::iter()
            .filter(|basin_type| self.count(*basin_type) > 0)
            .map(|basin_type| format!("{}:{}", basin_type, self.count(basin_type)))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
