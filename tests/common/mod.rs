//! Shared fixtures: a catalog covering every id of the shipped rule tables
//! and a representative two-basin build.
#![allow(dead_code)]

use std::path::PathBuf;

use sink_bom::{
    catalog::CatalogSnapshot,
    models::{
        AccessorySelection, AssemblyCatalogEntry, BasinAddon, BasinConfiguration, BasinType,
        BuildConfiguration, BuildRequest, FaucetConfiguration, PartCatalogEntry, SinkDimensions,
        SprayerConfiguration,
    },
    rules::RuleTables,
};

pub const CONTROL_BOXES: &[&str] = &[
    "T2-CTRL-EDR1",
    "T2-CTRL-ESK1",
    "T2-CTRL-EDR1-ESK1",
    "T2-CTRL-EDR2",
    "T2-CTRL-ESK2",
    "T2-CTRL-EDR3",
    "T2-CTRL-ESK3",
    "T2-CTRL-EDR1-ESK2",
    "T2-CTRL-EDR2-ESK1",
    "T2-CTRL-ESK-DI-UNIV",
];

pub fn rules_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/bom_rules.toml")
}

/// The rule tables shipped in `config/bom_rules.toml`.
pub fn rules() -> RuleTables {
    RuleTables::load(&rules_path()).expect("shipped rule tables load")
}

fn kit(
    id: &str,
    name: &str,
    parts: &[(&str, u32)],
    assemblies: &[(&str, u32)],
) -> AssemblyCatalogEntry {
    let mut assembly = AssemblyCatalogEntry::new(id, name);
    for (part, quantity) in parts {
        assembly = assembly.with_part(*part, *quantity);
    }
    for (sub, quantity) in assemblies {
        assembly = assembly.with_assembly(*sub, *quantity);
    }
    assembly
}

pub fn catalog_builder() -> sink_bom::catalog::CatalogSnapshotBuilder {
    let mut builder = CatalogSnapshot::builder();

    for (id, name) in [
        ("T2-BODY-FRAME-SS", "Stainless frame"),
        ("T2-SCREW-M6", "Screw M6"),
        ("T2-DRAIN-VALVE", "Drain valve"),
        ("T2-DI-FILTER", "DI filter cartridge"),
        ("T2-LED-STRIP", "Basin LED strip"),
        ("T2-DRAIN-BTN", "Drain button"),
        ("T2-LEG-27", "Leg 27in"),
        ("T2-LEG-14", "Leg 14in"),
        ("T2-LEG-LC1", "Leg column"),
        ("T2-CASTOR-475", "Leveling castor"),
        ("T2-SEISMIC-FOOT", "Seismic foot"),
        ("T2-PB-PERF", "Perforated pegboard"),
        ("T2-PB-PERF-GREEN", "Perforated pegboard, green"),
        ("T2-PB-SOLID", "Solid pegboard"),
        ("T2-FAUCET-WB", "Wrist blade faucet"),
        ("T2-FAUCET-PR", "Pre-rinse faucet"),
        ("T2-WATERGUN-DI", "DI water gun"),
        ("T2-AIRGUN", "Air gun"),
        ("T2-STD-MANUAL-EN", "Manual (EN)"),
        ("T2-STD-MANUAL-FR", "Manual (FR)"),
        ("T2-STD-MANUAL-SP", "Manual (SP)"),
        ("T2-OA-MS-1026", "Monitor shelf"),
    ] {
        builder = builder.part(PartCatalogEntry::new(id, name));
    }
    builder = builder
        .part(PartCatalogEntry::new("T2-PUMP-24V", "Drain pump 24V").serial_tracked())
        .part(
            PartCatalogEntry::new("T2-CTRL-PCB", "Controller board")
                .serial_tracked()
                .with_manufacturer("Acme Controls", Some("AC-7731".into())),
        )
        .part(PartCatalogEntry::new("T2-SEALANT", "Silicone sealant").batch_tracked())
        .part(PartCatalogEntry::new("T2-ENCLOSURE", "Control enclosure").mark_outsourced());

    builder = builder
        .assembly(kit("T2-HW-MOUNT", "Mounting hardware", &[("T2-SCREW-M6", 4)], &[]))
        .assembly(kit(
            "T2-BODY-48-60-HA",
            "Sink body 48-60",
            &[("T2-BODY-FRAME-SS", 1), ("T2-SEALANT", 1)],
            &[("T2-HW-MOUNT", 2)],
        ))
        .assembly(kit(
            "T2-BODY-61-72-HA",
            "Sink body 61-72",
            &[("T2-BODY-FRAME-SS", 1), ("T2-SEALANT", 1)],
            &[("T2-HW-MOUNT", 3)],
        ))
        .assembly(kit(
            "T2-BODY-73-120-HA",
            "Sink body 73-120",
            &[("T2-BODY-FRAME-SS", 2), ("T2-SEALANT", 2)],
            &[("T2-HW-MOUNT", 4)],
        ))
        .assembly(kit(
            "T2-BSN-EDR-KIT",
            "E-Drain basin kit",
            &[("T2-DRAIN-VALVE", 1)],
            &[("T2-HW-MOUNT", 1)],
        ))
        .assembly(kit(
            "T2-BSN-ESK-KIT",
            "E-Sink basin kit",
            &[("T2-PUMP-24V", 1), ("T2-DRAIN-VALVE", 1)],
            &[("T2-HW-MOUNT", 1)],
        ))
        .assembly(kit(
            "T2-BSN-ESK-DI-KIT",
            "E-Sink DI basin kit",
            &[("T2-PUMP-24V", 1), ("T2-DRAIN-VALVE", 1), ("T2-DI-FILTER", 1)],
            &[("T2-HW-MOUNT", 1)],
        ))
        .assembly(kit("T2-OA-BASIN-LIGHT-KIT", "Basin lighting", &[("T2-LED-STRIP", 1)], &[]))
        .assembly(kit(
            "T2-OA-BASIN-DRAIN-BTN-KIT",
            "Drain button",
            &[("T2-DRAIN-BTN", 1)],
            &[],
        ))
        .assembly(kit("T2-DL27-KIT", "Legs DL27", &[("T2-LEG-27", 4)], &[("T2-HW-MOUNT", 4)]))
        .assembly(kit("T2-DL14-KIT", "Legs DL14", &[("T2-LEG-14", 4)], &[("T2-HW-MOUNT", 4)]))
        .assembly(kit("T2-LC1-KIT", "Legs LC1", &[("T2-LEG-LC1", 2)], &[("T2-HW-MOUNT", 2)]))
        .assembly(kit("T2-LEVELING-CASTOR-475", "Castors", &[("T2-CASTOR-475", 4)], &[]))
        .assembly(kit("T2-SEISMIC-FEET", "Seismic feet", &[("T2-SEISMIC-FOOT", 4)], &[]))
        .assembly(kit(
            "T2-ADW-PB-PERF-KIT",
            "Perforated pegboard kit",
            &[("T2-PB-PERF", 1), ("T2-SCREW-M6", 8)],
            &[],
        ))
        .assembly(kit(
            "T2-ADW-PB-PERF-GREEN-KIT",
            "Perforated pegboard kit, green",
            &[("T2-PB-PERF-GREEN", 1), ("T2-SCREW-M6", 8)],
            &[],
        ))
        .assembly(kit(
            "T2-ADW-PB-SOLID-KIT",
            "Solid pegboard kit",
            &[("T2-PB-SOLID", 1), ("T2-SCREW-M6", 8)],
            &[],
        ))
        .assembly(kit(
            "T2-OA-STD-FAUCET-WB-KIT",
            "Wrist blade faucet kit",
            &[("T2-FAUCET-WB", 1), ("T2-SCREW-M6", 2)],
            &[],
        ))
        .assembly(kit(
            "T2-OA-PRE-RINSE-FAUCET-KIT",
            "Pre-rinse faucet kit",
            &[("T2-FAUCET-PR", 1), ("T2-SCREW-M6", 2)],
            &[],
        ))
        .assembly(kit("T2-OA-WATERGUN-DI-KIT", "DI water gun kit", &[("T2-WATERGUN-DI", 1)], &[]))
        .assembly(kit("T2-OA-AIRGUN-KIT", "Air gun kit", &[("T2-AIRGUN", 1)], &[]));

    for id in CONTROL_BOXES {
        builder = builder.assembly(
            kit(
                id,
                "Control box",
                &[("T2-CTRL-PCB", 1), ("T2-ENCLOSURE", 1), ("T2-SCREW-M6", 4)],
                &[],
            )
            .serial_tracked(),
        );
    }

    builder
}

pub fn catalog() -> CatalogSnapshot {
    catalog_builder().build().expect("fixture catalog is consistent")
}

pub fn basin(basin_type: BasinType, addons: Vec<BasinAddon>) -> BasinConfiguration {
    BasinConfiguration {
        basin_type,
        size_id: "20X20X8".into(),
        addons,
    }
}

/// Two basins (E-Drain with drain button, E-Sink with lighting), DL27 legs,
/// castors, perforated pegboard, one faucet, one DI water gun and two
/// monitor shelves.
pub fn sample_request() -> BuildRequest {
    BuildRequest {
        order_id: "ORD-1001".into(),
        build_number: "B-1".into(),
        customer_language: "EN".into(),
        configuration: BuildConfiguration {
            sink_model_id: "T2-B2".into(),
            dimensions: SinkDimensions {
                width: 30,
                length: 60,
            },
            legs_type_id: Some("DL27".into()),
            feet_type_id: Some("LEVELING_CASTOR_475".into()),
            has_pegboard: true,
            pegboard_type_id: Some("PERFORATED".into()),
            pegboard_color: None,
            basins: vec![
                basin(BasinType::EDrain, vec![BasinAddon::DrainButton]),
                basin(BasinType::ESink, vec![BasinAddon::Lighting]),
            ],
            faucets: vec![FaucetConfiguration {
                faucet_type_id: "WRIST_BLADE".into(),
                quantity: 1,
                placement: Some("center".into()),
            }],
            sprayers: vec![SprayerConfiguration {
                sprayer_type_id: "DI_WATER_GUN".into(),
                quantity: 1,
                location: Some("left".into()),
            }],
        },
        accessories: vec![AccessorySelection {
            catalog_id: "T2-OA-MS-1026".into(),
            quantity: 2,
        }],
    }
}

/// Request for a build with the given basins and the matching sink model.
pub fn request_with_basins(basins: Vec<BasinConfiguration>) -> BuildRequest {
    let mut request = sample_request();
    request.configuration.sink_model_id = format!("T2-B{}", basins.len());
    request.configuration.basins = basins;
    request
}
