use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    pub name: String,
    pub part_number: Option<String>,
}

/// A leaf purchasable or stocked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartCatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requires_serial: bool,
    #[serde(default)]
    pub requires_batch: bool,
    #[serde(default)]
    pub outsourced: bool,
    #[serde(default)]
    pub manufacturer: Option<Manufacturer>,
}

impl PartCatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            requires_serial: false,
            requires_batch: false,
            outsourced: false,
            manufacturer: None,
        }
    }

    pub fn serial_tracked(mut self) -> Self {
        self.requires_serial = true;
        self
    }

    pub fn batch_tracked(mut self) -> Self {
        self.requires_batch = true;
        self
    }

    pub fn mark_outsourced(mut self) -> Self {
        self.outsourced = true;
        self
    }

    pub fn with_manufacturer(
        mut self,
        name: impl Into<String>,
        part_number: Option<String>,
    ) -> Self {
        self.manufacturer = Some(Manufacturer {
            name: name.into(),
            part_number,
        });
        self
    }
}

/// One declared line of an assembly. Exactly one of the two child ids is
/// expected to be set; anything else is a catalog defect reported by the
/// expander.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentLink {
    #[serde(default)]
    pub child_part_id: Option<String>,
    #[serde(default)]
    pub child_assembly_id: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// What a component link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    Part(&'a str),
    Assembly(&'a str),
    Unset,
    Both { part: &'a str, assembly: &'a str },
}

impl ComponentLink {
    pub fn part(id: impl Into<String>, quantity: u32) -> Self {
        Self {
            child_part_id: Some(id.into()),
            child_assembly_id: None,
            quantity,
            notes: None,
        }
    }

    pub fn assembly(id: impl Into<String>, quantity: u32) -> Self {
        Self {
            child_part_id: None,
            child_assembly_id: Some(id.into()),
            quantity,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Blank ids count as unset.
    pub fn target(&self) -> LinkTarget<'_> {
        let part = self
            .child_part_id
            .as_deref()
            .filter(|id| !id.trim().is_empty());
        let assembly = self
            .child_assembly_id
            .as_deref()
            .filter(|id| !id.trim().is_empty());

        match (part, assembly) {
            (Some(part), None) => LinkTarget::Part(part),
            (None, Some(assembly)) => LinkTarget::Assembly(assembly),
            (None, None) => LinkTarget::Unset,
            (Some(part), Some(assembly)) => LinkTarget::Both { part, assembly },
        }
    }
}

/// A composite item built from parts and other assemblies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyCatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requires_serial: bool,
    #[serde(default)]
    pub outsourced: bool,
    /// Declared components, in catalog order.
    #[serde(default)]
    pub components: Vec<ComponentLink>,
}

impl AssemblyCatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            requires_serial: false,
            outsourced: false,
            components: Vec::new(),
        }
    }

    pub fn with_part(self, id: impl Into<String>, quantity: u32) -> Self {
        self.with_link(ComponentLink::part(id, quantity))
    }

    pub fn with_assembly(self, id: impl Into<String>, quantity: u32) -> Self {
        self.with_link(ComponentLink::assembly(id, quantity))
    }

    pub fn with_link(mut self, link: ComponentLink) -> Self {
        self.components.push(link);
        self
    }

    pub fn serial_tracked(mut self) -> Self {
        self.requires_serial = true;
        self
    }
}

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
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemKind {
    Part,
    Assembly,
}

/// A resolved catalog lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogItem<'a> {
    Part(&'a PartCatalogEntry),
    Assembly(&'a AssemblyCatalogEntry),
}

impl<'a> CatalogItem<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            CatalogItem::Part(part) => &part.id,
            CatalogItem::Assembly(assembly) => &assembly.id,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            CatalogItem::Part(part) => &part.name,
            CatalogItem::Assembly(assembly) => &assembly.name,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match *self {
            CatalogItem::Part(_) => ItemKind::Part,
            CatalogItem::Assembly(_) => ItemKind::Assembly,
        }
    }

    pub fn requires_serial(&self) -> bool {
        match *self {
            CatalogItem::Part(part) => part.requires_serial,
            CatalogItem::Assembly(assembly) => assembly.requires_serial,
        }
    }

    pub fn requires_batch(&self) -> bool {
        match *self {
            CatalogItem::Part(part) => part.requires_batch,
            CatalogItem::Assembly(_) => false,
        }
    }

    pub fn outsourced(&self) -> bool {
        match *self {
            CatalogItem::Part(part) => part.outsourced,
            CatalogItem::Assembly(assembly) => assembly.outsourced,
        }
    }
}
