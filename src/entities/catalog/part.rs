use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};

use crate::models::PartCatalogEntry;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_parts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub requires_serial: bool,
    pub requires_batch: bool,
    pub outsourced: bool,
    pub manufacturer_name: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
        }

        self.updated_at = ActiveValue::Set(now);

        Ok(self)
    }
}

impl From<Model> for PartCatalogEntry {
    fn from(model: Model) -> Self {
        let part = PartCatalogEntry {
            id: model.id,
            name: model.name,
            requires_serial: model.requires_serial,
            requires_batch: model.requires_batch,
            outsourced: model.outsourced,
            manufacturer: None,
        };

        match model.manufacturer_name {
            Some(name) => part.with_manufacturer(name, model.manufacturer_part_number),
            None => part,
        }
    }
}
