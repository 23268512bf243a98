//! Geolocation lookup history entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "geolocations")]
pub struct Model {
    /// Opaque record id (UUID v4), assigned on insert
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country_name: Option<String>,
    pub postal: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub timezone: Option<String>,
    /// Capture time, always assigned server-side
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
