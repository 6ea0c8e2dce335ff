use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::locations;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[diesel(table_name = locations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Location {
    pub id: i32,
    pub name: String,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub address: String,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

impl Location {
    /// `"{name} - {building} {room}"` with surrounding whitespace removed.
    pub fn display_name(&self) -> String {
        format!("{} - {} {}", self.name, self.building, self.room).trim().to_string()
    }
}

#[derive(Insertable)]
#[diesel(table_name = locations)]
pub struct NewLocation {
    pub name: String,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub address: String,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = locations)]
pub struct LocationChanges {
    pub name: String,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub address: String,
    pub description: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Deserialize, Serialize, TS, Debug, Clone, Default)]
#[serde(default)]
#[ts(export)]
pub struct LocationInput {
    pub name: String,
    pub building: String,
    pub floor: String,
    pub room: String,
    pub address: String,
    pub description: String,
}

#[derive(Serialize, TS, Debug, Clone)]
#[ts(export)]
pub struct LocationWithCount {
    #[serde(flatten)]
    pub location: Location,
    pub device_count: i64,
}
