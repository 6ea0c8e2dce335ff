use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::vendors;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[diesel(table_name = vendors)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Vendor {
    pub id: i32,
    pub name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = vendors)]
pub struct NewVendor {
    pub name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = vendors)]
pub struct VendorChanges {
    pub name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Deserialize, Serialize, TS, Debug, Clone, Default)]
#[serde(default)]
#[ts(export)]
pub struct VendorInput {
    pub name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
}

#[derive(Serialize, TS, Debug, Clone)]
#[ts(export)]
pub struct VendorWithCount {
    #[serde(flatten)]
    pub vendor: Vendor,
    pub device_count: i64,
}
