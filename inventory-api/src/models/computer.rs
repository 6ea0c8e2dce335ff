use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::choices::ComputerType;
use crate::schema::computers;

#[derive(
    Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, Default, PartialEq, Serialize,
    Deserialize, TS,
)]
#[diesel(table_name = computers)]
#[diesel(primary_key(device_id))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(default)]
#[ts(export)]
pub struct Computer {
    #[serde(skip)]
    pub device_id: i32,
    pub computer_type: ComputerType,
    pub operating_system: String,
    pub os_version: String,
    pub processor: String,
    pub memory_gb: Option<i32>,
    pub storage_gb: Option<i32>,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub mac_address: String,
    pub domain_joined: bool,
    pub domain_name: String,
}
