use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::network_devices;

/// Network-specific fields of a device. Doubles as the API input for the
/// `network-devices` collection.
#[derive(
    Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, Default, PartialEq, Serialize,
    Deserialize, TS,
)]
#[diesel(table_name = network_devices)]
#[diesel(primary_key(device_id))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(default)]
#[ts(export)]
pub struct NetworkDevice {
    #[serde(skip)]
    pub device_id: i32,
    pub ip_address: Option<String>,
    pub mac_address: String,
    pub hostname: String,
    pub network_segment: String,
    pub is_managed: bool,
    pub management_ip: Option<String>,
}
