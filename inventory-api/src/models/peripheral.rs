use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::choices::PeripheralType;
use crate::schema::peripherals;

#[derive(
    Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, Default, PartialEq, Serialize,
    Deserialize, TS,
)]
#[diesel(table_name = peripherals)]
#[diesel(primary_key(device_id))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(default)]
#[ts(export)]
pub struct Peripheral {
    #[serde(skip)]
    pub device_id: i32,
    pub peripheral_type: PeripheralType,
    /// Must reference a computer.
    pub connected_to_id: Option<i32>,
}
