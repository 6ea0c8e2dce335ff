//! Global search across devices, software and locations.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::error::InventoryError;
use crate::models::{DeviceView, Device, Location, Software, SoftwareView};
use crate::orm::device::device_views;
use crate::orm::software::software_views;
use crate::query::contains_pattern;
use crate::schema::{devices, locations, software};

pub const DEVICE_LIMIT: i64 = 10;
pub const SOFTWARE_LIMIT: i64 = 10;
pub const LOCATION_LIMIT: i64 = 5;

#[derive(Serialize, Debug, Clone, Default)]
pub struct SearchResults {
    pub query: String,
    pub devices: Vec<DeviceView>,
    pub software: Vec<SoftwareView>,
    pub locations: Vec<Location>,
}

/// Case-insensitive substring search. A blank query matches nothing.
pub fn global_search(
    conn: &mut SqliteConnection,
    q: &str,
    now: NaiveDateTime,
) -> Result<SearchResults, InventoryError> {
    let q = q.trim();
    if q.is_empty() {
        return Ok(SearchResults::default());
    }
    let pattern = contains_pattern(q);

    let device_rows = devices::table
        .filter(
            devices::asset_tag
                .like(pattern.clone())
                .escape('\\')
                .or(devices::serial_number.like(pattern.clone()).escape('\\'))
                .or(devices::model.like(pattern.clone()).escape('\\'))
                .or(devices::notes.like(pattern.clone()).escape('\\')),
        )
        .order((devices::asset_tag.asc(), devices::id.asc()))
        .limit(DEVICE_LIMIT)
        .select(Device::as_select())
        .load(conn)?;

    let software_rows = software::table
        .filter(
            software::name
                .like(pattern.clone())
                .escape('\\')
                .or(software::version.like(pattern.clone()).escape('\\'))
                .or(software::license_key.like(pattern.clone()).escape('\\')),
        )
        .order((software::name.asc(), software::id.asc()))
        .limit(SOFTWARE_LIMIT)
        .select(Software::as_select())
        .load(conn)?;

    let locations = locations::table
        .filter(
            locations::name
                .like(pattern.clone())
                .escape('\\')
                .or(locations::building.like(pattern.clone()).escape('\\'))
                .or(locations::room.like(pattern).escape('\\')),
        )
        .order((locations::name.asc(), locations::id.asc()))
        .limit(LOCATION_LIMIT)
        .select(Location::as_select())
        .load(conn)?;

    Ok(SearchResults {
        query: q.to_string(),
        devices: device_views(conn, device_rows, now)?,
        software: software_views(conn, software_rows, now)?,
        locations,
    })
}
