use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::error::InventoryError;
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{Location, LocationInput, LocationWithCount, NewLocation};
use crate::orm::db::{last_insert_id, transact};
use crate::schema::{devices, locations};
use crate::validation::location_errors;

fn device_counts(conn: &mut SqliteConnection) -> QueryResult<HashMap<i32, i64>> {
    let rows: Vec<(Option<i32>, i64)> = devices::table
        .filter(devices::location_id.is_not_null())
        .group_by(devices::location_id)
        .select((devices::location_id, count_star()))
        .load(conn)?;
    Ok(rows.into_iter().filter_map(|(id, n)| id.map(|id| (id, n))).collect())
}

pub fn list_locations(conn: &mut SqliteConnection) -> QueryResult<Vec<LocationWithCount>> {
    let counts = device_counts(conn)?;
    let rows = locations::table
        .order(locations::id.asc())
        .select(Location::as_select())
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|location| {
            let device_count = counts.get(&location.id).copied().unwrap_or(0);
            LocationWithCount { location, device_count }
        })
        .collect())
}

pub fn get_location(
    conn: &mut SqliteConnection,
    id: i32,
) -> Result<LocationWithCount, InventoryError> {
    let location = locations::table
        .find(id)
        .select(Location::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("Location"))?;
    let device_count = devices::table
        .filter(devices::location_id.eq(id))
        .count()
        .get_result(conn)?;
    Ok(LocationWithCount { location, device_count })
}

pub fn insert_location(
    conn: &mut SqliteConnection,
    input: LocationInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<Location, InventoryError> {
    location_errors(&input).into_result()?;
    let location = transact(conn, |conn| {
        diesel::insert_into(locations::table)
            .values(&NewLocation {
                name: input.name.trim().to_string(),
                building: input.building,
                floor: input.floor,
                room: input.room,
                address: input.address,
                description: input.description,
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        Ok(locations::table.find(id).select(Location::as_select()).first(conn)?)
    })?;
    sink.emit(ChangeEvent::created("Location", location.id));
    Ok(location)
}
