//! CSV export of the device inventory.

use std::collections::HashMap;
use std::io::Write;

use chrono::NaiveDate;
use diesel::prelude::*;
use tracing::info;

use crate::error::InventoryError;
use crate::models::{Category, Device, Location, User};
use crate::schema::{categories, devices, locations, users};

pub const DEVICE_CSV_HEADER: [&str; 11] = [
    "Asset Tag",
    "Model",
    "Category",
    "Status",
    "Condition",
    "Location",
    "Assigned To",
    "Serial Number",
    "Purchase Date",
    "Warranty Expiry",
    "Purchase Price",
];

pub const DEVICE_CSV_FILENAME: &str = "devices.csv";

fn csv_error(e: impl std::fmt::Display) -> InventoryError {
    InventoryError::Internal(format!("csv export failed: {}", e))
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn price_cell(price: Option<f64>) -> String {
    price.map(|p| format!("{:.2}", p)).unwrap_or_default()
}

/// Writes every device, ordered by asset tag, and returns the row count.
pub fn write_devices_csv<W: Write>(
    conn: &mut SqliteConnection,
    out: W,
) -> Result<usize, InventoryError> {
    let rows = devices::table
        .order((devices::asset_tag.asc(), devices::id.asc()))
        .select(Device::as_select())
        .load(conn)?;
    let categories: HashMap<i32, Category> = categories::table
        .select(Category::as_select())
        .load(conn)?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    let locations: HashMap<i32, Location> = locations::table
        .select(Location::as_select())
        .load(conn)?
        .into_iter()
        .map(|l| (l.id, l))
        .collect();
    let users: HashMap<i32, User> = users::table
        .select(User::as_select())
        .load(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(DEVICE_CSV_HEADER).map_err(csv_error)?;
    for device in &rows {
        writer
            .write_record([
                device.asset_tag.clone(),
                device.model.clone(),
                categories.get(&device.category_id).map(|c| c.name.clone()).unwrap_or_default(),
                device.status.label().to_string(),
                device.condition.label().to_string(),
                device
                    .location_id
                    .and_then(|id| locations.get(&id))
                    .map(Location::display_name)
                    .unwrap_or_default(),
                device
                    .assigned_to_id
                    .and_then(|id| users.get(&id))
                    .map(User::full_name)
                    .unwrap_or_default(),
                device.serial_number.clone(),
                date_cell(device.purchase_date),
                date_cell(device.warranty_expiry),
                price_cell(device.purchase_price),
            ])
            .map_err(csv_error)?;
    }
    writer.flush().map_err(csv_error)?;
    info!(target: "inventory_api::repository", "exported {} devices as csv", rows.len());
    Ok(rows.len())
}

pub fn devices_csv(conn: &mut SqliteConnection) -> Result<String, InventoryError> {
    let mut buf = Vec::new();
    write_devices_csv(conn, &mut buf)?;
    String::from_utf8(buf).map_err(csv_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choices::{DeviceCondition, DeviceStatus};
    use crate::orm::testing::{seed_category, seed_device, seed_location, seed_user, setup_test_db};

    #[test]
    fn rows_are_ordered_and_labelled() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Laptops");
        let hq = seed_location(&mut conn, "HQ");
        let user = seed_user(&mut conn, "jdoe", "pw");
        diesel::update(users::table.find(user.id))
            .set((users::first_name.eq("Jane"), users::last_name.eq("Doe")))
            .execute(&mut conn)
            .unwrap();

        let b = seed_device(&mut conn, "B-2", cat.id);
        seed_device(&mut conn, "A-1", cat.id);
        diesel::update(devices::table.find(b.id))
            .set((
                devices::status.eq(DeviceStatus::Maintenance),
                devices::condition.eq(DeviceCondition::Fair),
                devices::location_id.eq(Some(hq.id)),
                devices::assigned_to_id.eq(Some(user.id)),
                devices::purchase_date.eq(NaiveDate::from_ymd_opt(2024, 3, 5)),
                devices::purchase_price.eq(Some(1200.0)),
            ))
            .execute(&mut conn)
            .unwrap();

        let csv = devices_csv(&mut conn).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Asset Tag,Model,Category,Status,Condition,Location,Assigned To,Serial Number,Purchase Date,Warranty Expiry,Purchase Price"
        );
        assert_eq!(lines[1], "A-1,Model,Laptops,Active,Good,,,,,,");
        assert_eq!(
            lines[2],
            "B-2,Model,Laptops,Under Maintenance,Fair,HQ -,Jane Doe,,2024-03-05,,1200.00"
        );
        assert_eq!(lines.len(), 3);
    }
}
