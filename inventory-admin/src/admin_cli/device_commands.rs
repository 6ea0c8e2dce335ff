use chrono::NaiveDateTime;
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use inventory_api::models::DeviceCollection;
use inventory_api::orm::device::list_devices;
use inventory_api::projection::{DeviceRow, device_row};
use inventory_api::query::device::{DEFAULT_ORDERING, DeviceFilter};
use inventory_api::query::{PageRequest, TABLE_PAGE_SIZE, search_term};

use crate::admin_cli::utils::page_table;

#[derive(Subcommand)]
pub enum DeviceAction {
    #[command(about = "List devices, 25 per page")]
    Ls {
        #[arg(
            short,
            long,
            default_value = "devices",
            value_parser = ["devices", "network-devices", "computers", "peripherals"],
            help = "Collection to list"
        )]
        kind: String,
        #[arg(short, long, help = "Substring matched against asset tag, serial, model and notes")]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1, help = "Page number")]
        page: i64,
    },
}

pub fn handle_device_command_with_conn(
    conn: &mut SqliteConnection,
    action: DeviceAction,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DeviceAction::Ls { kind, search, page } => {
            let collection = DeviceCollection::from_segment(&kind)
                .ok_or_else(|| format!("Unknown device collection '{}'", kind))?;
            print!("{}", device_listing(conn, collection, search.as_deref(), page, now)?);
        }
    }
    Ok(())
}

/// One page of a device collection as a table. The specialized collections
/// get their own columns after the common ones.
pub fn device_listing(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    search: Option<&str>,
    page: i64,
    now: NaiveDateTime,
) -> Result<String, Box<dyn std::error::Error>> {
    let request = PageRequest::new(Some(page), None, TABLE_PAGE_SIZE);
    let search = search_term(search);
    let page = list_devices(
        conn,
        collection,
        &<DeviceFilter as Default>::default(),
        search.as_deref(),
        DEFAULT_ORDERING,
        &request,
        now,
    )?;

    let rows: Vec<DeviceRow> = page.results.iter().map(device_row).collect();
    let mut headers: Vec<&str> = DeviceRow::HEADERS.to_vec();
    let mut cells: Vec<Vec<String>> = rows.iter().map(DeviceRow::cells).collect();
    if collection == DeviceCollection::Devices {
        for row in &mut cells {
            row.truncate(DeviceRow::HEADERS.len());
        }
    } else if let Some(first) = rows.first() {
        headers.extend(first.extra.iter().map(|(name, _)| name.as_str()));
    }

    Ok(page_table(&headers, &page, &request, &cells, "devices"))
}

#[cfg(test)]
mod tests {
    use inventory_api::choices::ComputerType;
    use inventory_api::events::NullSink;
    use inventory_api::models::DeviceCollection::{Computers, Devices, Peripherals};
    use inventory_api::orm::device::create_device;
    use inventory_api::orm::testing::{seed_category, seed_device, setup_test_db, test_now};
    use inventory_api::payload::device_write_from_json;
    use serde_json::json;

    use super::*;

    #[test]
    fn generic_listing_has_common_columns_only() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Laptops");
        seed_device(&mut conn, "B-2", cat.id);
        seed_device(&mut conn, "A-1", cat.id);

        let out = device_listing(&mut conn, Devices, None, 1, test_now()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("Asset Tag"));
        assert!(lines[0].ends_with("Maintenance"));
        assert!(lines[2].starts_with("A-1"));
        assert!(lines[3].starts_with("B-2"));
        assert_eq!(lines[4], "Page 1 of 1 (2 devices)");
    }

    #[test]
    fn computer_listing_adds_type_columns() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Servers");
        let write = device_write_from_json(
            Computers,
            json!({
                "asset_tag": "SRV-1",
                "model": "R740",
                "category_id": cat.id,
                "computer_type": ComputerType::Server.code(),
                "operating_system": "Debian 12"
            }),
        )
        .unwrap();
        create_device(&mut conn, Computers, write, test_now(), &NullSink).unwrap();

        let out = device_listing(&mut conn, Computers, None, 1, test_now()).unwrap();
        let header = out.lines().next().unwrap();
        assert!(header.contains("Operating System"));
        assert!(out.contains("Debian 12"));
        assert!(out.contains("Server"));

        let none = device_listing(&mut conn, Peripherals, None, 1, test_now()).unwrap();
        assert_eq!(none, "No devices found.\n");
    }

    #[test]
    fn pages_hold_twenty_five_rows() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Desks");
        for n in 0..30 {
            seed_device(&mut conn, &format!("D-{:02}", n), cat.id);
        }

        let first = device_listing(&mut conn, Devices, None, 1, test_now()).unwrap();
        assert_eq!(first.lines().count(), 2 + 25 + 1);
        let second = device_listing(&mut conn, Devices, None, 2, test_now()).unwrap();
        assert!(second.ends_with("Page 2 of 2 (30 devices)\n"));
        assert!(device_listing(&mut conn, Devices, None, 3, test_now()).is_err());

        let searched = device_listing(&mut conn, Devices, Some("D-1"), 1, test_now()).unwrap();
        assert!(searched.ends_with("(10 devices)\n"));
    }
}
