//! Categories, locations and vendors. The REST API only reads these, so the
//! CLI is where they are created.

use chrono::NaiveDateTime;
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use inventory_api::events::TracingSink;
use inventory_api::models::{CategoryInput, LocationInput, VendorInput};
use inventory_api::orm::category::{insert_category, list_categories};
use inventory_api::orm::location::{insert_location, list_locations};
use inventory_api::orm::vendor::{insert_vendor, list_vendors};
use inventory_api::projection::render_table;

#[derive(Subcommand)]
pub enum CategoryAction {
    #[command(about = "Add a device category")]
    Add {
        #[arg(short, long, help = "Category name (unique)")]
        name: String,
        #[arg(short, long, default_value = "", help = "Description")]
        description: String,
    },
    #[command(about = "List categories with their device counts")]
    Ls,
}

#[derive(Subcommand)]
pub enum LocationAction {
    #[command(about = "Add a location")]
    Add {
        #[arg(short, long, help = "Location name")]
        name: String,
        #[arg(short, long, default_value = "", help = "Building")]
        building: String,
        #[arg(short, long, default_value = "", help = "Floor")]
        floor: String,
        #[arg(short, long, default_value = "", help = "Room")]
        room: String,
        #[arg(short, long, default_value = "", help = "Street address")]
        address: String,
    },
    #[command(about = "List locations with their device counts")]
    Ls,
}

#[derive(Subcommand)]
pub enum VendorAction {
    #[command(about = "Add a vendor")]
    Add {
        #[arg(short, long, help = "Vendor name (unique)")]
        name: String,
        #[arg(short, long, default_value = "", help = "Contact person")]
        contact: String,
        #[arg(short, long, default_value = "", help = "Email address")]
        email: String,
        #[arg(short, long, default_value = "", help = "Phone number")]
        phone: String,
        #[arg(short, long, default_value = "", help = "Website")]
        website: String,
    },
    #[command(about = "List vendors with their device counts")]
    Ls,
}

pub fn handle_category_command_with_conn(
    conn: &mut SqliteConnection,
    action: CategoryAction,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CategoryAction::Add { name, description } => {
            let input = CategoryInput { name, description };
            let category = insert_category(conn, input, now, &TracingSink)?;
            println!("Category created: {} (ID: {})", category.name, category.id);
        }
        CategoryAction::Ls => print!("{}", category_table(conn)?),
    }
    Ok(())
}

pub fn handle_location_command_with_conn(
    conn: &mut SqliteConnection,
    action: LocationAction,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        LocationAction::Add { name, building, floor, room, address } => {
            let input =
                LocationInput { name, building, floor, room, address, ..Default::default() };
            let location = insert_location(conn, input, now, &TracingSink)?;
            println!("Location created: {} (ID: {})", location.display_name(), location.id);
        }
        LocationAction::Ls => {
            let rows: Vec<Vec<String>> = list_locations(conn)?
                .into_iter()
                .map(|l| {
                    vec![
                        l.location.id.to_string(),
                        l.location.display_name(),
                        l.device_count.to_string(),
                    ]
                })
                .collect();
            print!("{}", render_table(&["ID", "Location", "Devices"], &rows));
        }
    }
    Ok(())
}

pub fn handle_vendor_command_with_conn(
    conn: &mut SqliteConnection,
    action: VendorAction,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        VendorAction::Add { name, contact, email, phone, website } => {
            let input = VendorInput {
                name,
                contact_person: contact,
                email,
                phone,
                website,
                ..Default::default()
            };
            let vendor = insert_vendor(conn, input, now, &TracingSink)?;
            println!("Vendor created: {} (ID: {})", vendor.name, vendor.id);
        }
        VendorAction::Ls => {
            let rows: Vec<Vec<String>> = list_vendors(conn)?
                .into_iter()
                .map(|v| {
                    vec![
                        v.vendor.id.to_string(),
                        v.vendor.name,
                        v.vendor.email,
                        v.device_count.to_string(),
                    ]
                })
                .collect();
            print!("{}", render_table(&["ID", "Name", "Email", "Devices"], &rows));
        }
    }
    Ok(())
}

pub fn category_table(conn: &mut SqliteConnection) -> Result<String, Box<dyn std::error::Error>> {
    let rows: Vec<Vec<String>> = list_categories(conn)?
        .into_iter()
        .map(|c| vec![c.category.id.to_string(), c.category.name, c.device_count.to_string()])
        .collect();
    Ok(render_table(&["ID", "Name", "Devices"], &rows))
}

#[cfg(test)]
mod tests {
    use inventory_api::orm::testing::{seed_device, setup_test_db, test_now};

    use super::*;

    #[test]
    fn added_categories_are_listed_with_counts() {
        let mut conn = setup_test_db();
        let add =
            |name: &str| CategoryAction::Add { name: name.into(), description: String::new() };
        handle_category_command_with_conn(&mut conn, add("Laptops"), test_now()).unwrap();
        handle_category_command_with_conn(&mut conn, add("Phones"), test_now()).unwrap();
        seed_device(&mut conn, "LAP-1", 1);

        let table = category_table(&mut conn).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID  Name     Devices");
        assert_eq!(lines[2], "1   Laptops  1");
        assert_eq!(lines[3], "2   Phones   0");

        // names are unique
        assert!(handle_category_command_with_conn(&mut conn, add("Laptops"), test_now()).is_err());
    }

    #[test]
    fn vendor_email_is_validated() {
        let mut conn = setup_test_db();
        let action = VendorAction::Add {
            name: "Acme".into(),
            contact: String::new(),
            email: "nope".into(),
            phone: String::new(),
            website: String::new(),
        };
        assert!(handle_vendor_command_with_conn(&mut conn, action, test_now()).is_err());
    }
}
