use chrono::NaiveDateTime;
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use inventory_api::orm::maintenance::{list_maintenance, maintenance_where};
use inventory_api::policy::MaintenancePredicate;
use inventory_api::projection::{MaintenanceRow, maintenance_row, render_table};
use inventory_api::query::maintenance::{DEFAULT_ORDERING, MaintenanceFilter};
use inventory_api::query::{PageRequest, TABLE_PAGE_SIZE, search_term};

use crate::admin_cli::utils::page_table;

#[derive(Subcommand)]
pub enum MaintenanceAction {
    #[command(about = "List maintenance records with their workflow status, 25 per page")]
    Ls {
        #[arg(short, long, help = "Substring matched against description, parts and notes")]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1, help = "Page number")]
        page: i64,
    },
    #[command(about = "Open records whose scheduled date has passed")]
    Overdue,
}

pub fn handle_maintenance_command_with_conn(
    conn: &mut SqliteConnection,
    action: MaintenanceAction,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    let out = match action {
        MaintenanceAction::Ls { search, page } => {
            maintenance_listing(conn, search.as_deref(), page, now)?
        }
        MaintenanceAction::Overdue => {
            let overdue = maintenance_where(conn, MaintenancePredicate::Overdue, now)?;
            let rows: Vec<Vec<String>> = overdue
                .iter()
                .map(|view| maintenance_row(view).cells())
                .collect();
            if rows.is_empty() {
                "No overdue maintenance.\n".to_string()
            } else {
                render_table(&MaintenanceRow::HEADERS, &rows)
            }
        }
    };
    print!("{}", out);
    Ok(())
}

pub fn maintenance_listing(
    conn: &mut SqliteConnection,
    search: Option<&str>,
    page: i64,
    now: NaiveDateTime,
) -> Result<String, Box<dyn std::error::Error>> {
    let request = PageRequest::new(Some(page), None, TABLE_PAGE_SIZE);
    let search = search_term(search);
    let page = list_maintenance(
        conn,
        &<MaintenanceFilter as Default>::default(),
        search.as_deref(),
        DEFAULT_ORDERING,
        &request,
        now,
    )?;
    let rows: Vec<Vec<String>> =
        page.results.iter().map(|view| maintenance_row(view).cells()).collect();
    Ok(page_table(&MaintenanceRow::HEADERS, &page, &request, &rows, "records"))
}

#[cfg(test)]
mod tests {
    use inventory_api::orm::testing::{
        seed_category, seed_device, seed_maintenance, setup_test_db, test_now,
    };

    use super::*;

    #[test]
    fn listing_shows_workflow_status() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Printers");
        let device = seed_device(&mut conn, "PRN-1", cat.id);
        seed_maintenance(&mut conn, device.id, "Replace toner");

        let out = maintenance_listing(&mut conn, None, 1, test_now()).unwrap();
        let row = out.lines().nth(2).unwrap();
        assert!(row.starts_with("PRN-1"));
        assert!(row.contains("Pending"));
        assert!(out.ends_with("Page 1 of 1 (1 records)\n"));

        let none = maintenance_listing(&mut conn, Some("fuser"), 1, test_now()).unwrap();
        assert_eq!(none, "No records found.\n");
    }
}
