use chrono::NaiveDateTime;
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use inventory_api::orm::software::{list_software, software_where};
use inventory_api::policy::SoftwarePredicate;
use inventory_api::projection::{SoftwareRow, render_table, software_row};
use inventory_api::query::software::{DEFAULT_ORDERING, SoftwareFilter};
use inventory_api::query::{PageRequest, TABLE_PAGE_SIZE, search_term};

use crate::admin_cli::utils::page_table;

#[derive(Subcommand)]
pub enum SoftwareAction {
    #[command(about = "List software licenses, 25 per page")]
    Ls {
        #[arg(short, long, help = "Substring matched against name, version and license key")]
        search: Option<String>,
        #[arg(short, long, default_value_t = 1, help = "Page number")]
        page: i64,
    },
    #[command(about = "Licenses with two or fewer free seats")]
    LowSeats,
    #[command(about = "Licenses expiring within 30 days")]
    ExpiringSoon,
}

pub fn handle_software_command_with_conn(
    conn: &mut SqliteConnection,
    action: SoftwareAction,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    let out = match action {
        SoftwareAction::Ls { search, page } => {
            software_listing(conn, search.as_deref(), page, now)?
        }
        SoftwareAction::LowSeats => software_report(conn, SoftwarePredicate::LowSeats, now)?,
        SoftwareAction::ExpiringSoon => {
            software_report(conn, SoftwarePredicate::ExpiringSoon, now)?
        }
    };
    print!("{}", out);
    Ok(())
}

fn cells(rows: impl Iterator<Item = SoftwareRow>) -> Vec<Vec<String>> {
    rows.map(|row| row.cells()).collect()
}

pub fn software_listing(
    conn: &mut SqliteConnection,
    search: Option<&str>,
    page: i64,
    now: NaiveDateTime,
) -> Result<String, Box<dyn std::error::Error>> {
    let request = PageRequest::new(Some(page), None, TABLE_PAGE_SIZE);
    let search = search_term(search);
    let filter = <SoftwareFilter as Default>::default();
    let page =
        list_software(conn, &filter, search.as_deref(), DEFAULT_ORDERING, &request, now)?;
    let rows = cells(page.results.iter().map(software_row));
    Ok(page_table(&SoftwareRow::HEADERS, &page, &request, &rows, "licenses"))
}

pub fn software_report(
    conn: &mut SqliteConnection,
    predicate: SoftwarePredicate,
    now: NaiveDateTime,
) -> Result<String, Box<dyn std::error::Error>> {
    let views = software_where(conn, predicate, now)?;
    if views.is_empty() {
        return Ok(format!("No {} licenses.\n", predicate.name().replace('_', " ")));
    }
    let rows = cells(views.iter().map(software_row));
    Ok(render_table(&SoftwareRow::HEADERS, &rows))
}
