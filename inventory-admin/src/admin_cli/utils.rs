use chrono::NaiveDateTime;
use diesel::{prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use inventory_api::clock::{Clock, SystemClock};
use inventory_api::orm::{run_pending_migrations, set_foreign_keys};
use inventory_api::projection::render_table;
use inventory_api::query::{Page, PageRequest};

/// Opens DATABASE_URL with foreign keys on and the schema migrated.
pub fn establish_connection() -> Result<SqliteConnection, Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let mut conn = SqliteConnection::establish(&database_url)?;
    set_foreign_keys(&mut conn)?;
    run_pending_migrations(&mut conn).map_err(|e| format!("Failed to run migrations: {}", e))?;
    Ok(conn)
}

pub fn now() -> NaiveDateTime {
    SystemClock.now()
}

/// A rendered table followed by a `Page x of y` footer.
pub fn page_table<T>(
    headers: &[&str],
    page: &Page<T>,
    request: &PageRequest,
    rows: &[Vec<String>],
    noun: &str,
) -> String {
    if page.count == 0 {
        return format!("No {} found.\n", noun);
    }
    let mut out = render_table(headers, rows);
    out.push_str(&format!(
        "Page {} of {} ({} {})\n",
        request.page,
        request.page_count(page.count),
        page.count,
        noun
    ));
    out
}
