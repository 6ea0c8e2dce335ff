use diesel::QueryableByName;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use rocket::fairing::AdHoc;
use rocket_sync_db_pools::{database, diesel};
use tracing::{error, info};

use crate::error::InventoryError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[database("sqlite_db")]
pub struct DbConn(diesel::SqliteConnection);

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// Id of the row most recently inserted on this connection.
pub fn last_insert_id(conn: &mut SqliteConnection) -> QueryResult<i32> {
    let row = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
        .get_result::<LastInsertRowId>(conn)?;
    Ok(row.last_insert_rowid as i32)
}

/// Enables foreign key enforcement on `conn`.
///
/// SQLite keeps this flag per connection and ignores it inside a
/// transaction, so [`transact`] sets it before opening one.
pub fn set_foreign_keys(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON")
}

/// Runs `f` inside one `BEGIN IMMEDIATE` transaction with foreign keys on.
///
/// Every mutating repository call goes through here, so a call either
/// applies completely or not at all.
pub fn transact<T, F>(conn: &mut SqliteConnection, f: F) -> Result<T, InventoryError>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T, InventoryError>,
{
    set_foreign_keys(conn)?;
    conn.immediate_transaction(f)
}

pub fn set_foreign_keys_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Set Foreign Keys", |rocket| async {
        let Some(conn) = DbConn::get_one(&rocket).await else {
            error!("no database connection available for foreign key setup");
            return Err(rocket);
        };
        match conn.run(set_foreign_keys).await {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("failed to enable foreign keys: {}", e);
                Err(rocket)
            }
        }
    })
}

pub fn run_pending_migrations(
    conn: &mut SqliteConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        info!("applied migration {}", version);
    }
    Ok(())
}

/// Runs pending Diesel migrations when Rocket ignites.
pub fn run_migrations_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Diesel Migrations", |rocket| async {
        let Some(conn) = DbConn::get_one(&rocket).await else {
            error!("no database connection available for migrations");
            return Err(rocket);
        };
        match conn.run(|c| run_pending_migrations(c).map_err(|e| e.to_string())).await {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("migrations failed: {}", e);
                Err(rocket)
            }
        }
    })
}
