pub mod audit;
pub mod category;
mod db;
pub mod dashboard;
pub mod device;
pub mod export;
pub mod installation;
pub mod location;
pub mod login;
pub mod logout;
pub mod maintenance;
pub mod search;
pub mod software;
#[cfg(any(test, feature = "test-staging"))]
pub mod testing;
pub mod user;
pub mod vendor;

pub use db::*;

use diesel::dsl::exists;
use diesel::prelude::*;

use crate::error::FieldErrors;
use crate::schema::{
    categories, computers, devices, inventory_audits, locations, software as software_table, users,
    vendors,
};

/// Tables that other records point at by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefTable {
    Category,
    Vendor,
    Location,
    User,
    Device,
    Computer,
    Software,
    Audit,
}

fn row_exists(conn: &mut SqliteConnection, table: RefTable, id: i32) -> QueryResult<bool> {
    match table {
        RefTable::Category => diesel::select(exists(categories::table.find(id))).get_result(conn),
        RefTable::Vendor => diesel::select(exists(vendors::table.find(id))).get_result(conn),
        RefTable::Location => diesel::select(exists(locations::table.find(id))).get_result(conn),
        RefTable::User => diesel::select(exists(users::table.find(id))).get_result(conn),
        RefTable::Device => diesel::select(exists(devices::table.find(id))).get_result(conn),
        RefTable::Computer => diesel::select(exists(computers::table.find(id))).get_result(conn),
        RefTable::Software => {
            diesel::select(exists(software_table::table.find(id))).get_result(conn)
        }
        RefTable::Audit => {
            diesel::select(exists(inventory_audits::table.find(id))).get_result(conn)
        }
    }
}

pub(crate) fn invalid_pk(id: i32) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

/// Records an error on `field` when `id` is set but names no row of `table`.
pub(crate) fn check_reference(
    conn: &mut SqliteConnection,
    errors: &mut FieldErrors,
    field: &str,
    table: RefTable,
    id: Option<i32>,
) -> QueryResult<()> {
    if let Some(id) = id {
        if !row_exists(conn, table, id)? {
            errors.add(field, invalid_pk(id));
        }
    }
    Ok(())
}
