//! Test fixtures: in-memory databases, seed helpers and fully assembled
//! Rocket instances with a pinned clock.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};
use uuid::Uuid;

use super::db::{DbConn, last_insert_id, run_pending_migrations, set_foreign_keys};
use crate::clock::FixedClock;
use crate::config::AppConfig;
use crate::events::{NullSink, RecordingSink};
use crate::models::{
    Category, CategoryInput, Device, DeviceCollection, DeviceInput, DeviceWrite, Location,
    LocationInput, MaintenanceRecord, NewMaintenanceRecord, NewSoftware, Software, User,
    UserInput, Vendor, VendorInput,
};
use crate::orm::category::insert_category;
use crate::orm::device::create_device;
use crate::orm::location::insert_location;
use crate::orm::login::hash_password;
use crate::orm::user::insert_user;
use crate::orm::vendor::insert_vendor;
use crate::schema::{maintenance_records, software};

/// The instant every fixture treats as "now": 2025-01-15 12:00.
pub fn test_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 15)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid fixture date")
}

/// `synchronous = OFF` for speed. The journal stays on so rollbacks work.
fn set_sqlite_test_pragmas(conn: &mut SqliteConnection) {
    conn.batch_execute("PRAGMA synchronous = OFF;").expect("Failed to set SQLite PRAGMAs");
}

fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        let conn = DbConn::get_one(&rocket).await.expect("database connection for test pragmas");
        conn.run(set_sqlite_test_pragmas).await;
        rocket
    })
}

/// A fresh in-memory database with migrations applied and foreign keys on.
/// Each call returns an independent database.
pub fn setup_test_db() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn).expect("enable foreign keys");
    run_pending_migrations(&mut conn).expect("run migrations");
    conn
}

/// Rocket over a unique shared in-memory database, with the clock frozen at
/// `now` and every change event recorded.
pub fn test_rocket_recording(now: NaiveDateTime) -> (Rocket<Build>, Arc<RecordingSink>) {
    test_rocket_with(&AppConfig::for_tests(), now)
}

/// Like [`test_rocket_recording`] under a caller-supplied configuration.
pub fn test_rocket_with(
    config: &AppConfig,
    now: NaiveDateTime,
) -> (Rocket<Build>, Arc<RecordingSink>) {
    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());
    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };
    let figment = rocket::Config::figment().merge(("databases", map!["sqlite_db" => db_config]));

    let sink = Arc::new(RecordingSink::new());
    let rocket = crate::build_rocket(
        figment,
        config,
        Arc::new(FixedClock(now)),
        sink.clone(),
    )
    .attach(set_sqlite_test_pragmas_fairing());
    (rocket, sink)
}

pub fn test_rocket_at(now: NaiveDateTime) -> Rocket<Build> {
    test_rocket_recording(now).0
}

/// Rocket for integration tests; log in as `admin`/`admin`.
pub fn test_rocket() -> Rocket<Build> {
    test_rocket_at(test_now())
}

pub fn seed_category(conn: &mut SqliteConnection, name: &str) -> Category {
    let input = CategoryInput { name: name.to_string(), description: String::new() };
    insert_category(conn, input, test_now(), &NullSink).expect("seed category")
}

pub fn seed_location(conn: &mut SqliteConnection, name: &str) -> Location {
    let input = LocationInput { name: name.to_string(), ..Default::default() };
    insert_location(conn, input, test_now(), &NullSink).expect("seed location")
}

pub fn seed_vendor(conn: &mut SqliteConnection, name: &str) -> Vendor {
    let input = VendorInput { name: name.to_string(), ..Default::default() };
    insert_vendor(conn, input, test_now(), &NullSink).expect("seed vendor")
}

pub fn seed_user(conn: &mut SqliteConnection, username: &str, password: &str) -> User {
    let input = UserInput {
        username: username.to_string(),
        password_hash: hash_password(password).expect("hash password"),
        ..Default::default()
    };
    insert_user(conn, input, test_now()).expect("seed user")
}

/// A plain device with model "Model".
pub fn seed_device(conn: &mut SqliteConnection, asset_tag: &str, category_id: i32) -> Device {
    let input = DeviceInput {
        asset_tag: asset_tag.to_string(),
        model: "Model".to_string(),
        category_id: Some(category_id),
        ..Default::default()
    };
    create_device(conn, DeviceCollection::Devices, DeviceWrite::plain(input), test_now(), &NullSink)
        .expect("seed device")
        .device
}

/// Software with `used` seats already taken, bypassing installations.
pub fn seed_software(conn: &mut SqliteConnection, name: &str, seats: i32, used: i32) -> Software {
    diesel::insert_into(software::table)
        .values(&NewSoftware {
            name: name.to_string(),
            version: "1.0".to_string(),
            vendor_id: None,
            license_type: Default::default(),
            license_key: String::new(),
            license_expiry: None,
            seats,
            used_seats: used,
            purchase_date: None,
            purchase_price: None,
            notes: String::new(),
            created_at: test_now(),
            updated_at: test_now(),
        })
        .execute(conn)
        .expect("seed software");
    let id = last_insert_id(conn).expect("software id");
    software::table.find(id).select(Software::as_select()).first(conn).expect("reload software")
}

/// An unscheduled, unperformed record. Device dates are not synced.
pub fn seed_maintenance(
    conn: &mut SqliteConnection,
    device_id: i32,
    description: &str,
) -> MaintenanceRecord {
    diesel::insert_into(maintenance_records::table)
        .values(&NewMaintenanceRecord {
            device_id,
            maintenance_type: Default::default(),
            description: description.to_string(),
            performed_by_id: None,
            vendor_id: None,
            scheduled_date: None,
            performed_date: None,
            cost: None,
            parts_used: String::new(),
            notes: String::new(),
            created_at: test_now(),
            updated_at: test_now(),
        })
        .execute(conn)
        .expect("seed maintenance");
    let id = last_insert_id(conn).expect("maintenance id");
    maintenance_records::table
        .find(id)
        .select(MaintenanceRecord::as_select())
        .first(conn)
        .expect("reload maintenance")
}
