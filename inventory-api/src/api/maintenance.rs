//! API endpoints for maintenance records.
//!
//! Every write also refreshes the device's last and next maintenance dates.

use rocket::http::uri::Origin;
use rocket::response::status;
use rocket::serde::json::{Json, Value};
use rocket::{Route, State, delete, get, patch, post, put, routes};

use super::{RequestUrl, log_action};
use crate::AppState;
use crate::error::InventoryError;
use crate::models::{MaintenanceInput, MaintenanceView};
use crate::orm::DbConn;
use crate::orm::maintenance::{
    create_maintenance, delete_maintenance, get_maintenance, list_maintenance, maintenance_view,
    maintenance_where, update_maintenance,
};
use crate::payload::{decode, merge_patch};
use crate::policy::MaintenancePredicate;
use crate::query::maintenance::{DEFAULT_ORDERING, MaintenanceFilter, ORDERING_FIELDS};
use crate::query::{Page, PageRequest, parse_ordering, search_term};
use crate::session_guards::AuthenticatedUser;

/// List Maintenance endpoint.
///
/// - **URL:** `/api/maintenance`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// # Query Parameters
/// - Any field of [`MaintenanceFilter`], e.g. `device=3`,
///   `maintenance_type=repair`, `scheduled_date_from=2025-01-01`, `overdue=true`
/// - `search`: substring over description, parts used and notes
/// - `ordering`: `scheduled_date`, `performed_date`, `created_at`; the
///   default is `-performed_date,-scheduled_date`
/// - `page`, `page_size`
#[allow(clippy::too_many_arguments)]
#[get("/maintenance?<search>&<ordering>&<page>&<page_size>&<filter..>")]
pub async fn list_maintenance_endpoint(
    filter: MaintenanceFilter,
    search: Option<&str>,
    ordering: Option<&str>,
    page: Option<i64>,
    page_size: Option<i64>,
    uri: &Origin<'_>,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Page<MaintenanceView>>, InventoryError> {
    let now = state.clock.now();
    let request = PageRequest::new(page, page_size, state.page_size);
    let ordering = parse_ordering(ordering, ORDERING_FIELDS, DEFAULT_ORDERING);
    let search = search_term(search);
    let url = RequestUrl::new(uri);

    let page = db
        .run(move |conn| {
            list_maintenance(conn, &filter, search.as_deref(), &ordering, &request, now)
        })
        .await?;
    Ok(Json(url.link(page, &request)))
}

/// Get Maintenance endpoint.
///
/// - **URL:** `/api/maintenance/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/maintenance/<id>")]
pub async fn get_maintenance_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<MaintenanceView>, InventoryError> {
    let now = state.clock.now();
    let view = db
        .run(move |conn| {
            let record = get_maintenance(conn, id)?;
            maintenance_view(conn, record, now)
        })
        .await?;
    Ok(Json(view))
}

/// Create Maintenance endpoint.
///
/// - **URL:** `/api/maintenance`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// # Request Format
///
/// ```json
/// {
///   "device_id": 3,
///   "maintenance_type": "preventive",
///   "description": "Replace fans",
///   "scheduled_date": "2025-02-01T09:00:00"
/// }
/// ```
///
/// **Success (HTTP 201 Created).**
#[post("/maintenance", data = "<body>")]
pub async fn create_maintenance_endpoint(
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::Created<Json<MaintenanceView>>, InventoryError> {
    let input: MaintenanceInput = decode(body.into_inner())?;
    let now = state.clock.now();
    let events = state.events.clone();
    let view = db
        .run(move |conn| {
            let record = create_maintenance(conn, input, now, events.as_ref())?;
            maintenance_view(conn, record, now)
        })
        .await?;
    log_action(&auth, "api_maintenance_create", format!("Created maintenance ID: {}", view.id));
    Ok(status::Created::new(format!("/api/maintenance/{}", view.id)).body(Json(view)))
}

/// Replace Maintenance endpoint.
///
/// - **URL:** `/api/maintenance/<id>`
/// - **Method:** `PUT`
/// - **Authentication:** Required
#[put("/maintenance/<id>", data = "<body>")]
pub async fn replace_maintenance_endpoint(
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<MaintenanceView>, InventoryError> {
    let now = state.clock.now();
    let events = state.events.clone();
    let body = body.into_inner();
    let view = db
        .run(move |conn| {
            get_maintenance(conn, id)?;
            let input: MaintenanceInput = decode(body)?;
            let record = update_maintenance(conn, id, input, now, events.as_ref())?;
            maintenance_view(conn, record, now)
        })
        .await?;
    log_action(&auth, "api_maintenance_update", format!("Updated maintenance ID: {}", id));
    Ok(Json(view))
}

/// Patch Maintenance endpoint.
///
/// - **URL:** `/api/maintenance/<id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
///
/// Setting `performed_date` completes the record.
#[patch("/maintenance/<id>", data = "<body>")]
pub async fn patch_maintenance_endpoint(
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<MaintenanceView>, InventoryError> {
    let now = state.clock.now();
    let events = state.events.clone();
    let patch = body.into_inner();
    let view = db
        .run(move |conn| {
            let current = get_maintenance(conn, id)?;
            let input: MaintenanceInput =
                decode(merge_patch(&MaintenanceInput::from(&current), patch)?)?;
            let record = update_maintenance(conn, id, input, now, events.as_ref())?;
            maintenance_view(conn, record, now)
        })
        .await?;
    log_action(&auth, "api_maintenance_update", format!("Patched maintenance ID: {}", id));
    Ok(Json(view))
}

/// Delete Maintenance endpoint.
///
/// - **URL:** `/api/maintenance/<id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
///
/// Returns `204 No Content`.
#[delete("/maintenance/<id>")]
pub async fn delete_maintenance_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::NoContent, InventoryError> {
    let events = state.events.clone();
    let now = state.clock.now();
    db.run(move |conn| delete_maintenance(conn, id, now, events.as_ref())).await?;
    log_action(&auth, "api_maintenance_delete", format!("Deleted maintenance ID: {}", id));
    Ok(status::NoContent)
}

async fn report(
    predicate: MaintenancePredicate,
    db: DbConn,
    state: &State<AppState>,
) -> Result<Json<Vec<MaintenanceView>>, InventoryError> {
    let now = state.clock.now();
    let rows = db.run(move |conn| maintenance_where(conn, predicate, now)).await?;
    Ok(Json(rows))
}

/// Pending Maintenance endpoint.
///
/// - **URL:** `/api/maintenance/pending`
/// - **Method:** `GET`
/// - **Purpose:** Records not yet performed; not paginated
/// - **Authentication:** Required
#[get("/maintenance/pending")]
pub async fn pending(
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Vec<MaintenanceView>>, InventoryError> {
    report(MaintenancePredicate::Pending, db, state).await
}

/// Overdue Maintenance endpoint.
///
/// - **URL:** `/api/maintenance/overdue`
/// - **Method:** `GET`
/// - **Purpose:** Records not performed whose scheduled date has passed
/// - **Authentication:** Required
#[get("/maintenance/overdue")]
pub async fn overdue(
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Vec<MaintenanceView>>, InventoryError> {
    report(MaintenancePredicate::Overdue, db, state).await
}

/// Completed Maintenance endpoint.
///
/// - **URL:** `/api/maintenance/completed`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/maintenance/completed")]
pub async fn completed(
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Vec<MaintenanceView>>, InventoryError> {
    report(MaintenancePredicate::Completed, db, state).await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_maintenance_endpoint,
        get_maintenance_endpoint,
        create_maintenance_endpoint,
        replace_maintenance_endpoint,
        patch_maintenance_endpoint,
        delete_maintenance_endpoint,
        pending,
        overdue,
        completed
    ]
}
