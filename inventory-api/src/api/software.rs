//! API endpoints for software licenses and their installations.

use rocket::http::uri::Origin;
use rocket::response::status;
use rocket::serde::json::{Json, Value};
use rocket::{Route, State, delete, get, patch, post, put, routes};

use super::{RequestUrl, log_action};
use crate::AppState;
use crate::error::InventoryError;
use crate::models::{InstallationInput, InstallationView, SoftwareInput, SoftwareView};
use crate::orm::DbConn;
use crate::orm::installation::{install_software, list_installations};
use crate::orm::software::{
    create_software, delete_software, get_software, list_software, software_view, software_where,
    update_software,
};
use crate::payload::{decode, merge_patch};
use crate::policy::SoftwarePredicate;
use crate::query::software::{DEFAULT_ORDERING, ORDERING_FIELDS, SoftwareFilter};
use crate::query::{Page, PageRequest, parse_ordering, search_term};
use crate::session_guards::AuthenticatedUser;

/// List Software endpoint.
///
/// - **URL:** `/api/software`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// # Query Parameters
/// - Any field of [`SoftwareFilter`], e.g. `license_type=subscription`,
///   `seats_min=10`, `expired=false`
/// - `search`: substring over name, version and license key
/// - `ordering`: `name`, `version`, `purchase_date`, `license_expiry`
/// - `page`, `page_size`
#[allow(clippy::too_many_arguments)]
#[get("/software?<search>&<ordering>&<page>&<page_size>&<filter..>")]
pub async fn list_software_endpoint(
    filter: SoftwareFilter,
    search: Option<&str>,
    ordering: Option<&str>,
    page: Option<i64>,
    page_size: Option<i64>,
    uri: &Origin<'_>,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Page<SoftwareView>>, InventoryError> {
    let now = state.clock.now();
    let request = PageRequest::new(page, page_size, state.page_size);
    let ordering = parse_ordering(ordering, ORDERING_FIELDS, DEFAULT_ORDERING);
    let search = search_term(search);
    let url = RequestUrl::new(uri);

    let page = db
        .run(move |conn| list_software(conn, &filter, search.as_deref(), &ordering, &request, now))
        .await?;
    Ok(Json(url.link(page, &request)))
}

/// Get Software endpoint.
///
/// - **URL:** `/api/software/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// The response carries `available_seats` and `license_status`.
#[get("/software/<id>")]
pub async fn get_software_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<SoftwareView>, InventoryError> {
    let now = state.clock.now();
    let view = db
        .run(move |conn| {
            let sw = get_software(conn, id)?;
            software_view(conn, sw, now)
        })
        .await?;
    Ok(Json(view))
}

/// Create Software endpoint.
///
/// - **URL:** `/api/software`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// # Request Format
///
/// ```json
/// {
///   "name": "Office 365",
///   "version": "2024",
///   "license_type": "subscription",
///   "license_expiry": "2025-12-31",
///   "seats": 50
/// }
/// ```
///
/// **Success (HTTP 201 Created)**, or `400 Bad Request` with field errors,
/// e.g. when `used_seats` exceeds `seats`.
#[post("/software", data = "<body>")]
pub async fn create_software_endpoint(
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::Created<Json<SoftwareView>>, InventoryError> {
    let input: SoftwareInput = decode(body.into_inner())?;
    let now = state.clock.now();
    let events = state.events.clone();
    let view = db
        .run(move |conn| {
            let sw = create_software(conn, input, now, events.as_ref())?;
            software_view(conn, sw, now)
        })
        .await?;
    log_action(&auth, "api_software_create", format!("Created software ID: {}", view.id));
    Ok(status::Created::new(format!("/api/software/{}", view.id)).body(Json(view)))
}

/// Replace Software endpoint.
///
/// - **URL:** `/api/software/<id>`
/// - **Method:** `PUT`
/// - **Authentication:** Required
#[put("/software/<id>", data = "<body>")]
pub async fn replace_software_endpoint(
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<SoftwareView>, InventoryError> {
    let now = state.clock.now();
    let events = state.events.clone();
    let body = body.into_inner();
    let view = db
        .run(move |conn| {
            get_software(conn, id)?;
            let input: SoftwareInput = decode(body)?;
            let sw = update_software(conn, id, input, now, events.as_ref())?;
            software_view(conn, sw, now)
        })
        .await?;
    log_action(&auth, "api_software_update", format!("Updated software ID: {}", id));
    Ok(Json(view))
}

/// Patch Software endpoint.
///
/// - **URL:** `/api/software/<id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
#[patch("/software/<id>", data = "<body>")]
pub async fn patch_software_endpoint(
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<SoftwareView>, InventoryError> {
    let now = state.clock.now();
    let events = state.events.clone();
    let patch = body.into_inner();
    let view = db
        .run(move |conn| {
            let current = get_software(conn, id)?;
            let input: SoftwareInput = decode(merge_patch(&SoftwareInput::from(&current), patch)?)?;
            let sw = update_software(conn, id, input, now, events.as_ref())?;
            software_view(conn, sw, now)
        })
        .await?;
    log_action(&auth, "api_software_update", format!("Patched software ID: {}", id));
    Ok(Json(view))
}

/// Delete Software endpoint.
///
/// - **URL:** `/api/software/<id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
///
/// Installations of the software go with it. Returns `204 No Content`.
#[delete("/software/<id>")]
pub async fn delete_software_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::NoContent, InventoryError> {
    let events = state.events.clone();
    db.run(move |conn| delete_software(conn, id, events.as_ref())).await?;
    log_action(&auth, "api_software_delete", format!("Deleted software ID: {}", id));
    Ok(status::NoContent)
}

async fn report(
    predicate: SoftwarePredicate,
    db: DbConn,
    state: &State<AppState>,
    auth: &AuthenticatedUser,
) -> Result<Json<Vec<SoftwareView>>, InventoryError> {
    let now = state.clock.now();
    let rows = db.run(move |conn| software_where(conn, predicate, now)).await?;
    log_action(
        auth,
        &format!("api_software_{}", predicate.name()),
        format!("Found {} software records", rows.len()),
    );
    Ok(Json(rows))
}

/// Expiring Licenses endpoint.
///
/// - **URL:** `/api/software/expiring_soon`
/// - **Method:** `GET`
/// - **Purpose:** Licenses that expire within 30 days; not paginated
/// - **Authentication:** Required
#[get("/software/expiring_soon")]
pub async fn expiring_soon(
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<SoftwareView>>, InventoryError> {
    report(SoftwarePredicate::ExpiringSoon, db, state, &auth).await
}

/// Expired Licenses endpoint.
///
/// - **URL:** `/api/software/expired`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/software/expired")]
pub async fn expired(
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<SoftwareView>>, InventoryError> {
    report(SoftwarePredicate::Expired, db, state, &auth).await
}

/// Low Seats endpoint.
///
/// - **URL:** `/api/software/low_seats`
/// - **Method:** `GET`
/// - **Purpose:** Licenses with at most two seats left
/// - **Authentication:** Required
#[get("/software/low_seats")]
pub async fn low_seats(
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<SoftwareView>>, InventoryError> {
    report(SoftwarePredicate::LowSeats, db, state, &auth).await
}

/// List Installations endpoint.
///
/// - **URL:** `/api/software/<id>/installations`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/software/<id>/installations")]
pub async fn list_installations_endpoint(
    id: i32,
    db: DbConn,
    _auth: AuthenticatedUser,
) -> Result<Json<Vec<InstallationView>>, InventoryError> {
    let rows = db.run(move |conn| list_installations(conn, id)).await?;
    Ok(Json(rows))
}

/// Install Software endpoint.
///
/// - **URL:** `/api/software/<id>/installations`
/// - **Method:** `POST`
/// - **Purpose:** Records an installation and consumes one seat
/// - **Authentication:** Required
///
/// # Request Format
///
/// ```json
/// {"device_id": 7, "notes": "imaged"}
/// ```
///
/// **Failure:** `400 Bad Request` when no seat is free or the software is
/// already on the device.
#[post("/software/<id>/installations", data = "<body>")]
pub async fn install_software_endpoint(
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::Created<Json<InstallationView>>, InventoryError> {
    let input: InstallationInput = decode(body.into_inner())?;
    let now = state.clock.now();
    let events = state.events.clone();
    let installed_by = auth.user.id;
    let view = db
        .run(move |conn| {
            install_software(conn, id, input, Some(installed_by), now, events.as_ref())
        })
        .await?;
    log_action(
        &auth,
        "api_software_install",
        format!("Installed {} on {}", view.software.name, view.device.asset_tag),
    );
    Ok(status::Created::new(format!("/api/installations/{}", view.id)).body(Json(view)))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_software_endpoint,
        get_software_endpoint,
        create_software_endpoint,
        replace_software_endpoint,
        patch_software_endpoint,
        delete_software_endpoint,
        expiring_soon,
        expired,
        low_seats,
        list_installations_endpoint,
        install_software_endpoint
    ]
}
