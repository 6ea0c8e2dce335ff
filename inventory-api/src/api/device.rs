//! API endpoints for the four device collections.
//!
//! `devices`, `network-devices`, `computers` and `peripherals` share one set
//! of handlers. The first path segment picks the collection; the generic
//! `devices` collection sees every device and ignores specialization fields
//! on write.
//!
//! These routes carry explicit ranks so that the fixed collections
//! (`software`, `maintenance`, ...) always match first.

use rocket::http::uri::Origin;
use rocket::response::status;
use rocket::serde::json::{Json, Value, json};
use rocket::{Route, State, delete, get, patch, post, put, routes};

use super::{RequestUrl, log_action};
use crate::AppState;
use crate::choices::DeviceStatus;
use crate::error::InventoryError;
use crate::models::{DeviceCollection, DeviceView};
use crate::orm::DbConn;
use crate::orm::device::{
    create_device, delete_device, device_view, devices_where, get_device, list_devices,
    set_device_status, update_device,
};
use crate::payload::{device_json, device_write_from_json, merge_patch};
use crate::policy::DevicePredicate;
use crate::query::device::{DEFAULT_ORDERING, DeviceFilter, ORDERING_FIELDS};
use crate::query::{Page, PageRequest, parse_ordering, search_term};
use crate::session_guards::AuthenticatedUser;

/// Unknown collection segments answer `404`, like any unknown path.
fn collection(segment: &str) -> Result<DeviceCollection, InventoryError> {
    DeviceCollection::from_segment(segment).ok_or_else(|| InventoryError::not_found("Resource"))
}

/// List Devices endpoint.
///
/// - **URL:** `/api/<collection>`
/// - **Method:** `GET`
/// - **Purpose:** Filtered, searched, ordered and paginated device listing
/// - **Authentication:** Required
///
/// # Query Parameters
/// - Any field of [`DeviceFilter`], e.g. `status=active`, `category=1&category=2`,
///   `warranty_expiry_from=2025-01-01`, `needs_maintenance=true`
/// - `search`: substring over asset tag, serial number, model and notes
///   (plus the collection's own text fields)
/// - `ordering`: `asset_tag`, `model`, `created_at`, `purchase_date`, `-` to
///   reverse
/// - `page`, `page_size`
///
/// # Response
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {"count": 42, "next": "/api/devices?page=3", "previous": "/api/devices", "results": [...]}
/// ```
///
/// **Failure:** `404 Not Found` for a page past the end.
#[allow(clippy::too_many_arguments)]
#[get("/<segment>?<search>&<ordering>&<page>&<page_size>&<filter..>", rank = 3)]
pub async fn list_devices_endpoint(
    segment: &str,
    filter: DeviceFilter,
    search: Option<&str>,
    ordering: Option<&str>,
    page: Option<i64>,
    page_size: Option<i64>,
    uri: &Origin<'_>,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Page<DeviceView>>, InventoryError> {
    let collection = collection(segment)?;
    let now = state.clock.now();
    let request = PageRequest::new(page, page_size, state.page_size);
    let ordering = parse_ordering(ordering, ORDERING_FIELDS, DEFAULT_ORDERING);
    let search = search_term(search);
    let url = RequestUrl::new(uri);

    let page = db
        .run(move |conn| {
            list_devices(conn, collection, &filter, search.as_deref(), &ordering, &request, now)
        })
        .await?;
    Ok(Json(url.link(page, &request)))
}

/// Get Device endpoint.
///
/// - **URL:** `/api/<collection>/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// A device of another kind is `404` in a specialized collection.
#[get("/<segment>/<id>", rank = 3)]
pub async fn get_device_endpoint(
    segment: &str,
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<DeviceView>, InventoryError> {
    let collection = collection(segment)?;
    let now = state.clock.now();
    let view = db
        .run(move |conn| {
            let record = get_device(conn, collection, id)?;
            device_view(conn, record, now)
        })
        .await?;
    Ok(Json(view))
}

/// Create Device endpoint.
///
/// - **URL:** `/api/<collection>`
/// - **Method:** `POST`
/// - **Purpose:** Creates a device, with its specialization row for the
///   specialized collections
/// - **Authentication:** Required
///
/// # Request Format
///
/// ```json
/// {
///   "asset_tag": "LT-0042",
///   "model": "Latitude 7440",
///   "category_id": 1,
///   "status": "active",
///   "computer_type": "laptop",
///   "mac_address": "AA:BB:CC:DD:EE:FF",
///   "memory_gb": 16
/// }
/// ```
///
/// # Response
///
/// **Success (HTTP 201 Created):** the stored device.
///
/// **Failure:** `400 Bad Request` with `{"field": ["message", ...]}`.
#[post("/<segment>", data = "<body>", rank = 3)]
pub async fn create_device_endpoint(
    segment: &str,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::Created<Json<DeviceView>>, InventoryError> {
    let collection = collection(segment)?;
    let now = state.clock.now();
    let events = state.events.clone();
    let write = device_write_from_json(collection, body.into_inner())?;

    let view = db
        .run(move |conn| {
            let record = create_device(conn, collection, write, now, events.as_ref())?;
            device_view(conn, record, now)
        })
        .await?;
    log_action(&auth, "api_device_create", format!("Created device ID: {}", view.id));
    let location = format!("/api/{}/{}", collection.segment(), view.id);
    Ok(status::Created::new(location).body(Json(view)))
}

/// Replace Device endpoint.
///
/// - **URL:** `/api/<collection>/<id>`
/// - **Method:** `PUT`
/// - **Purpose:** Full update; omitted fields take their defaults
/// - **Authentication:** Required
#[put("/<segment>/<id>", data = "<body>", rank = 3)]
pub async fn replace_device_endpoint(
    segment: &str,
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<DeviceView>, InventoryError> {
    let collection = collection(segment)?;
    let now = state.clock.now();
    let events = state.events.clone();
    let body = body.into_inner();

    let view = db
        .run(move |conn| {
            get_device(conn, collection, id)?;
            let write = device_write_from_json(collection, body)?;
            let record = update_device(conn, collection, id, write, now, events.as_ref())?;
            device_view(conn, record, now)
        })
        .await?;
    log_action(&auth, "api_device_update", format!("Updated device ID: {}", id));
    Ok(Json(view))
}

/// Patch Device endpoint.
///
/// - **URL:** `/api/<collection>/<id>`
/// - **Method:** `PATCH`
/// - **Purpose:** Partial update; only the keys present change
/// - **Authentication:** Required
///
/// The patched state is validated exactly like a full write.
#[patch("/<segment>/<id>", data = "<body>", rank = 3)]
pub async fn patch_device_endpoint(
    segment: &str,
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<DeviceView>, InventoryError> {
    let collection = collection(segment)?;
    let now = state.clock.now();
    let events = state.events.clone();
    let patch = body.into_inner();

    let view = db
        .run(move |conn| {
            let current = get_device(conn, collection, id)?;
            let merged = merge_patch(&device_json(&current)?, patch)?;
            let write = device_write_from_json(collection, merged)?;
            let record = update_device(conn, collection, id, write, now, events.as_ref())?;
            device_view(conn, record, now)
        })
        .await?;
    log_action(&auth, "api_device_update", format!("Patched device ID: {}", id));
    Ok(Json(view))
}

/// Delete Device endpoint.
///
/// - **URL:** `/api/<collection>/<id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
///
/// Deleting a device removes its specialization row, its maintenance
/// records, installations and audit items. Returns `204 No Content`.
#[delete("/<segment>/<id>", rank = 3)]
pub async fn delete_device_endpoint(
    segment: &str,
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::NoContent, InventoryError> {
    let collection = collection(segment)?;
    let events = state.events.clone();
    db.run(move |conn| delete_device(conn, collection, id, events.as_ref())).await?;
    log_action(&auth, "api_device_delete", format!("Deleted device ID: {}", id));
    Ok(status::NoContent)
}

async fn mark(
    segment: &str,
    id: i32,
    target: DeviceStatus,
    db: DbConn,
    state: &State<AppState>,
    auth: &AuthenticatedUser,
) -> Result<Json<Value>, InventoryError> {
    let collection = collection(segment)?;
    let now = state.clock.now();
    let events = state.events.clone();
    let record = db
        .run(move |conn| set_device_status(conn, collection, id, target, now, events.as_ref()))
        .await?;

    let message = match target {
        DeviceStatus::Maintenance => "Device marked for maintenance".to_string(),
        other => format!("Device marked as {}", other.code()),
    };
    log_action(
        auth,
        &format!("api_device_{}", target.code()),
        format!("Marked device {} as {}", record.device.asset_tag, target.code()),
    );
    Ok(Json(json!({ "status": message })))
}

/// Mark Maintenance endpoint.
///
/// - **URL:** `/api/<collection>/<id>/mark_maintenance`
/// - **Method:** `POST`
/// - **Purpose:** Sets the device status to `maintenance`
/// - **Authentication:** Required
///
/// **Success (HTTP 200 OK):** `{"status": "Device marked for maintenance"}`
#[post("/<segment>/<id>/mark_maintenance", rank = 3)]
pub async fn mark_maintenance(
    segment: &str,
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Value>, InventoryError> {
    mark(segment, id, DeviceStatus::Maintenance, db, state, &auth).await
}

/// Mark Active endpoint.
///
/// - **URL:** `/api/<collection>/<id>/mark_active`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// **Success (HTTP 200 OK):** `{"status": "Device marked as active"}`
#[post("/<segment>/<id>/mark_active", rank = 3)]
pub async fn mark_active(
    segment: &str,
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Value>, InventoryError> {
    mark(segment, id, DeviceStatus::Active, db, state, &auth).await
}

/// Mark Retired endpoint.
///
/// - **URL:** `/api/<collection>/<id>/mark_retired`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// **Success (HTTP 200 OK):** `{"status": "Device marked as retired"}`
#[post("/<segment>/<id>/mark_retired", rank = 3)]
pub async fn mark_retired(
    segment: &str,
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Value>, InventoryError> {
    mark(segment, id, DeviceStatus::Retired, db, state, &auth).await
}

async fn report(
    segment: &str,
    predicate: DevicePredicate,
    db: DbConn,
    state: &State<AppState>,
    auth: &AuthenticatedUser,
) -> Result<Json<Vec<DeviceView>>, InventoryError> {
    let collection = collection(segment)?;
    let now = state.clock.now();
    let rows = db.run(move |conn| devices_where(conn, collection, predicate, now)).await?;
    log_action(
        auth,
        &format!("api_devices_{}", predicate.name()),
        format!("Found {} devices in {}", rows.len(), collection.segment()),
    );
    Ok(Json(rows))
}

/// Devices Needing Maintenance endpoint.
///
/// - **URL:** `/api/<collection>/needs_maintenance`
/// - **Method:** `GET`
/// - **Purpose:** Every device whose next maintenance is due; not paginated
/// - **Authentication:** Required
#[get("/<segment>/needs_maintenance", rank = 2)]
pub async fn needs_maintenance(
    segment: &str,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<DeviceView>>, InventoryError> {
    report(segment, DevicePredicate::NeedsMaintenance, db, state, &auth).await
}

/// Devices Under Warranty endpoint.
///
/// - **URL:** `/api/<collection>/under_warranty`
/// - **Method:** `GET`
/// - **Purpose:** Every device whose warranty ends after today; not paginated
/// - **Authentication:** Required
#[get("/<segment>/under_warranty", rank = 2)]
pub async fn under_warranty(
    segment: &str,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<DeviceView>>, InventoryError> {
    report(segment, DevicePredicate::UnderWarranty, db, state, &auth).await
}

pub fn routes() -> Vec<Route> {
    routes![
        list_devices_endpoint,
        get_device_endpoint,
        create_device_endpoint,
        replace_device_endpoint,
        patch_device_endpoint,
        delete_device_endpoint,
        mark_maintenance,
        mark_active,
        mark_retired,
        needs_maintenance,
        under_warranty
    ]
}
