//! API endpoints for inventory audits and their checked items.

use rocket::http::uri::Origin;
use rocket::response::status;
use rocket::serde::json::{Json, Value};
use rocket::{Route, State, delete, get, patch, post, routes};

use super::{RequestUrl, log_action};
use crate::AppState;
use crate::error::InventoryError;
use crate::models::{AuditInput, AuditItemInput, AuditItemView, AuditView};
use crate::orm::DbConn;
use crate::orm::audit::{
    add_audit_item, audit_view, create_audit, delete_audit, delete_audit_item, get_audit,
    list_audit_items, list_audits, update_audit,
};
use crate::payload::{decode, merge_patch};
use crate::query::{Page, PageRequest};
use crate::session_guards::AuthenticatedUser;

/// List Audits endpoint.
///
/// - **URL:** `/api/audits`
/// - **Method:** `GET`
/// - **Purpose:** Audits, newest start date first, with `item_count` and
///   `completion_status`
/// - **Authentication:** Required
#[get("/audits?<page>&<page_size>")]
pub async fn list_audits_endpoint(
    page: Option<i64>,
    page_size: Option<i64>,
    uri: &Origin<'_>,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<Page<AuditView>>, InventoryError> {
    let now = state.clock.now();
    let request = PageRequest::new(page, page_size, state.page_size);
    let url = RequestUrl::new(uri);
    let page = db.run(move |conn| list_audits(conn, &request, now)).await?;
    Ok(Json(url.link(page, &request)))
}

/// Create Audit endpoint.
///
/// - **URL:** `/api/audits`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// The caller is recorded as the auditor. `start_date` defaults to now.
///
/// # Request Format
///
/// ```json
/// {"audit_type": "full", "title": "Q1 count", "description": "All sites"}
/// ```
#[post("/audits", data = "<body>")]
pub async fn create_audit_endpoint(
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::Created<Json<AuditView>>, InventoryError> {
    let input: AuditInput = decode(body.into_inner())?;
    let now = state.clock.now();
    let events = state.events.clone();
    let conducted_by = auth.user.id;
    let view = db
        .run(move |conn| {
            let audit = create_audit(conn, input, conducted_by, now, events.as_ref())?;
            audit_view(conn, audit, now)
        })
        .await?;
    log_action(&auth, "api_audit_create", format!("Created audit ID: {}", view.id));
    Ok(status::Created::new(format!("/api/audits/{}", view.id)).body(Json(view)))
}

/// Get Audit endpoint.
///
/// - **URL:** `/api/audits/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/audits/<id>")]
pub async fn get_audit_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<AuditView>, InventoryError> {
    let now = state.clock.now();
    let view = db
        .run(move |conn| {
            let audit = get_audit(conn, id)?;
            audit_view(conn, audit, now)
        })
        .await?;
    Ok(Json(view))
}

/// Patch Audit endpoint.
///
/// - **URL:** `/api/audits/<id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
///
/// Setting `end_date` completes the audit.
#[patch("/audits/<id>", data = "<body>")]
pub async fn patch_audit_endpoint(
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<AuditView>, InventoryError> {
    let now = state.clock.now();
    let events = state.events.clone();
    let patch = body.into_inner();
    let view = db
        .run(move |conn| {
            let current = get_audit(conn, id)?;
            let input: AuditInput = decode(merge_patch(&AuditInput::from(&current), patch)?)?;
            let audit = update_audit(conn, id, input, now, events.as_ref())?;
            audit_view(conn, audit, now)
        })
        .await?;
    log_action(&auth, "api_audit_update", format!("Patched audit ID: {}", id));
    Ok(Json(view))
}

/// Delete Audit endpoint.
///
/// - **URL:** `/api/audits/<id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
///
/// The audit's items go with it. Returns `204 No Content`.
#[delete("/audits/<id>")]
pub async fn delete_audit_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::NoContent, InventoryError> {
    let events = state.events.clone();
    db.run(move |conn| delete_audit(conn, id, events.as_ref())).await?;
    log_action(&auth, "api_audit_delete", format!("Deleted audit ID: {}", id));
    Ok(status::NoContent)
}

/// List Audit Items endpoint.
///
/// - **URL:** `/api/audits/<id>/items`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/audits/<id>/items")]
pub async fn list_items_endpoint(
    id: i32,
    db: DbConn,
    _auth: AuthenticatedUser,
) -> Result<Json<Vec<AuditItemView>>, InventoryError> {
    Ok(Json(db.run(move |conn| list_audit_items(conn, id)).await?))
}

/// Add Audit Item endpoint.
///
/// - **URL:** `/api/audits/<id>/items`
/// - **Method:** `POST`
/// - **Purpose:** Records one device as checked
/// - **Authentication:** Required
///
/// # Request Format
///
/// ```json
/// {"device_id": 7, "found": true, "actual_location_id": 2, "condition": "good"}
/// ```
///
/// **Failure:** `400 Bad Request` when the device is already in the audit.
#[post("/audits/<id>/items", data = "<body>")]
pub async fn add_item_endpoint(
    id: i32,
    body: Json<Value>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::Created<Json<AuditItemView>>, InventoryError> {
    let input: AuditItemInput = decode(body.into_inner())?;
    let now = state.clock.now();
    let events = state.events.clone();
    let view = db
        .run(move |conn| add_audit_item(conn, id, input, now, events.as_ref()))
        .await?;
    log_action(
        &auth,
        "api_audit_item_add",
        format!("Audit {}: checked {}", id, view.device.asset_tag),
    );
    Ok(status::Created::new(format!("/api/audit-items/{}", view.id)).body(Json(view)))
}

/// Delete Audit Item endpoint.
///
/// - **URL:** `/api/audit-items/<id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
///
/// Returns `204 No Content`.
#[delete("/audit-items/<id>")]
pub async fn delete_item_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::NoContent, InventoryError> {
    let events = state.events.clone();
    db.run(move |conn| delete_audit_item(conn, id, events.as_ref())).await?;
    log_action(&auth, "api_audit_item_delete", format!("Deleted audit item ID: {}", id));
    Ok(status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        list_audits_endpoint,
        create_audit_endpoint,
        get_audit_endpoint,
        patch_audit_endpoint,
        delete_audit_endpoint,
        list_items_endpoint,
        add_item_endpoint,
        delete_item_endpoint
    ]
}
