//! Uninstall endpoint. Listing and installing live under `/api/software`.

use rocket::response::status;
use rocket::{Route, State, delete, routes};

use super::log_action;
use crate::AppState;
use crate::error::InventoryError;
use crate::orm::DbConn;
use crate::orm::installation::uninstall_software;
use crate::session_guards::AuthenticatedUser;

/// Uninstall Software endpoint.
///
/// - **URL:** `/api/installations/<id>`
/// - **Method:** `DELETE`
/// - **Purpose:** Removes the installation and frees its seat
/// - **Authentication:** Required
///
/// Returns `204 No Content`.
#[delete("/installations/<id>")]
pub async fn uninstall_endpoint(
    id: i32,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<status::NoContent, InventoryError> {
    let now = state.clock.now();
    let events = state.events.clone();
    db.run(move |conn| uninstall_software(conn, id, now, events.as_ref())).await?;
    log_action(&auth, "api_software_uninstall", format!("Removed installation ID: {}", id));
    Ok(status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![uninstall_endpoint]
}
