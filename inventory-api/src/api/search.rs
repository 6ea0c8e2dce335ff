//! Global search endpoint.

use rocket::serde::json::Json;
use rocket::{Route, State, get, routes};

use super::log_action;
use crate::AppState;
use crate::error::InventoryError;
use crate::orm::DbConn;
use crate::orm::search::{SearchResults, global_search};
use crate::session_guards::AuthenticatedUser;

/// Global Search endpoint.
///
/// - **URL:** `/api/search?q=<term>`
/// - **Method:** `GET`
/// - **Purpose:** Case-insensitive match across devices, software and
///   locations
/// - **Authentication:** Required
///
/// Returns at most 10 devices, 10 software records and 5 locations. A blank
/// or missing `q` gives empty lists.
#[get("/search?<q>")]
pub async fn search(
    q: Option<String>,
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<SearchResults>, InventoryError> {
    let now = state.clock.now();
    let q = q.unwrap_or_default();
    let results = db.run(move |conn| global_search(conn, &q, now)).await?;
    log_action(
        &auth,
        "api_search",
        format!(
            "Query '{}': {} devices, {} software, {} locations",
            results.query,
            results.devices.len(),
            results.software.len(),
            results.locations.len()
        ),
    );
    Ok(Json(results))
}

pub fn routes() -> Vec<Route> {
    routes![search]
}
