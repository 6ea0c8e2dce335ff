//! Dashboard endpoints.

use rocket::serde::json::Json;
use rocket::{Route, State, get, routes};

use super::log_action;
use crate::AppState;
use crate::error::InventoryError;
use crate::orm::DbConn;
use crate::orm::dashboard::{DashboardStats, RecentActivity, dashboard_stats, recent_activity};
use crate::session_guards::AuthenticatedUser;

/// Dashboard Stats endpoint.
///
/// - **URL:** `/api/dashboard/stats`
/// - **Method:** `GET`
/// - **Purpose:** Inventory headline counts
/// - **Authentication:** Required
///
/// # Response
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "total_devices": 120,
///   "active_devices": 97,
///   "devices_needing_maintenance": 4,
///   "devices_under_warranty": 88,
///   "total_software": 31,
///   "expiring_licenses": 2,
///   "expired_licenses": 1,
///   "pending_maintenance": 3
/// }
/// ```
#[get("/dashboard/stats")]
pub async fn stats(
    db: DbConn,
    state: &State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<DashboardStats>, InventoryError> {
    let now = state.clock.now();
    let stats = db.run(move |conn| dashboard_stats(conn, now)).await?;
    log_action(&auth, "api_dashboard_stats", "Retrieved dashboard statistics");
    Ok(Json(stats))
}

/// Recent Activity endpoint.
///
/// - **URL:** `/api/dashboard/recent`
/// - **Method:** `GET`
/// - **Purpose:** The five newest devices and maintenance records
/// - **Authentication:** Required
#[get("/dashboard/recent")]
pub async fn recent(
    db: DbConn,
    state: &State<AppState>,
    _auth: AuthenticatedUser,
) -> Result<Json<RecentActivity>, InventoryError> {
    let now = state.clock.now();
    Ok(Json(db.run(move |conn| recent_activity(conn, now)).await?))
}

pub fn routes() -> Vec<Route> {
    routes![stats, recent]
}
