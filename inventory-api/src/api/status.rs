//! Liveness probe. The only route besides login that needs no session.

use diesel::RunQueryDsl;
use rocket::{Route, get, routes, serde::json::Json};
use serde::Serialize;
use tracing::warn;
use ts_rs::TS;

use crate::orm::DbConn;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    status: &'static str,
    database: &'static str,
    version: &'static str,
    built: &'static str,
    git_commit: Option<&'static str>,
}

/// `GET /api/status`
///
/// ```json
/// {
///   "status": "running",
///   "database": "ok",
///   "version": "0.1.0",
///   "built": "Thu, 16 Jan 2025 09:12:01 +0000",
///   "git_commit": "4f1c0e2d9a7b..."
/// }
/// ```
///
/// `database` reads `"unavailable"` when a trivial query fails; the
/// response is still 200.
#[get("/status")]
pub async fn health_status(db: DbConn) -> Json<HealthStatus> {
    let database = match db.run(|c| diesel::sql_query("SELECT 1").execute(c)).await {
        Ok(_) => "ok",
        Err(e) => {
            warn!(target: "inventory_api::database", "status probe query failed: {}", e);
            "unavailable"
        }
    };
    Json(HealthStatus {
        status: "running",
        database,
        version: env!("CARGO_PKG_VERSION"),
        built: built_info::BUILT_TIME_UTC,
        git_commit: built_info::GIT_COMMIT_HASH,
    })
}

pub fn routes() -> Vec<Route> {
    routes![health_status]
}
