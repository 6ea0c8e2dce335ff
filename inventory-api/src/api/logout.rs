//! Session logout.

use rocket::http::{Cookie, CookieJar};
use rocket::serde::json::{Json, Value, json};
use rocket::{Route, post, routes};
use tracing::info;

use crate::error::InventoryError;
use crate::orm::DbConn;
use crate::orm::login::SESSION_COOKIE;
use crate::orm::logout::revoke_session;
use crate::session_guards::AuthenticatedUser;

/// Logout endpoint.
///
/// - **URL:** `/api/logout`
/// - **Method:** `POST`
/// - **Purpose:** Revokes the current session and clears its cookie
/// - **Authentication:** Required
///
/// The revoked token is refused by every later request, even if a client
/// keeps sending it.
#[post("/logout")]
pub async fn logout(
    db: DbConn,
    cookies: &CookieJar<'_>,
    auth: AuthenticatedUser,
) -> Result<Json<Value>, InventoryError> {
    let token = auth.session_id.clone();
    db.run(move |conn| revoke_session(conn, &token)).await?;
    cookies.remove(Cookie::from(SESSION_COOKIE));
    info!(target: "inventory_api::security", "User logged out - Username: {}", auth.user.username);
    Ok(Json(json!({"status": "Logged out"})))
}

pub fn routes() -> Vec<Route> {
    routes![logout]
}
