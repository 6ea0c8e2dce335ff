//! Login and the current-user endpoint.

use std::net::IpAddr;

use rocket::http::{CookieJar, Status};
use rocket::response::status;
use rocket::serde::json::{Json, Value, json};
use rocket::{Route, State, get, post, routes};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::AppState;
use crate::error::{FieldErrors, InventoryError};
use crate::models::UserSummary;
use crate::orm::DbConn;
use crate::orm::login::{authenticate, create_session, set_session_cookie};
use crate::session_guards::AuthenticatedUser;

#[derive(Deserialize, Serialize, TS, Debug)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

type LoginError = status::Custom<Json<Value>>;

fn reject(err: InventoryError) -> LoginError {
    status::Custom(err.status(), Json(err.body()))
}

fn blank_fields(login: &LoginRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if login.username.trim().is_empty() {
        errors.add("username", "This field may not be blank.");
    }
    if login.password.is_empty() {
        errors.add("password", "This field may not be blank.");
    }
    errors
}

/// Login endpoint.
///
/// - **URL:** `/api/login`
/// - **Method:** `POST`
/// - **Purpose:** Checks credentials and opens a session
/// - **Authentication:** None required
///
/// On success the response sets an HTTP-only `session` cookie that every
/// other endpoint reads.
///
/// # Request Format
///
/// ```json
/// {
///   "username": "admin",
///   "password": "admin"
/// }
/// ```
///
/// # Response
///
/// **Success (HTTP 200 OK):** the user summary
/// ```json
/// {
///   "id": 1, "username": "admin", "first_name": "", "last_name": "",
///   "email": "", "full_name": "admin"
/// }
/// ```
///
/// **Failure:**
/// - `400 Bad Request` when a field is blank
/// - `401 Unauthorized` with `{"error": "Invalid credentials"}`
#[post("/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    cookies: &CookieJar<'_>,
    state: &State<AppState>,
    client_ip: Option<IpAddr>,
    login: Json<LoginRequest>,
) -> Result<Json<UserSummary>, LoginError> {
    let login = login.into_inner();
    blank_fields(&login).into_result().map_err(reject)?;

    let now = state.clock.now();
    let username = login.username.clone();
    let outcome = db
        .run(move |conn| {
            let Some(user) = authenticate(conn, &login.username, &login.password)? else {
                return Ok(None);
            };
            let token = create_session(conn, user.id, now)?;
            Ok::<_, InventoryError>(Some((user, token)))
        })
        .await
        .map_err(reject)?;

    let ip = client_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string());
    match outcome {
        Some((user, token)) => {
            set_session_cookie(cookies, &token);
            info!(
                target: "inventory_api::security",
                "User logged in - Username: {}, IP: {}",
                user.username,
                ip
            );
            Ok(Json(user.summary()))
        }
        None => {
            warn!(
                target: "inventory_api::security",
                "Failed login attempt - Username: {}, IP: {}",
                username,
                ip
            );
            Err(status::Custom(Status::Unauthorized, Json(json!({"error": "Invalid credentials"}))))
        }
    }
}

/// Current user endpoint.
///
/// - **URL:** `/api/hello`
/// - **Method:** `GET`
/// - **Purpose:** Returns the user behind the session cookie
/// - **Authentication:** Required
#[get("/hello")]
pub fn hello(auth: AuthenticatedUser) -> Json<UserSummary> {
    Json(auth.user.summary())
}

pub fn routes() -> Vec<Route> {
    routes![login, hello]
}
