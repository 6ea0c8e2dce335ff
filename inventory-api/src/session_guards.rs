//! Session-based authentication guard for Rocket routes.
//!
//! ```rust,ignore
//! use rocket::get;
//! use inventory_api::session_guards::AuthenticatedUser;
//!
//! #[get("/profile")]
//! fn profile(auth: AuthenticatedUser) -> String {
//!     format!("Welcome, {}!", auth.user.username)
//! }
//! ```
//!
//! Every inventory route takes an [`AuthenticatedUser`]; a request without a
//! live session is answered with `401` by the JSON catcher.

use rocket::State;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use tracing::{error, warn};

use crate::AppState;
use crate::models::User;
use crate::orm::DbConn;
use crate::orm::login::{SESSION_COOKIE, session_user};

/// The principal of the current request, remembered for the request log.
#[derive(Debug, Clone, Default)]
pub struct RequestUser(pub Option<String>);

/// A request guard for routes that require an authenticated user.
///
/// The `session` cookie must name a session that exists, is not revoked and
/// has not expired. Anything else fails with `401 Unauthorized`.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session_id: String,
}

fn client_ip(request: &Request<'_>) -> String {
    request.client_ip().map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string())
}

fn deny(request: &Request<'_>, reason: &str) -> request::Outcome<AuthenticatedUser, ()> {
    warn!(
        target: "inventory_api::security",
        "Unauthorized access attempt - Path: {}, IP: {}, Reason: {}",
        request.uri().path(),
        client_ip(request),
        reason
    );
    Outcome::Error((Status::Unauthorized, ()))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(token) = request.cookies().get(SESSION_COOKIE).map(|c| c.value().to_string())
        else {
            return deny(request, "no session cookie");
        };

        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => {
                error!("no database connection available for session lookup");
                return Outcome::Error((Status::ServiceUnavailable, ()));
            }
        };
        let now = match request.guard::<&State<AppState>>().await {
            Outcome::Success(state) => state.clock.now(),
            _ => {
                error!("application state is not managed");
                return Outcome::Error((Status::InternalServerError, ()));
            }
        };

        let lookup = token.clone();
        match db.run(move |conn| session_user(conn, &lookup, now)).await {
            Ok(Some(user)) => {
                request.local_cache(|| RequestUser(Some(user.username.clone())));
                Outcome::Success(AuthenticatedUser { user, session_id: token })
            }
            Ok(None) => deny(request, "invalid or expired session"),
            Err(e) => {
                error!("session lookup failed: {}", e);
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}
