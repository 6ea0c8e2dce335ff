//! HTTP endpoints, mounted under `/api`.
//!
//! Every route except `POST /api/login` and `GET /api/status` takes an
//! [`AuthenticatedUser`](crate::session_guards::AuthenticatedUser) guard.
//! Handlers run their repository call on a pooled connection through
//! `db.run` and return [`InventoryError`](crate::error::InventoryError) on
//! failure, which renders the JSON error body.

use std::fmt::Display;

use rocket::Route;
use rocket::http::uri::Origin;
use tracing::info;

use crate::query::{Page, PageRequest};
use crate::session_guards::AuthenticatedUser;

pub mod audit;
pub mod dashboard;
pub mod device;
pub mod export;
pub mod installation;
pub mod login;
pub mod logout;
pub mod maintenance;
pub mod reference;
pub mod search;
pub mod software;
pub mod status;

/// Returns every API route.
pub fn routes() -> Vec<Route> {
    [
        status::routes(),
        login::routes(),
        logout::routes(),
        device::routes(),
        software::routes(),
        installation::routes(),
        maintenance::routes(),
        reference::routes(),
        dashboard::routes(),
        search::routes(),
        export::routes(),
        audit::routes(),
    ]
    .concat()
}

/// The request URL split into the parts page links are built from.
#[derive(Debug, Clone)]
pub(crate) struct RequestUrl {
    path: String,
    query: Option<String>,
}

impl RequestUrl {
    pub(crate) fn new(uri: &Origin<'_>) -> Self {
        RequestUrl {
            path: uri.path().as_str().to_string(),
            query: uri.query().map(|q| q.as_str().to_string()),
        }
    }

    pub(crate) fn link<T>(&self, page: Page<T>, request: &PageRequest) -> Page<T> {
        page.with_links(&self.path, self.query.as_deref(), request)
    }
}

/// Audit line for a user-initiated change or report.
pub(crate) fn log_action(auth: &AuthenticatedUser, action: &str, details: impl Display) {
    info!(
        target: "inventory_api::api",
        "User action - User: {}, Action: {}, Details: {}",
        auth.user.username,
        action,
        details
    );
}
