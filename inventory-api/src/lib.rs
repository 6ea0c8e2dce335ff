use std::sync::Arc;

use rocket::figment::value::Map;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket, catch, catchers};
use tracing::{info, warn};

pub mod admin_init_fairing;
pub mod api;
pub mod choices;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod payload;
pub mod policy;
pub mod projection;
pub mod query;
pub mod request_log;
pub mod schema;
pub mod session_guards;
pub mod validation;

#[cfg(test)]
pub mod generate_types;

use crate::clock::{Clock, SystemClock};
use crate::config::{AppConfig, ConfigError, HostCheck};
use crate::events::{ChangeSink, TracingSink};
use crate::request_log::RequestLogger;

/// Shared per-process state handed to every handler.
pub struct AppState {
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn ChangeSink>,
    /// Default REST page size.
    pub page_size: i64,
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Authentication credentials were not provided.",
        "path": req.uri().path().to_string(),
        "status": 401
    }))
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Forbidden",
        "path": req.uri().path().to_string(),
        "status": 403
    }))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Not Found",
        "path": req.uri().path().to_string(),
        "status": 404
    }))
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unprocessable Entity",
        "path": req.uri().path().to_string(),
        "status": 422
    }))
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Internal Server Error",
        "path": req.uri().path().to_string(),
        "status": 500
    }))
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    Json(json!({
        "error": status.reason().unwrap_or("Unknown Error"),
        "path": req.uri().path().to_string(),
        "status": status.code
    }))
}

pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api::routes())
}

fn log_rocket_info(rocket: &Rocket<Build>) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }
}

/// Assembles the application over `figment`. Production goes through
/// [`rocket`]; the test fixtures pass an in-memory database, a fixed clock
/// and a recording sink.
pub fn build_rocket(
    figment: Figment,
    config: &AppConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn ChangeSink>,
) -> Rocket<Build> {
    let rocket = rocket::custom(figment)
        .manage(AppState { clock: clock.clone(), events, page_size: config.page_size })
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(admin_init_fairing::admin_init_fairing(
            config.default_username.clone(),
            config.default_password.clone(),
            clock,
        ))
        .attach(RequestLogger)
        .attach(HostCheck::new(config.allowed_hosts.clone()))
        .register(
            "/",
            catchers![
                unauthorized,
                forbidden,
                not_found,
                unprocessable_entity,
                internal_server_error,
                default_catcher
            ],
        );

    log_rocket_info(&rocket);
    mount_api_routes(rocket)
}

/// The production server: `Rocket.toml`, `ROCKET_*` variables, then the
/// database URL and secret key from `config`.
///
/// Note that this function doesn't get tested by our tests. Tests build
/// their in-memory rocket through `orm::testing`.
pub fn rocket(config: &AppConfig) -> Result<Rocket<Build>, ConfigError> {
    let database_url = config.database_url()?;

    let mut figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(("databases.sqlite_db.url", database_url));
    if let Some(secret_key) = &config.secret_key {
        figment = figment.merge(("secret_key", secret_key.as_str()));
    }

    Ok(build_rocket(figment, config, Arc::new(SystemClock), Arc::new(TracingSink)))
}
