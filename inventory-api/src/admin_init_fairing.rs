use diesel::prelude::*;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use tracing::{error, info};

use crate::clock::Clock;
use crate::error::InventoryError;
use crate::models::UserInput;
use crate::orm::DbConn;
use crate::orm::login::hash_password;
use crate::orm::user::{get_user_by_username, insert_user};

/// Adds the default login principal if it is missing.
///
/// The username and password come from INVENTORY_DEFAULT_USERNAME and
/// INVENTORY_DEFAULT_PASSWORD (see [`crate::config::AppConfig`]).
pub fn admin_init_fairing(
    username: String,
    password: String,
    clock: std::sync::Arc<dyn Clock>,
) -> AdHoc {
    AdHoc::try_on_ignite("Admin User Initialization", move |rocket| async move {
        let Some(conn) = get_db_connection(&rocket).await else {
            return Err(rocket);
        };
        let now = clock.now();
        let result = conn
            .run(move |c| create_admin_user_if_needed(c, &username, &password, now))
            .await;
        match result {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[admin-init] FATAL: admin user creation failed: {}", e);
                Err(rocket)
            }
        }
    })
}

async fn get_db_connection(rocket: &Rocket<Build>) -> Option<DbConn> {
    let conn = DbConn::get_one(rocket).await;
    if conn.is_none() {
        error!("[admin-init] ERROR: could not get DB connection.");
    }
    conn
}

fn create_admin_user_if_needed(
    c: &mut SqliteConnection,
    username: &str,
    password: &str,
    now: chrono::NaiveDateTime,
) -> Result<(), InventoryError> {
    if get_user_by_username(c, username)?.is_some() {
        info!("[admin-init] admin user '{}' already exists", username);
        return Ok(());
    }

    let user = insert_user(
        c,
        UserInput {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            ..Default::default()
        },
        now,
    )?;
    info!(
        target: "inventory_api::security",
        "[admin-init] created admin user '{}' (id {})",
        user.username,
        user.id
    );
    Ok(())
}
