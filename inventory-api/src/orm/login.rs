//! Password hashing and session storage.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::http::{Cookie, CookieJar, SameSite};
use tracing::warn;

use crate::error::InventoryError;
use crate::models::{LoginSession, User};
use crate::orm::db::transact;
use crate::orm::user::get_user_by_username;
use crate::schema::{sessions, users};

pub const SESSION_COOKIE: &str = "session";

pub fn hash_password(password: &str) -> Result<String, InventoryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| InventoryError::Internal(format!("password hashing failed: {}", e)))
}

/// False for a wrong password and for a stored hash that does not parse.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!(target: "inventory_api::security", "unreadable password hash: {}", e);
            false
        }
    }
}

/// The user whose credentials match, if any. Unknown users and wrong
/// passwords are indistinguishable to the caller.
pub fn authenticate(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<Option<User>, InventoryError> {
    let Some(user) = get_user_by_username(conn, username)? else {
        return Ok(None);
    };
    Ok(verify_password(password, &user.password_hash).then_some(user))
}

pub fn create_session(
    conn: &mut SqliteConnection,
    user_id: i32,
    now: NaiveDateTime,
) -> Result<String, InventoryError> {
    let session = LoginSession::open(user_id, now);
    transact(conn, |conn| {
        diesel::insert_into(sessions::table).values(&session).execute(conn)?;
        Ok(())
    })?;
    Ok(session.token)
}

/// The owner of `token`, while that session is live.
pub fn session_user(
    conn: &mut SqliteConnection,
    token: &str,
    now: NaiveDateTime,
) -> QueryResult<Option<User>> {
    let session = sessions::table
        .find(token)
        .select(LoginSession::as_select())
        .first(conn)
        .optional()?;

    match session {
        Some(session) if session.is_live(now) => users::table
            .find(session.user_id)
            .select(User::as_select())
            .first(conn)
            .optional(),
        _ => Ok(None),
    }
}

/// HTTP-only session cookie. `secure` is off in unit tests, which run over
/// plain HTTP.
pub fn set_session_cookie(cookies: &CookieJar<'_>, token: &str) {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .secure(!cfg!(test))
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookies.add(cookie);
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::orm::testing::{seed_user, setup_test_db, test_now};

    #[test]
    fn hash_round_trip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "garbage"));
    }

    #[test]
    fn authenticate_checks_the_password() {
        let mut conn = setup_test_db();
        let user = seed_user(&mut conn, "ops", "hunter2");
        assert_eq!(authenticate(&mut conn, "ops", "hunter2").unwrap().map(|u| u.id), Some(user.id));
        assert!(authenticate(&mut conn, "ops", "nope").unwrap().is_none());
        assert!(authenticate(&mut conn, "ghost", "hunter2").unwrap().is_none());
    }

    #[test]
    fn expired_and_revoked_sessions_are_dead() {
        let mut conn = setup_test_db();
        let user = seed_user(&mut conn, "ops", "hunter2");
        let now = test_now();
        let token = create_session(&mut conn, user.id, now).unwrap();
        assert!(session_user(&mut conn, &token, now).unwrap().is_some());

        diesel::update(sessions::table.find(&token))
            .set(sessions::expires_at.eq(Some(now - Duration::minutes(1))))
            .execute(&mut conn)
            .unwrap();
        assert!(session_user(&mut conn, &token, now).unwrap().is_none());

        let other = create_session(&mut conn, user.id, now).unwrap();
        diesel::update(sessions::table.find(&other))
            .set(sessions::revoked.eq(true))
            .execute(&mut conn)
            .unwrap();
        assert!(session_user(&mut conn, &other, now).unwrap().is_none());
    }
}
