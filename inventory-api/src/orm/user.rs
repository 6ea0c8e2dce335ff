use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::error::{FieldErrors, InventoryError};
use crate::models::{NewUser, User, UserInput};
use crate::orm::db::{last_insert_id, transact};
use crate::schema::users;
use crate::validation::{REQUIRED, check_email, check_max_len};

pub fn get_user(conn: &mut SqliteConnection, user_id: i32) -> Result<User, InventoryError> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("User"))
}

pub fn get_user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> QueryResult<Option<User>> {
    users::table
        .filter(users::username.eq(username))
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn list_users(conn: &mut SqliteConnection) -> QueryResult<Vec<User>> {
    users::table.order(users::username.asc()).select(User::as_select()).load(conn)
}

/// Inserts a login principal. `input.password_hash` must already be hashed.
pub fn insert_user(
    conn: &mut SqliteConnection,
    input: UserInput,
    now: NaiveDateTime,
) -> Result<User, InventoryError> {
    let mut errors = FieldErrors::new();
    if input.username.trim().is_empty() {
        errors.add("username", REQUIRED);
    }
    check_max_len(&mut errors, "username", &input.username, 150);
    check_email(&mut errors, "email", &input.email);
    errors.into_result()?;

    transact(conn, |conn| {
        diesel::insert_into(users::table)
            .values(&NewUser {
                username: input.username.trim().to_string(),
                email: input.email,
                first_name: input.first_name,
                last_name: input.last_name,
                password_hash: input.password_hash,
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        get_user(conn, id)
    })
}

pub fn set_password_hash(
    conn: &mut SqliteConnection,
    user_id: i32,
    password_hash: &str,
    now: NaiveDateTime,
) -> Result<(), InventoryError> {
    transact(conn, |conn| {
        let updated = diesel::update(users::table.find(user_id))
            .set((users::password_hash.eq(password_hash), users::updated_at.eq(now)))
            .execute(conn)?;
        if updated == 0 {
            return Err(InventoryError::not_found("User"));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{setup_test_db, test_now};

    fn input(username: &str) -> UserInput {
        UserInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            password_hash: "not-a-real-hash".into(),
        }
    }

    #[test]
    fn insert_and_find_by_username() {
        let mut conn = setup_test_db();
        let user = insert_user(&mut conn, input("ada"), test_now()).unwrap();
        assert_eq!(user.full_name(), "Ada Lovelace");

        let found = get_user_by_username(&mut conn, "ada").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(get_user_by_username(&mut conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_conflicts() {
        let mut conn = setup_test_db();
        insert_user(&mut conn, input("ada"), test_now()).unwrap();
        let err = insert_user(&mut conn, input("ada"), test_now()).unwrap_err();
        assert!(matches!(err, InventoryError::Conflict { ref field, .. } if field == "username"));
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut conn = setup_test_db();
        let mut bad = input("grace");
        bad.email = "grace-at-example".into();
        let err = insert_user(&mut conn, bad, test_now()).unwrap_err();
        assert!(matches!(err, InventoryError::Invalid(ref e) if e.contains("email")));
    }
}
