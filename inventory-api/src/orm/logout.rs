use diesel::prelude::*;

use crate::error::InventoryError;
use crate::orm::db::transact;
use crate::schema::sessions;

/// Marks the session revoked. Returns whether a live session was found.
pub fn revoke_session(conn: &mut SqliteConnection, token: &str) -> Result<bool, InventoryError> {
    transact(conn, |conn| {
        let updated = diesel::update(
            sessions::table.filter(sessions::id.eq(token)).filter(sessions::revoked.eq(false)),
        )
        .set(sessions::revoked.eq(true))
        .execute(conn)?;
        Ok(updated > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::login::{create_session, session_user};
    use crate::orm::testing::{seed_user, setup_test_db, test_now};

    #[test]
    fn revoking_twice_reports_nothing_the_second_time() {
        let mut conn = setup_test_db();
        let user = seed_user(&mut conn, "ops", "pw");
        let token = create_session(&mut conn, user.id, test_now()).unwrap();

        assert!(revoke_session(&mut conn, &token).unwrap());
        assert!(!revoke_session(&mut conn, &token).unwrap());
        assert!(session_user(&mut conn, &token, test_now()).unwrap().is_none());
    }
}
