use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::sessions;

/// A login session. `token` is the opaque cookie value.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = sessions)]
pub struct LoginSession {
    #[diesel(column_name = id)]
    pub token: String,
    pub user_id: i32,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
    pub revoked: bool,
}

impl LoginSession {
    /// A new session with a random token and no expiry.
    pub fn open(user_id: i32, now: NaiveDateTime) -> Self {
        LoginSession {
            token: Uuid::new_v4().to_string(),
            user_id,
            created_at: now,
            expires_at: None,
            revoked: false,
        }
    }

    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        !self.revoked && self.expires_at.is_none_or(|expires| expires > now)
    }
}
