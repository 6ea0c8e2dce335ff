use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::users;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, TS)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub username: String, // Will be unique
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub password_hash: String,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

impl User {
    /// "first last", or the username when both are blank.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name).trim().to_string();
        if full.is_empty() { self.username.clone() } else { full }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            full_name: self.full_name(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// The user as it appears nested inside other records.
#[derive(Serialize, Deserialize, TS, Debug, Clone, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub full_name: String,
}
