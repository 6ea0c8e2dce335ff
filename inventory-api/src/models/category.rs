use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::categories;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = categories)]
pub struct CategoryChanges {
    pub name: String,
    pub description: String,
    pub updated_at: NaiveDateTime,
}

// For API inputs and validation
#[derive(Deserialize, Serialize, TS, Debug, Clone, Default)]
#[serde(default)]
#[ts(export)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
}

#[derive(Serialize, TS, Debug, Clone)]
#[ts(export)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub device_count: i64,
}
