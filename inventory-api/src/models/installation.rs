use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::{DeviceRef, SoftwareRef, UserSummary};
use crate::schema::software_installations;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = software_installations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SoftwareInstallation {
    pub id: i32,
    pub device_id: i32,
    pub software_id: i32,
    pub installed_date: NaiveDateTime,
    pub installed_by_id: Option<i32>,
    pub notes: String,
}

#[derive(Insertable)]
#[diesel(table_name = software_installations)]
pub struct NewSoftwareInstallation {
    pub device_id: i32,
    pub software_id: i32,
    pub installed_date: NaiveDateTime,
    pub installed_by_id: Option<i32>,
    pub notes: String,
}

#[derive(Deserialize, Serialize, TS, Debug, Clone, Default)]
#[serde(default)]
#[ts(export)]
pub struct InstallationInput {
    pub device_id: Option<i32>,
    pub notes: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InstallationView {
    pub id: i32,
    pub device: DeviceRef,
    pub device_id: i32,
    pub software: SoftwareRef,
    pub software_id: i32,
    pub installed_by: Option<UserSummary>,
    pub installed_date: NaiveDateTime,
    pub notes: String,
}
