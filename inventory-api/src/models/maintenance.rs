use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::choices::MaintenanceType;
use crate::models::{DeviceRef, UserSummary, Vendor};
use crate::policy::WorkflowStatus;
use crate::schema::maintenance_records;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = maintenance_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MaintenanceRecord {
    pub id: i32,
    pub device_id: i32,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub performed_by_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub scheduled_date: Option<NaiveDateTime>,
    pub performed_date: Option<NaiveDateTime>,
    pub cost: Option<f64>,
    pub parts_used: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = maintenance_records)]
pub struct NewMaintenanceRecord {
    pub device_id: i32,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub performed_by_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub scheduled_date: Option<NaiveDateTime>,
    pub performed_date: Option<NaiveDateTime>,
    pub cost: Option<f64>,
    pub parts_used: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = maintenance_records)]
#[diesel(treat_none_as_null = true)]
pub struct MaintenanceChanges {
    pub device_id: i32,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub performed_by_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub scheduled_date: Option<NaiveDateTime>,
    pub performed_date: Option<NaiveDateTime>,
    pub cost: Option<f64>,
    pub parts_used: String,
    pub notes: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Deserialize, Serialize, TS, Debug, Clone, Default, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct MaintenanceInput {
    pub device_id: Option<i32>,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub performed_by_id: Option<i32>,
    pub vendor_id: Option<i32>,
    #[ts(type = "string | null")]
    pub scheduled_date: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub performed_date: Option<NaiveDateTime>,
    pub cost: Option<f64>,
    pub parts_used: String,
    pub notes: String,
}

impl From<&MaintenanceRecord> for MaintenanceInput {
    fn from(rec: &MaintenanceRecord) -> Self {
        MaintenanceInput {
            device_id: Some(rec.device_id),
            maintenance_type: rec.maintenance_type,
            description: rec.description.clone(),
            performed_by_id: rec.performed_by_id,
            vendor_id: rec.vendor_id,
            scheduled_date: rec.scheduled_date,
            performed_date: rec.performed_date,
            cost: rec.cost,
            parts_used: rec.parts_used.clone(),
            notes: rec.notes.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MaintenanceView {
    pub id: i32,
    pub device: DeviceRef,
    pub device_id: i32,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub performed_by: Option<UserSummary>,
    pub performed_by_id: Option<i32>,
    pub vendor: Option<Vendor>,
    pub vendor_id: Option<i32>,
    pub scheduled_date: Option<NaiveDateTime>,
    pub performed_date: Option<NaiveDateTime>,
    pub cost: Option<f64>,
    pub parts_used: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub workflow_status: WorkflowStatus,
}
