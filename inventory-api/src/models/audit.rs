use chrono::NaiveDateTime;
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::choices::{AuditType, DeviceCondition};
use crate::models::{DeviceRef, Location, UserSummary};
use crate::policy::CompletionStatus;
use crate::schema::{audit_items, inventory_audits};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = inventory_audits)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InventoryAudit {
    pub id: i32,
    pub audit_type: AuditType,
    pub title: String,
    pub description: String,
    pub conducted_by_id: i32,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub findings: String,
    pub recommendations: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = inventory_audits)]
pub struct NewInventoryAudit {
    pub audit_type: AuditType,
    pub title: String,
    pub description: String,
    pub conducted_by_id: i32,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub findings: String,
    pub recommendations: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = inventory_audits)]
#[diesel(treat_none_as_null = true)]
pub struct InventoryAuditChanges {
    pub audit_type: AuditType,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub findings: String,
    pub recommendations: String,
    pub updated_at: NaiveDateTime,
}

/// `start_date` defaults to the time of creation when omitted.
#[derive(Deserialize, Serialize, TS, Debug, Clone, Default, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct AuditInput {
    pub audit_type: AuditType,
    pub title: String,
    pub description: String,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDateTime>,
    pub findings: String,
    pub recommendations: String,
}

impl From<&InventoryAudit> for AuditInput {
    fn from(audit: &InventoryAudit) -> Self {
        AuditInput {
            audit_type: audit.audit_type,
            title: audit.title.clone(),
            description: audit.description.clone(),
            start_date: Some(audit.start_date),
            end_date: audit.end_date,
            findings: audit.findings.clone(),
            recommendations: audit.recommendations.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuditView {
    pub id: i32,
    pub audit_type: AuditType,
    pub title: String,
    pub description: String,
    pub conducted_by: UserSummary,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub findings: String,
    pub recommendations: String,
    pub item_count: i64,
    pub completion_status: CompletionStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = audit_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuditItem {
    pub id: i32,
    pub audit_id: i32,
    pub device_id: i32,
    pub expected_location_id: Option<i32>,
    pub actual_location_id: Option<i32>,
    pub found: bool,
    pub condition: Option<DeviceCondition>,
    pub notes: String,
    pub audited_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = audit_items)]
pub struct NewAuditItem {
    pub audit_id: i32,
    pub device_id: i32,
    pub expected_location_id: Option<i32>,
    pub actual_location_id: Option<i32>,
    pub found: bool,
    pub condition: Option<DeviceCondition>,
    pub notes: String,
    pub audited_at: NaiveDateTime,
}

#[derive(Deserialize, Serialize, TS, Debug, Clone, Default, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct AuditItemInput {
    pub device_id: Option<i32>,
    pub expected_location_id: Option<i32>,
    pub actual_location_id: Option<i32>,
    pub found: bool,
    pub condition: Option<DeviceCondition>,
    pub notes: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuditItemView {
    pub id: i32,
    pub audit_id: i32,
    pub device: DeviceRef,
    pub device_id: i32,
    pub expected_location: Option<Location>,
    pub expected_location_id: Option<i32>,
    pub actual_location: Option<Location>,
    pub actual_location_id: Option<i32>,
    pub found: bool,
    pub condition: Option<DeviceCondition>,
    pub notes: String,
    pub audited_at: NaiveDateTime,
}
