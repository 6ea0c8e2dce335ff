//! Derived state.
//!
//! Everything here is a pure function of a record and "now". Nothing is
//! persisted and nothing mutates. The named predicates at the bottom are the
//! in-memory halves of the filter predicates in [`crate::query`]; the
//! translators there must select exactly the records these functions accept.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use ts_rs::TS;

use crate::models::{Device, InventoryAudit, MaintenanceRecord, Software};

/// Days ahead of today that count as "expiring soon".
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// A license is "low" when this many seats or fewer remain.
pub const LOW_SEAT_MARGIN: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum WarrantyStatus {
    UnderWarranty,
    Expired,
    NoWarranty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MaintenanceDue {
    NeedsMaintenance,
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LicenseStatus {
    Expired,
    Active,
    NoExpiry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum WorkflowStatus {
    Completed,
    Overdue,
    Scheduled,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CompletionStatus {
    Completed,
    InProgress,
    Scheduled,
}

pub fn is_under_warranty(device: &Device, now: NaiveDateTime) -> bool {
    device.warranty_expiry.is_some_and(|expiry| expiry > now.date())
}

pub fn warranty_status(device: &Device, now: NaiveDateTime) -> WarrantyStatus {
    if is_under_warranty(device, now) {
        WarrantyStatus::UnderWarranty
    } else if device.warranty_expiry.is_some() {
        WarrantyStatus::Expired
    } else {
        WarrantyStatus::NoWarranty
    }
}

pub fn needs_maintenance(device: &Device, now: NaiveDateTime) -> bool {
    device.next_maintenance.is_some_and(|next| next <= now)
}

pub fn maintenance_due(device: &Device, now: NaiveDateTime) -> MaintenanceDue {
    if needs_maintenance(device, now) {
        MaintenanceDue::NeedsMaintenance
    } else {
        MaintenanceDue::Ok
    }
}

pub fn is_license_expired(software: &Software, now: NaiveDateTime) -> bool {
    software.license_expiry.is_some_and(|expiry| expiry < now.date())
}

pub fn license_status(software: &Software, now: NaiveDateTime) -> LicenseStatus {
    if is_license_expired(software, now) {
        LicenseStatus::Expired
    } else if software.license_expiry.is_some() {
        LicenseStatus::Active
    } else {
        LicenseStatus::NoExpiry
    }
}

/// `today < license_expiry <= today + 30 days`.
pub fn expiring_soon(software: &Software, now: NaiveDateTime) -> bool {
    let today = now.date();
    let horizon = expiring_soon_horizon(today);
    software.license_expiry.is_some_and(|expiry| expiry > today && expiry <= horizon)
}

pub fn expiring_soon_horizon(today: NaiveDate) -> NaiveDate {
    today + Duration::days(EXPIRING_SOON_DAYS)
}

pub fn available_seats(software: &Software) -> i32 {
    software.seats - software.used_seats
}

pub fn seats_low(software: &Software) -> bool {
    software.used_seats >= software.seats - LOW_SEAT_MARGIN
}

pub fn workflow_status(record: &MaintenanceRecord, now: NaiveDateTime) -> WorkflowStatus {
    if record.performed_date.is_some() {
        WorkflowStatus::Completed
    } else if record.scheduled_date.is_some_and(|scheduled| scheduled < now) {
        WorkflowStatus::Overdue
    } else if record.scheduled_date.is_some() {
        WorkflowStatus::Scheduled
    } else {
        WorkflowStatus::Pending
    }
}

pub fn completion_status(audit: &InventoryAudit, now: NaiveDateTime) -> CompletionStatus {
    if audit.end_date.is_some() {
        CompletionStatus::Completed
    } else if audit.start_date < now {
        CompletionStatus::InProgress
    } else {
        CompletionStatus::Scheduled
    }
}

/// Named device predicates usable as `?name=true|false` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePredicate {
    NeedsMaintenance,
    UnderWarranty,
}

impl DevicePredicate {
    pub const ALL: [DevicePredicate; 2] =
        [DevicePredicate::NeedsMaintenance, DevicePredicate::UnderWarranty];

    /// The query-string key.
    pub fn name(&self) -> &'static str {
        match self {
            DevicePredicate::NeedsMaintenance => "needs_maintenance",
            DevicePredicate::UnderWarranty => "under_warranty",
        }
    }

    pub fn holds(&self, device: &Device, now: NaiveDateTime) -> bool {
        match self {
            DevicePredicate::NeedsMaintenance => needs_maintenance(device, now),
            DevicePredicate::UnderWarranty => is_under_warranty(device, now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftwarePredicate {
    ExpiringSoon,
    Expired,
    LowSeats,
}

impl SoftwarePredicate {
    pub const ALL: [SoftwarePredicate; 3] =
        [SoftwarePredicate::ExpiringSoon, SoftwarePredicate::Expired, SoftwarePredicate::LowSeats];

    pub fn name(&self) -> &'static str {
        match self {
            SoftwarePredicate::ExpiringSoon => "expiring_soon",
            SoftwarePredicate::Expired => "expired",
            SoftwarePredicate::LowSeats => "low_seats",
        }
    }

    pub fn holds(&self, software: &Software, now: NaiveDateTime) -> bool {
        match self {
            SoftwarePredicate::ExpiringSoon => expiring_soon(software, now),
            SoftwarePredicate::Expired => is_license_expired(software, now),
            SoftwarePredicate::LowSeats => seats_low(software),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenancePredicate {
    Pending,
    Overdue,
    Completed,
}

impl MaintenancePredicate {
    pub const ALL: [MaintenancePredicate; 3] = [
        MaintenancePredicate::Pending,
        MaintenancePredicate::Overdue,
        MaintenancePredicate::Completed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MaintenancePredicate::Pending => "pending",
            MaintenancePredicate::Overdue => "overdue",
            MaintenancePredicate::Completed => "completed",
        }
    }

    pub fn holds(&self, record: &MaintenanceRecord, now: NaiveDateTime) -> bool {
        match self {
            MaintenancePredicate::Pending => record.performed_date.is_none(),
            MaintenancePredicate::Overdue => {
                record.performed_date.is_none()
                    && record.scheduled_date.is_some_and(|scheduled| scheduled < now)
            }
            MaintenancePredicate::Completed => record.performed_date.is_some(),
        }
    }
}

/// Not performed and due: `scheduled_date <= now`. Used by the dashboard.
pub fn maintenance_due_now(record: &MaintenanceRecord, now: NaiveDateTime) -> bool {
    record.performed_date.is_none()
        && record.scheduled_date.is_some_and(|scheduled| scheduled <= now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choices::{
        AuditType, DeviceCondition, DeviceKind, DeviceStatus, LicenseType, MaintenanceType,
    };

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn device() -> Device {
        Device {
            id: 1,
            kind: DeviceKind::Device,
            asset_tag: "IT-001".into(),
            serial_number: String::new(),
            model: "X1".into(),
            category_id: 1,
            vendor_id: None,
            status: DeviceStatus::Active,
            condition: DeviceCondition::Good,
            location_id: None,
            assigned_to_id: None,
            specifications: "{}".into(),
            purchase_date: None,
            warranty_expiry: None,
            purchase_price: None,
            notes: String::new(),
            image: None,
            last_maintenance: None,
            next_maintenance: None,
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        }
    }

    fn software(seats: i32, used: i32, expiry: Option<NaiveDate>) -> Software {
        Software {
            id: 1,
            name: "Office".into(),
            version: "1".into(),
            vendor_id: None,
            license_type: LicenseType::Subscription,
            license_key: String::new(),
            license_expiry: expiry,
            seats,
            used_seats: used,
            purchase_date: None,
            purchase_price: None,
            notes: String::new(),
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        }
    }

    fn maintenance(
        scheduled: Option<NaiveDateTime>,
        performed: Option<NaiveDateTime>,
    ) -> MaintenanceRecord {
        MaintenanceRecord {
            id: 1,
            device_id: 1,
            maintenance_type: MaintenanceType::Preventive,
            description: "check".into(),
            performed_by_id: None,
            vendor_id: None,
            scheduled_date: scheduled,
            performed_date: performed,
            cost: None,
            parts_used: String::new(),
            notes: String::new(),
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        }
    }

    #[test]
    fn warranty_boundary_is_strict() {
        let now = at(2025, 1, 15);
        let mut d = device();

        d.warranty_expiry = Some(date(2025, 1, 15));
        assert_eq!(warranty_status(&d, now), WarrantyStatus::Expired);

        d.warranty_expiry = Some(date(2025, 1, 16));
        assert_eq!(warranty_status(&d, now), WarrantyStatus::UnderWarranty);

        d.warranty_expiry = None;
        assert_eq!(warranty_status(&d, now), WarrantyStatus::NoWarranty);
    }

    #[test]
    fn maintenance_due_includes_now() {
        let now = at(2025, 3, 1);
        let mut d = device();
        assert_eq!(maintenance_due(&d, now), MaintenanceDue::Ok);
        d.next_maintenance = Some(now);
        assert!(needs_maintenance(&d, now));
        d.next_maintenance = Some(now + Duration::seconds(1));
        assert!(!needs_maintenance(&d, now));
    }

    #[test]
    fn license_windows() {
        let now = at(2025, 1, 15);
        assert!(expiring_soon(&software(1, 0, Some(date(2025, 2, 1))), now));
        assert!(expiring_soon(&software(1, 0, Some(date(2025, 2, 14))), now));
        assert!(!expiring_soon(&software(1, 0, Some(date(2025, 2, 15))), now));
        assert!(!expiring_soon(&software(1, 0, Some(date(2025, 1, 15))), now));

        let expired = software(1, 0, Some(date(2025, 1, 10)));
        assert!(is_license_expired(&expired, now));
        assert_eq!(license_status(&expired, now), LicenseStatus::Expired);
        let ends_today = software(1, 0, Some(date(2025, 1, 15)));
        assert_eq!(license_status(&ends_today, now), LicenseStatus::Active);
        assert_eq!(license_status(&software(1, 0, None), now), LicenseStatus::NoExpiry);
    }

    #[test]
    fn seat_arithmetic() {
        let sw = software(3, 2, None);
        assert_eq!(available_seats(&sw), 1);
        assert!(seats_low(&sw));
        assert!(!seats_low(&software(10, 7, None)));
        assert!(seats_low(&software(10, 8, None)));
    }

    #[test]
    fn workflow_transitions() {
        let now = at(2025, 1, 15);
        let past = at(2025, 1, 1);
        let future = at(2025, 2, 1);

        assert_eq!(workflow_status(&maintenance(None, None), now), WorkflowStatus::Pending);
        let upcoming = maintenance(Some(future), None);
        assert_eq!(workflow_status(&upcoming, now), WorkflowStatus::Scheduled);
        assert_eq!(workflow_status(&maintenance(Some(past), None), now), WorkflowStatus::Overdue);
        assert_eq!(
            workflow_status(&maintenance(Some(past), Some(now)), now),
            WorkflowStatus::Completed
        );

        assert!(MaintenancePredicate::Overdue.holds(&maintenance(Some(past), None), now));
        assert!(!MaintenancePredicate::Overdue.holds(&maintenance(None, None), now));
        assert!(maintenance_due_now(&maintenance(Some(now), None), now));
        assert!(!maintenance_due_now(&maintenance(Some(future), None), now));
    }

    #[test]
    fn audit_completion() {
        let now = at(2025, 1, 15);
        let mut audit = InventoryAudit {
            id: 1,
            audit_type: AuditType::Physical,
            title: "Q1".into(),
            description: String::new(),
            conducted_by_id: 1,
            start_date: at(2025, 1, 20),
            end_date: None,
            findings: String::new(),
            recommendations: String::new(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(completion_status(&audit, now), CompletionStatus::Scheduled);
        audit.start_date = at(2025, 1, 10);
        assert_eq!(completion_status(&audit, now), CompletionStatus::InProgress);
        audit.end_date = Some(now);
        assert_eq!(completion_status(&audit, now), CompletionStatus::Completed);
    }
}
