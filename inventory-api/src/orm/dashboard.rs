use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use ts_rs::TS;

use crate::choices::DeviceStatus;
use crate::error::InventoryError;
use crate::models::{DeviceView, MaintenanceView};
use crate::orm::device::recent_devices;
use crate::orm::maintenance::recent_maintenance;
use crate::policy::{DevicePredicate, SoftwarePredicate};
use crate::schema::{devices, maintenance_records as mr, software};

pub const RECENT_LIMIT: i64 = 5;

#[derive(Serialize, TS, Debug, Clone, PartialEq, Eq)]
#[ts(export)]
pub struct DashboardStats {
    pub total_devices: i64,
    pub active_devices: i64,
    pub devices_needing_maintenance: i64,
    pub devices_under_warranty: i64,
    pub total_software: i64,
    pub expiring_licenses: i64,
    pub expired_licenses: i64,
    pub pending_maintenance: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct RecentActivity {
    pub recent_devices: Vec<DeviceView>,
    pub recent_maintenance: Vec<MaintenanceView>,
}

fn count_devices(
    conn: &mut SqliteConnection,
    predicate: DevicePredicate,
    now: NaiveDateTime,
) -> QueryResult<i64> {
    devices::table
        .filter(crate::query::device::predicate_sql(predicate, now))
        .count()
        .get_result(conn)
}

fn count_software(
    conn: &mut SqliteConnection,
    predicate: SoftwarePredicate,
    now: NaiveDateTime,
) -> QueryResult<i64> {
    software::table
        .filter(crate::query::software::predicate_sql(predicate, now))
        .count()
        .get_result(conn)
}

pub fn dashboard_stats(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<DashboardStats, InventoryError> {
    Ok(DashboardStats {
        total_devices: devices::table.count().get_result(conn)?,
        active_devices: devices::table
            .filter(devices::status.eq(DeviceStatus::Active))
            .count()
            .get_result(conn)?,
        devices_needing_maintenance: count_devices(conn, DevicePredicate::NeedsMaintenance, now)?,
        devices_under_warranty: count_devices(conn, DevicePredicate::UnderWarranty, now)?,
        total_software: software::table.count().get_result(conn)?,
        expiring_licenses: count_software(conn, SoftwarePredicate::ExpiringSoon, now)?,
        expired_licenses: count_software(conn, SoftwarePredicate::Expired, now)?,
        pending_maintenance: mr::table
            .filter(mr::performed_date.is_null())
            .filter(mr::scheduled_date.le(now))
            .count()
            .get_result(conn)?,
    })
}

pub fn recent_activity(
    conn: &mut SqliteConnection,
    now: NaiveDateTime,
) -> Result<RecentActivity, InventoryError> {
    Ok(RecentActivity {
        recent_devices: recent_devices(conn, RECENT_LIMIT, now)?,
        recent_maintenance: recent_maintenance(conn, RECENT_LIMIT, now)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::orm::testing::{
        seed_category, seed_device, seed_maintenance, seed_software, setup_test_db, test_now,
    };

    #[test]
    fn stats_over_a_small_inventory() {
        let mut conn = setup_test_db();
        let now = test_now();
        let cat = seed_category(&mut conn, "Laptops");
        let a = seed_device(&mut conn, "A", cat.id);
        let b = seed_device(&mut conn, "B", cat.id);
        diesel::update(devices::table.find(a.id))
            .set((
                devices::status.eq(DeviceStatus::Retired),
                devices::warranty_expiry.eq(NaiveDate::from_ymd_opt(2026, 1, 1)),
                devices::next_maintenance.eq(Some(now)),
            ))
            .execute(&mut conn)
            .unwrap();

        let due = seed_maintenance(&mut conn, b.id, "due now");
        let later = seed_maintenance(&mut conn, b.id, "next month");
        diesel::update(mr::table.find(due.id))
            .set(mr::scheduled_date.eq(Some(now)))
            .execute(&mut conn)
            .unwrap();
        diesel::update(mr::table.find(later.id))
            .set(mr::scheduled_date.eq(Some(now + Duration::days(30))))
            .execute(&mut conn)
            .unwrap();

        let expiring = seed_software(&mut conn, "Soon", 1, 0);
        diesel::update(software::table.find(expiring.id))
            .set(software::license_expiry.eq(NaiveDate::from_ymd_opt(2025, 1, 20)))
            .execute(&mut conn)
            .unwrap();
        seed_software(&mut conn, "Forever", 1, 0);

        let stats = dashboard_stats(&mut conn, now).unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_devices: 2,
                active_devices: 1,
                devices_needing_maintenance: 1,
                devices_under_warranty: 1,
                total_software: 2,
                expiring_licenses: 1,
                expired_licenses: 0,
                pending_maintenance: 1,
            }
        );
    }

    #[test]
    fn recent_lists_are_capped() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Phones");
        for i in 0..7 {
            seed_device(&mut conn, &format!("P-{i}"), cat.id);
        }
        let recent = recent_activity(&mut conn, test_now()).unwrap();
        assert_eq!(recent.recent_devices.len(), 5);
        assert_eq!(recent.recent_devices[0].asset_tag, "P-6");
        assert!(recent.recent_maintenance.is_empty());
    }
}
