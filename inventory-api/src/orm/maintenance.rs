//! Maintenance records. Every mutation re-derives the owning device's
//! `last_maintenance` and `next_maintenance` in the same transaction.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::dsl::{max, min};
use diesel::prelude::*;

use crate::error::InventoryError;
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{
    Device, MaintenanceChanges, MaintenanceInput, MaintenanceRecord, MaintenanceView,
    NewMaintenanceRecord, User, Vendor,
};
use crate::orm::db::{last_insert_id, transact};
use crate::orm::{RefTable, check_reference};
use crate::policy::{MaintenancePredicate, workflow_status};
use crate::query::maintenance::{DEFAULT_ORDERING, MaintenanceFilter, filtered, ordered};
use crate::query::{OrderKey, Page, PageRequest};
use crate::schema::{devices, maintenance_records as mr, users, vendors};
use crate::validation::{REQUIRED, maintenance_errors, round_money};

pub fn get_maintenance(
    conn: &mut SqliteConnection,
    id: i32,
) -> Result<MaintenanceRecord, InventoryError> {
    mr::table
        .find(id)
        .select(MaintenanceRecord::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("MaintenanceRecord"))
}

fn unique_ids(ids: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub fn maintenance_views(
    conn: &mut SqliteConnection,
    rows: Vec<MaintenanceRecord>,
    now: NaiveDateTime,
) -> Result<Vec<MaintenanceView>, InventoryError> {
    let devices: HashMap<i32, Device> = devices::table
        .filter(devices::id.eq_any(unique_ids(rows.iter().map(|r| r.device_id))))
        .select(Device::as_select())
        .load(conn)?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();
    let users: HashMap<i32, User> = users::table
        .filter(users::id.eq_any(unique_ids(rows.iter().filter_map(|r| r.performed_by_id))))
        .select(User::as_select())
        .load(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let vendors: HashMap<i32, Vendor> = vendors::table
        .filter(vendors::id.eq_any(unique_ids(rows.iter().filter_map(|r| r.vendor_id))))
        .select(Vendor::as_select())
        .load(conn)?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    rows.into_iter()
        .map(|rec| {
            let device = devices.get(&rec.device_id).map(Device::reference).ok_or_else(|| {
                InventoryError::Internal(format!("maintenance record {} has no device", rec.id))
            })?;
            Ok(MaintenanceView {
                workflow_status: workflow_status(&rec, now),
                performed_by: rec.performed_by_id.and_then(|id| users.get(&id).map(User::summary)),
                vendor: rec.vendor_id.and_then(|id| vendors.get(&id).cloned()),
                device,
                id: rec.id,
                device_id: rec.device_id,
                maintenance_type: rec.maintenance_type,
                description: rec.description,
                performed_by_id: rec.performed_by_id,
                vendor_id: rec.vendor_id,
                scheduled_date: rec.scheduled_date,
                performed_date: rec.performed_date,
                cost: rec.cost,
                parts_used: rec.parts_used,
                notes: rec.notes,
                created_at: rec.created_at,
                updated_at: rec.updated_at,
            })
        })
        .collect()
}

pub fn maintenance_view(
    conn: &mut SqliteConnection,
    rec: MaintenanceRecord,
    now: NaiveDateTime,
) -> Result<MaintenanceView, InventoryError> {
    maintenance_views(conn, vec![rec], now)?
        .pop()
        .ok_or_else(|| {
            InventoryError::Internal("maintenance view assembly produced nothing".into())
        })
}

pub fn list_maintenance(
    conn: &mut SqliteConnection,
    filter: &MaintenanceFilter,
    search: Option<&str>,
    ordering: &[OrderKey],
    page: &PageRequest,
    now: NaiveDateTime,
) -> Result<Page<MaintenanceView>, InventoryError> {
    let total: i64 = filtered(filter, search, now).count().get_result(conn)?;
    page.check(total)?;
    let rows = ordered(filtered(filter, search, now), ordering)
        .limit(page.page_size)
        .offset(page.offset())
        .select(MaintenanceRecord::as_select())
        .load(conn)?;
    Ok(Page::new(maintenance_views(conn, rows, now)?, total))
}

pub fn maintenance_where(
    conn: &mut SqliteConnection,
    predicate: MaintenancePredicate,
    now: NaiveDateTime,
) -> Result<Vec<MaintenanceView>, InventoryError> {
    let filter = MaintenanceFilter::only(predicate);
    let rows = ordered(filtered(&filter, None, now), DEFAULT_ORDERING)
        .select(MaintenanceRecord::as_select())
        .load(conn)?;
    maintenance_views(conn, rows, now)
}

/// The `limit` most recently created records.
pub fn recent_maintenance(
    conn: &mut SqliteConnection,
    limit: i64,
    now: NaiveDateTime,
) -> Result<Vec<MaintenanceView>, InventoryError> {
    let rows = mr::table
        .order((mr::created_at.desc(), mr::id.desc()))
        .limit(limit)
        .select(MaintenanceRecord::as_select())
        .load(conn)?;
    maintenance_views(conn, rows, now)
}

/// Recomputes the device's maintenance dates from its records: the latest
/// performed date and the earliest schedule still open. The device row is
/// only written, and `updated_at` only moves, when either date changes.
pub fn sync_device_dates(
    conn: &mut SqliteConnection,
    device_id: i32,
    now: NaiveDateTime,
) -> QueryResult<()> {
    let last: Option<NaiveDateTime> = mr::table
        .filter(mr::device_id.eq(device_id))
        .select(max(mr::performed_date))
        .first(conn)?;
    let next: Option<NaiveDateTime> = mr::table
        .filter(mr::device_id.eq(device_id))
        .filter(mr::performed_date.is_null())
        .select(min(mr::scheduled_date))
        .first(conn)?;
    let current: (Option<NaiveDateTime>, Option<NaiveDateTime>) = devices::table
        .find(device_id)
        .select((devices::last_maintenance, devices::next_maintenance))
        .first(conn)?;
    if current == (last, next) {
        return Ok(());
    }
    diesel::update(devices::table.find(device_id))
        .set((
            devices::last_maintenance.eq(last),
            devices::next_maintenance.eq(next),
            devices::updated_at.eq(now),
        ))
        .execute(conn)?;
    Ok(())
}

fn check_input(
    conn: &mut SqliteConnection,
    input: &MaintenanceInput,
) -> Result<i32, InventoryError> {
    let mut errors = maintenance_errors(input);
    check_reference(conn, &mut errors, "device_id", RefTable::Device, input.device_id)?;
    check_reference(conn, &mut errors, "performed_by_id", RefTable::User, input.performed_by_id)?;
    check_reference(conn, &mut errors, "vendor_id", RefTable::Vendor, input.vendor_id)?;
    errors.into_result()?;
    input.device_id.ok_or_else(|| InventoryError::invalid("device_id", REQUIRED))
}

pub fn create_maintenance(
    conn: &mut SqliteConnection,
    input: MaintenanceInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<MaintenanceRecord, InventoryError> {
    let rec = transact(conn, |conn| {
        let device_id = check_input(conn, &input)?;
        diesel::insert_into(mr::table)
            .values(&NewMaintenanceRecord {
                device_id,
                maintenance_type: input.maintenance_type,
                description: input.description.trim().to_string(),
                performed_by_id: input.performed_by_id,
                vendor_id: input.vendor_id,
                scheduled_date: input.scheduled_date,
                performed_date: input.performed_date,
                cost: round_money(input.cost),
                parts_used: input.parts_used.clone(),
                notes: input.notes.clone(),
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        sync_device_dates(conn, device_id, now)?;
        get_maintenance(conn, id)
    })?;
    sink.emit(ChangeEvent::created("MaintenanceRecord", rec.id));
    Ok(rec)
}

/// Moving a record to another device re-syncs both devices.
pub fn update_maintenance(
    conn: &mut SqliteConnection,
    id: i32,
    input: MaintenanceInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<MaintenanceRecord, InventoryError> {
    let rec = transact(conn, |conn| {
        let current = get_maintenance(conn, id)?;
        let device_id = check_input(conn, &input)?;
        diesel::update(mr::table.find(id))
            .set(&MaintenanceChanges {
                device_id,
                maintenance_type: input.maintenance_type,
                description: input.description.trim().to_string(),
                performed_by_id: input.performed_by_id,
                vendor_id: input.vendor_id,
                scheduled_date: input.scheduled_date,
                performed_date: input.performed_date,
                cost: round_money(input.cost),
                parts_used: input.parts_used.clone(),
                notes: input.notes.clone(),
                updated_at: now,
            })
            .execute(conn)?;
        sync_device_dates(conn, device_id, now)?;
        if current.device_id != device_id {
            sync_device_dates(conn, current.device_id, now)?;
        }
        get_maintenance(conn, id)
    })?;
    sink.emit(ChangeEvent::updated("MaintenanceRecord", id));
    Ok(rec)
}

pub fn delete_maintenance(
    conn: &mut SqliteConnection,
    id: i32,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<(), InventoryError> {
    transact(conn, |conn| {
        let current = get_maintenance(conn, id)?;
        diesel::delete(mr::table.find(id)).execute(conn)?;
        sync_device_dates(conn, current.device_id, now)?;
        Ok(())
    })?;
    sink.emit(ChangeEvent::deleted("MaintenanceRecord", id));
    Ok(())
}
