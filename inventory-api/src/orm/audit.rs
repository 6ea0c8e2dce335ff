//! Inventory audits and their per-device items.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::error::InventoryError;
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{
    AuditInput, AuditItem, AuditItemInput, AuditItemView, AuditView, Device, InventoryAudit,
    InventoryAuditChanges, Location, NewAuditItem, NewInventoryAudit, User,
};
use crate::orm::db::{last_insert_id, transact};
use crate::orm::{RefTable, check_reference};
use crate::policy::completion_status;
use crate::query::{Page, PageRequest};
use crate::schema::{audit_items, devices, inventory_audits, locations, users};
use crate::validation::{REQUIRED, audit_errors, audit_item_errors};

pub fn get_audit(conn: &mut SqliteConnection, id: i32) -> Result<InventoryAudit, InventoryError> {
    inventory_audits::table
        .find(id)
        .select(InventoryAudit::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("InventoryAudit"))
}

pub fn audit_views(
    conn: &mut SqliteConnection,
    rows: Vec<InventoryAudit>,
    now: NaiveDateTime,
) -> Result<Vec<AuditView>, InventoryError> {
    let ids: Vec<i32> = rows.iter().map(|a| a.id).collect();
    let counts: HashMap<i32, i64> = audit_items::table
        .filter(audit_items::audit_id.eq_any(ids))
        .group_by(audit_items::audit_id)
        .select((audit_items::audit_id, count_star()))
        .load::<(i32, i64)>(conn)?
        .into_iter()
        .collect();
    let user_ids: Vec<i32> = rows.iter().map(|a| a.conducted_by_id).collect();
    let users: HashMap<i32, User> = users::table
        .filter(users::id.eq_any(user_ids))
        .select(User::as_select())
        .load(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    rows.into_iter()
        .map(|audit| {
            let conducted_by = users.get(&audit.conducted_by_id).map(User::summary).ok_or_else(|| {
                InventoryError::Internal(format!("audit {} has no conductor", audit.id))
            })?;
            Ok(AuditView {
                item_count: counts.get(&audit.id).copied().unwrap_or(0),
                completion_status: completion_status(&audit, now),
                conducted_by,
                id: audit.id,
                audit_type: audit.audit_type,
                title: audit.title,
                description: audit.description,
                start_date: audit.start_date,
                end_date: audit.end_date,
                findings: audit.findings,
                recommendations: audit.recommendations,
                created_at: audit.created_at,
                updated_at: audit.updated_at,
            })
        })
        .collect()
}

pub fn audit_view(
    conn: &mut SqliteConnection,
    audit: InventoryAudit,
    now: NaiveDateTime,
) -> Result<AuditView, InventoryError> {
    audit_views(conn, vec![audit], now)?
        .pop()
        .ok_or_else(|| InventoryError::Internal("audit view assembly produced nothing".into()))
}

/// Audits, newest start first.
pub fn list_audits(
    conn: &mut SqliteConnection,
    page: &PageRequest,
    now: NaiveDateTime,
) -> Result<Page<AuditView>, InventoryError> {
    let total: i64 = inventory_audits::table.count().get_result(conn)?;
    page.check(total)?;
    let rows = inventory_audits::table
        .order((inventory_audits::start_date.desc(), inventory_audits::id.desc()))
        .limit(page.page_size)
        .offset(page.offset())
        .select(InventoryAudit::as_select())
        .load(conn)?;
    Ok(Page::new(audit_views(conn, rows, now)?, total))
}

/// `conducted_by` is the authenticated user; it is fixed at creation.
pub fn create_audit(
    conn: &mut SqliteConnection,
    input: AuditInput,
    conducted_by: i32,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<InventoryAudit, InventoryError> {
    audit_errors(&input).into_result()?;
    let audit = transact(conn, |conn| {
        diesel::insert_into(inventory_audits::table)
            .values(&NewInventoryAudit {
                audit_type: input.audit_type,
                title: input.title.trim().to_string(),
                description: input.description.clone(),
                conducted_by_id: conducted_by,
                start_date: input.start_date.unwrap_or(now),
                end_date: input.end_date,
                findings: input.findings.clone(),
                recommendations: input.recommendations.clone(),
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        get_audit(conn, id)
    })?;
    sink.emit(ChangeEvent::created("InventoryAudit", audit.id));
    Ok(audit)
}

pub fn update_audit(
    conn: &mut SqliteConnection,
    id: i32,
    input: AuditInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<InventoryAudit, InventoryError> {
    audit_errors(&input).into_result()?;
    let audit = transact(conn, |conn| {
        let current = get_audit(conn, id)?;
        diesel::update(inventory_audits::table.find(id))
            .set(&InventoryAuditChanges {
                audit_type: input.audit_type,
                title: input.title.trim().to_string(),
                description: input.description.clone(),
                start_date: input.start_date.unwrap_or(current.start_date),
                end_date: input.end_date,
                findings: input.findings.clone(),
                recommendations: input.recommendations.clone(),
                updated_at: now,
            })
            .execute(conn)?;
        get_audit(conn, id)
    })?;
    sink.emit(ChangeEvent::updated("InventoryAudit", id));
    Ok(audit)
}

/// Deletes the audit; its items cascade.
pub fn delete_audit(
    conn: &mut SqliteConnection,
    id: i32,
    sink: &dyn ChangeSink,
) -> Result<(), InventoryError> {
    transact(conn, |conn| {
        get_audit(conn, id)?;
        diesel::delete(inventory_audits::table.find(id)).execute(conn)?;
        Ok(())
    })?;
    sink.emit(ChangeEvent::deleted("InventoryAudit", id));
    Ok(())
}

fn item_views(
    conn: &mut SqliteConnection,
    rows: Vec<AuditItem>,
) -> Result<Vec<AuditItemView>, InventoryError> {
    let device_ids: Vec<i32> = rows.iter().map(|i| i.device_id).collect();
    let devices: HashMap<i32, Device> = devices::table
        .filter(devices::id.eq_any(device_ids))
        .select(Device::as_select())
        .load(conn)?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();
    let location_ids: Vec<i32> = rows
        .iter()
        .flat_map(|i| [i.expected_location_id, i.actual_location_id])
        .flatten()
        .collect();
    let locations: HashMap<i32, Location> = locations::table
        .filter(locations::id.eq_any(location_ids))
        .select(Location::as_select())
        .load(conn)?
        .into_iter()
        .map(|l| (l.id, l))
        .collect();

    rows.into_iter()
        .map(|item| {
            let device = devices.get(&item.device_id).map(Device::reference).ok_or_else(|| {
                InventoryError::Internal(format!("audit item {} has no device", item.id))
            })?;
            Ok(AuditItemView {
                expected_location: item
                    .expected_location_id
                    .and_then(|id| locations.get(&id).cloned()),
                actual_location: item.actual_location_id.and_then(|id| locations.get(&id).cloned()),
                device,
                id: item.id,
                audit_id: item.audit_id,
                device_id: item.device_id,
                expected_location_id: item.expected_location_id,
                actual_location_id: item.actual_location_id,
                found: item.found,
                condition: item.condition,
                notes: item.notes,
                audited_at: item.audited_at,
            })
        })
        .collect()
}

pub fn list_audit_items(
    conn: &mut SqliteConnection,
    audit_id: i32,
) -> Result<Vec<AuditItemView>, InventoryError> {
    get_audit(conn, audit_id)?;
    let rows = audit_items::table
        .filter(audit_items::audit_id.eq(audit_id))
        .order(audit_items::id.asc())
        .select(AuditItem::as_select())
        .load(conn)?;
    item_views(conn, rows)
}

/// Records one device as checked in the audit. A device appears at most
/// once per audit.
pub fn add_audit_item(
    conn: &mut SqliteConnection,
    audit_id: i32,
    input: AuditItemInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<AuditItemView, InventoryError> {
    let view = transact(conn, |conn| {
        get_audit(conn, audit_id)?;
        let mut errors = audit_item_errors(&input);
        check_reference(conn, &mut errors, "device_id", RefTable::Device, input.device_id)?;
        for (field, id) in [
            ("expected_location_id", input.expected_location_id),
            ("actual_location_id", input.actual_location_id),
        ] {
            check_reference(conn, &mut errors, field, RefTable::Location, id)?;
        }
        errors.into_result()?;
        let device_id =
            input.device_id.ok_or_else(|| InventoryError::invalid("device_id", REQUIRED))?;

        diesel::insert_into(audit_items::table)
            .values(&NewAuditItem {
                audit_id,
                device_id,
                expected_location_id: input.expected_location_id,
                actual_location_id: input.actual_location_id,
                found: input.found,
                condition: input.condition,
                notes: input.notes.clone(),
                audited_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        let row = audit_items::table.find(id).select(AuditItem::as_select()).first(conn)?;
        item_views(conn, vec![row])?
            .pop()
            .ok_or_else(|| {
                InventoryError::Internal("audit item view assembly produced nothing".into())
            })
    })?;
    sink.emit(ChangeEvent::created("AuditItem", view.id));
    Ok(view)
}

pub fn delete_audit_item(
    conn: &mut SqliteConnection,
    id: i32,
    sink: &dyn ChangeSink,
) -> Result<(), InventoryError> {
    transact(conn, |conn| {
        let deleted = diesel::delete(audit_items::table.find(id)).execute(conn)?;
        if deleted == 0 {
            return Err(InventoryError::not_found("AuditItem"));
        }
        Ok(())
    })?;
    sink.emit(ChangeEvent::deleted("AuditItem", id));
    Ok(())
}
