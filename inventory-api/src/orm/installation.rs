//! Software installations and seat accounting.
//!
//! An installation holds one seat of its software. Seats are taken with a
//! conditional update so `used_seats` never passes `seats`, even when two
//! installs race for the last one.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use tracing::info;

use crate::error::{FieldErrors, InventoryError};
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{
    Device, InstallationInput, InstallationView, NewSoftwareInstallation, SoftwareInstallation,
    User,
};
use crate::orm::db::{last_insert_id, transact};
use crate::orm::software::get_software;
use crate::orm::{RefTable, check_reference};
use crate::schema::{devices, software, software_installations as si, users};
use crate::validation::REQUIRED;

pub const NO_SEATS_AVAILABLE: &str = "No seats available";
pub const ALREADY_INSTALLED: &str = "This software is already installed on the device.";

fn get_installation(
    conn: &mut SqliteConnection,
    id: i32,
) -> Result<SoftwareInstallation, InventoryError> {
    si::table
        .find(id)
        .select(SoftwareInstallation::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("SoftwareInstallation"))
}

fn installation_views(
    conn: &mut SqliteConnection,
    rows: Vec<SoftwareInstallation>,
) -> Result<Vec<InstallationView>, InventoryError> {
    let device_ids: Vec<i32> = rows.iter().map(|r| r.device_id).collect();
    let user_ids: Vec<i32> = rows.iter().filter_map(|r| r.installed_by_id).collect();
    let devices: HashMap<i32, Device> = devices::table
        .filter(devices::id.eq_any(device_ids))
        .select(Device::as_select())
        .load(conn)?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();
    let users: HashMap<i32, User> = users::table
        .filter(users::id.eq_any(user_ids))
        .select(User::as_select())
        .load(conn)?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let device = devices
            .get(&row.device_id)
            .map(Device::reference)
            .ok_or_else(|| {
                InventoryError::Internal(format!("installation {} has no device", row.id))
            })?;
        let sw = get_software(conn, row.software_id)?;
        views.push(InstallationView {
            id: row.id,
            device,
            device_id: row.device_id,
            software: sw.reference(),
            software_id: row.software_id,
            installed_by: row.installed_by_id.and_then(|id| users.get(&id).map(User::summary)),
            installed_date: row.installed_date,
            notes: row.notes,
        });
    }
    Ok(views)
}

/// Installations of one license, newest first.
pub fn list_installations(
    conn: &mut SqliteConnection,
    software_id: i32,
) -> Result<Vec<InstallationView>, InventoryError> {
    get_software(conn, software_id)?;
    let rows = si::table
        .filter(si::software_id.eq(software_id))
        .order((si::installed_date.desc(), si::id.desc()))
        .select(SoftwareInstallation::as_select())
        .load(conn)?;
    installation_views(conn, rows)
}

/// Installs `software_id` on the device named in `input`, consuming a seat.
pub fn install_software(
    conn: &mut SqliteConnection,
    software_id: i32,
    input: InstallationInput,
    installed_by: Option<i32>,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<InstallationView, InventoryError> {
    let view = transact(conn, |conn| {
        get_software(conn, software_id)?;
        let mut errors = FieldErrors::new();
        match input.device_id {
            None => errors.add("device_id", REQUIRED),
            Some(_) => {
                check_reference(conn, &mut errors, "device_id", RefTable::Device, input.device_id)?
            }
        }
        errors.into_result()?;
        let device_id =
            input.device_id.ok_or_else(|| InventoryError::invalid("device_id", REQUIRED))?;

        let existing: i64 = si::table
            .filter(si::device_id.eq(device_id))
            .filter(si::software_id.eq(software_id))
            .count()
            .get_result(conn)?;
        if existing > 0 {
            return Err(InventoryError::Conflict {
                field: "non_field_errors".to_string(),
                message: ALREADY_INSTALLED.to_string(),
            });
        }

        let taken = diesel::update(
            software::table.find(software_id).filter(software::used_seats.lt(software::seats)),
        )
        .set((software::used_seats.eq(software::used_seats + 1), software::updated_at.eq(now)))
        .execute(conn)?;
        if taken == 0 {
            return Err(InventoryError::invalid("software", NO_SEATS_AVAILABLE));
        }

        diesel::insert_into(si::table)
            .values(&NewSoftwareInstallation {
                device_id,
                software_id,
                installed_date: now,
                installed_by_id: installed_by,
                notes: input.notes.clone(),
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        let row = get_installation(conn, id)?;
        installation_views(conn, vec![row])?
            .pop()
            .ok_or_else(|| {
                InventoryError::Internal("installation view assembly produced nothing".into())
            })
    })?;

    info!(
        target: "inventory_api::repository",
        "installed software {} on device {}",
        software_id,
        view.device_id
    );
    sink.emit(ChangeEvent::created("SoftwareInstallation", view.id));
    sink.emit(ChangeEvent::updated("Software", software_id));
    Ok(view)
}

/// Removes an installation and frees its seat.
pub fn uninstall_software(
    conn: &mut SqliteConnection,
    installation_id: i32,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<(), InventoryError> {
    let software_id = transact(conn, |conn| {
        let row = get_installation(conn, installation_id)?;
        diesel::delete(si::table.find(installation_id)).execute(conn)?;
        diesel::update(software::table.find(row.software_id).filter(software::used_seats.gt(0)))
            .set((software::used_seats.eq(software::used_seats - 1), software::updated_at.eq(now)))
            .execute(conn)?;
        Ok(row.software_id)
    })?;
    sink.emit(ChangeEvent::deleted("SoftwareInstallation", installation_id));
    sink.emit(ChangeEvent::updated("Software", software_id));
    Ok(())
}
