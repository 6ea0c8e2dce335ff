use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::error::InventoryError;
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{NewSoftware, Software, SoftwareChanges, SoftwareInput, SoftwareView, Vendor};
use crate::orm::db::{last_insert_id, transact};
use crate::orm::{RefTable, check_reference};
use crate::policy::{SoftwarePredicate, available_seats, license_status};
use crate::query::software::{DEFAULT_ORDERING, SoftwareFilter, filtered, ordered};
use crate::query::{OrderKey, Page, PageRequest};
use crate::schema::{software, software_installations, vendors};
use crate::validation::{round_money, software_errors};

pub fn get_software(conn: &mut SqliteConnection, id: i32) -> Result<Software, InventoryError> {
    software::table
        .find(id)
        .select(Software::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("Software"))
}

fn assemble(sw: Software, vendors: &HashMap<i32, Vendor>, now: NaiveDateTime) -> SoftwareView {
    SoftwareView {
        vendor: sw.vendor_id.and_then(|id| vendors.get(&id).cloned()),
        available_seats: available_seats(&sw),
        license_status: license_status(&sw, now),
        id: sw.id,
        name: sw.name,
        version: sw.version,
        vendor_id: sw.vendor_id,
        license_type: sw.license_type,
        license_key: sw.license_key,
        license_expiry: sw.license_expiry,
        seats: sw.seats,
        used_seats: sw.used_seats,
        purchase_date: sw.purchase_date,
        purchase_price: sw.purchase_price,
        notes: sw.notes,
        created_at: sw.created_at,
        updated_at: sw.updated_at,
    }
}

pub fn software_views(
    conn: &mut SqliteConnection,
    rows: Vec<Software>,
    now: NaiveDateTime,
) -> QueryResult<Vec<SoftwareView>> {
    let mut vendor_ids: Vec<i32> = rows.iter().filter_map(|s| s.vendor_id).collect();
    vendor_ids.sort_unstable();
    vendor_ids.dedup();
    let vendors: HashMap<i32, Vendor> = vendors::table
        .filter(vendors::id.eq_any(vendor_ids))
        .select(Vendor::as_select())
        .load(conn)?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();
    Ok(rows.into_iter().map(|sw| assemble(sw, &vendors, now)).collect())
}

pub fn software_view(
    conn: &mut SqliteConnection,
    sw: Software,
    now: NaiveDateTime,
) -> Result<SoftwareView, InventoryError> {
    software_views(conn, vec![sw], now)?
        .pop()
        .ok_or_else(|| InventoryError::Internal("software view assembly produced nothing".into()))
}

pub fn list_software(
    conn: &mut SqliteConnection,
    filter: &SoftwareFilter,
    search: Option<&str>,
    ordering: &[OrderKey],
    page: &PageRequest,
    now: NaiveDateTime,
) -> Result<Page<SoftwareView>, InventoryError> {
    let total: i64 = filtered(filter, search, now).count().get_result(conn)?;
    page.check(total)?;
    let rows = ordered(filtered(filter, search, now), ordering)
        .limit(page.page_size)
        .offset(page.offset())
        .select(Software::as_select())
        .load(conn)?;
    Ok(Page::new(software_views(conn, rows, now)?, total))
}

/// Every license where `predicate` holds, by name.
pub fn software_where(
    conn: &mut SqliteConnection,
    predicate: SoftwarePredicate,
    now: NaiveDateTime,
) -> Result<Vec<SoftwareView>, InventoryError> {
    let filter = SoftwareFilter::only(predicate);
    let rows = ordered(filtered(&filter, None, now), DEFAULT_ORDERING)
        .select(Software::as_select())
        .load(conn)?;
    Ok(software_views(conn, rows, now)?)
}

pub fn create_software(
    conn: &mut SqliteConnection,
    input: SoftwareInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<Software, InventoryError> {
    let sw = transact(conn, |conn| {
        let mut errors = software_errors(&input, 0);
        check_reference(conn, &mut errors, "vendor_id", RefTable::Vendor, input.vendor_id)?;
        errors.into_result()?;

        diesel::insert_into(software::table)
            .values(&NewSoftware {
                name: input.name.trim().to_string(),
                version: input.version.clone(),
                vendor_id: input.vendor_id,
                license_type: input.license_type,
                license_key: input.license_key.clone(),
                license_expiry: input.license_expiry,
                seats: input.seats,
                used_seats: 0,
                purchase_date: input.purchase_date,
                purchase_price: round_money(input.purchase_price),
                notes: input.notes.clone(),
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        get_software(conn, id)
    })?;
    sink.emit(ChangeEvent::created("Software", sw.id));
    Ok(sw)
}

/// `used_seats` is not writable here; seats may not drop below it.
pub fn update_software(
    conn: &mut SqliteConnection,
    id: i32,
    input: SoftwareInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<Software, InventoryError> {
    let sw = transact(conn, |conn| {
        let current = get_software(conn, id)?;
        let mut errors = software_errors(&input, current.used_seats);
        check_reference(conn, &mut errors, "vendor_id", RefTable::Vendor, input.vendor_id)?;
        errors.into_result()?;

        diesel::update(software::table.find(id))
            .set(&SoftwareChanges {
                name: input.name.trim().to_string(),
                version: input.version.clone(),
                vendor_id: input.vendor_id,
                license_type: input.license_type,
                license_key: input.license_key.clone(),
                license_expiry: input.license_expiry,
                seats: input.seats,
                purchase_date: input.purchase_date,
                purchase_price: round_money(input.purchase_price),
                notes: input.notes.clone(),
                updated_at: now,
            })
            .execute(conn)?;
        get_software(conn, id)
    })?;
    sink.emit(ChangeEvent::updated("Software", id));
    Ok(sw)
}

/// Deletes the license together with its installations.
pub fn delete_software(
    conn: &mut SqliteConnection,
    id: i32,
    sink: &dyn ChangeSink,
) -> Result<(), InventoryError> {
    let installs = transact(conn, |conn| {
        get_software(conn, id)?;
        let installs: Vec<i32> = software_installations::table
            .filter(software_installations::software_id.eq(id))
            .select(software_installations::id)
            .load(conn)?;
        diesel::delete(software::table.find(id)).execute(conn)?;
        Ok(installs)
    })?;
    sink.emit_all(
        installs.into_iter().map(|i| ChangeEvent::deleted("SoftwareInstallation", i)).collect(),
    );
    sink.emit(ChangeEvent::deleted("Software", id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::events::RecordingSink;
    use crate::orm::testing::{seed_software, seed_vendor, setup_test_db, test_now};
    use crate::policy::LicenseStatus;

    fn office(seats: i32) -> SoftwareInput {
        SoftwareInput { name: "Office".into(), version: "2024".into(), seats, ..Default::default() }
    }

    #[test]
    fn create_starts_with_no_used_seats() {
        let mut conn = setup_test_db();
        let sink = RecordingSink::new();
        let vendor = seed_vendor(&mut conn, "Microsoft");
        let mut input = office(5);
        input.vendor_id = Some(vendor.id);
        input.license_expiry = NaiveDate::from_ymd_opt(2025, 1, 10);

        let sw = create_software(&mut conn, input, test_now(), &sink).unwrap();
        assert_eq!(sw.used_seats, 0);

        let view = software_view(&mut conn, sw, test_now()).unwrap();
        assert_eq!(view.available_seats, 5);
        assert_eq!(view.license_status, LicenseStatus::Expired);
        assert_eq!(view.vendor.map(|v| v.name).as_deref(), Some("Microsoft"));
        assert_eq!(sink.events(), vec![ChangeEvent::created("Software", 1)]);
    }

    #[test]
    fn seats_cannot_drop_below_usage() {
        let mut conn = setup_test_db();
        let sw = seed_software(&mut conn, "CAD", 5, 4);
        let err = update_software(&mut conn, sw.id, office(3), test_now(), &RecordingSink::new())
            .unwrap_err();
        assert!(matches!(err, InventoryError::Invalid(ref e) if e.contains("seats")));

        let sink = RecordingSink::new();
        let ok = update_software(&mut conn, sw.id, office(4), test_now(), &sink).unwrap();
        assert_eq!((ok.seats, ok.used_seats), (4, 4));
    }

    #[test]
    fn low_seats_listing() {
        let mut conn = setup_test_db();
        seed_software(&mut conn, "Roomy", 10, 1);
        seed_software(&mut conn, "Tight", 3, 1);
        let low = software_where(&mut conn, SoftwarePredicate::LowSeats, test_now()).unwrap();
        let names: Vec<&str> = low.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Tight"]);
    }

    #[test]
    fn unknown_vendor_is_rejected() {
        let mut conn = setup_test_db();
        let mut input = office(1);
        input.vendor_id = Some(99);
        let err = create_software(&mut conn, input, test_now(), &RecordingSink::new()).unwrap_err();
        assert!(matches!(err, InventoryError::Invalid(ref e) if e.contains("vendor_id")));
    }
}
