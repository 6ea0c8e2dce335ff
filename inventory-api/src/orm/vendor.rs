use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::error::InventoryError;
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{NewVendor, Vendor, VendorInput, VendorWithCount};
use crate::orm::db::{last_insert_id, transact};
use crate::schema::{devices, vendors};
use crate::validation::vendor_errors;

fn device_counts(conn: &mut SqliteConnection) -> QueryResult<HashMap<i32, i64>> {
    let rows: Vec<(Option<i32>, i64)> = devices::table
        .filter(devices::vendor_id.is_not_null())
        .group_by(devices::vendor_id)
        .select((devices::vendor_id, count_star()))
        .load(conn)?;
    Ok(rows.into_iter().filter_map(|(id, n)| id.map(|id| (id, n))).collect())
}

pub fn list_vendors(conn: &mut SqliteConnection) -> QueryResult<Vec<VendorWithCount>> {
    let counts = device_counts(conn)?;
    let rows = vendors::table.order(vendors::id.asc()).select(Vendor::as_select()).load(conn)?;
    Ok(rows
        .into_iter()
        .map(|vendor| {
            let device_count = counts.get(&vendor.id).copied().unwrap_or(0);
            VendorWithCount { vendor, device_count }
        })
        .collect())
}

pub fn get_vendor(conn: &mut SqliteConnection, id: i32) -> Result<VendorWithCount, InventoryError> {
    let vendor = vendors::table
        .find(id)
        .select(Vendor::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("Vendor"))?;
    let device_count = devices::table.filter(devices::vendor_id.eq(id)).count().get_result(conn)?;
    Ok(VendorWithCount { vendor, device_count })
}

pub fn insert_vendor(
    conn: &mut SqliteConnection,
    input: VendorInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<Vendor, InventoryError> {
    vendor_errors(&input).into_result()?;
    let vendor = transact(conn, |conn| {
        diesel::insert_into(vendors::table)
            .values(&NewVendor {
                name: input.name.trim().to_string(),
                contact_person: input.contact_person,
                email: input.email,
                phone: input.phone,
                website: input.website,
                address: input.address,
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        Ok(vendors::table.find(id).select(Vendor::as_select()).first(conn)?)
    })?;
    sink.emit(ChangeEvent::created("Vendor", vendor.id));
    Ok(vendor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::orm::testing::{setup_test_db, test_now};
    use crate::validation::INVALID_EMAIL;

    #[test]
    fn vendor_email_must_be_valid() {
        let mut conn = setup_test_db();
        let input = VendorInput {
            name: "Dell".into(),
            email: "sales-at-dell".into(),
            ..Default::default()
        };
        let err = insert_vendor(&mut conn, input, test_now(), &NullSink).unwrap_err();
        match err {
            InventoryError::Invalid(errors) => {
                assert_eq!(errors.get("email"), Some(&[INVALID_EMAIL.to_string()][..]))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn vendors_start_with_no_devices() {
        let mut conn = setup_test_db();
        let input = VendorInput { name: "Lenovo".into(), ..Default::default() };
        let vendor = insert_vendor(&mut conn, input, test_now(), &NullSink).unwrap();
        assert_eq!(get_vendor(&mut conn, vendor.id).unwrap().device_count, 0);
        assert_eq!(list_vendors(&mut conn).unwrap().len(), 1);
    }
}
